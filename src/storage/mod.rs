pub mod local;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod search;
pub mod supabase;
pub mod traits;

use crate::{
    config::{BlobBackend, Config},
    error::{Result, StudioError},
};
use std::sync::Arc;

pub use local::LocalBlobStore;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
#[cfg(feature = "postgres")]
pub use postgres::PostgresRecordStore;
pub use supabase::SupabaseBlobStore;
pub use traits::{BlobStore, ImageQuery, RecordStore, StoredBlob};

/// URL prefix under which public objects are served, both by the hosted
/// platform and by this crate's own server for the memory/local backends.
pub const PUBLIC_OBJECT_PREFIX: [&str; 4] = ["storage", "v1", "object", "public"];

pub struct StorageManager {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
}

impl StorageManager {
    pub fn new(blobs: Arc<dyn BlobStore>, records: Arc<dyn RecordStore>) -> Self {
        Self { blobs, records }
    }

    pub async fn from_config(config: &Config, http: reqwest::Client) -> Result<Self> {
        let storage = &config.storage;

        let blobs: Arc<dyn BlobStore> = match storage.blob_backend {
            BlobBackend::Memory => Arc::new(MemoryBlobStore::new(
                &config.public_base_url,
                &storage.bucket,
            )?),
            BlobBackend::Local => Arc::new(
                LocalBlobStore::new(&storage.local_dir, &config.public_base_url, &storage.bucket)
                    .await?,
            ),
            BlobBackend::Supabase => Arc::new(SupabaseBlobStore::new(
                http,
                config.supabase.clone(),
                &storage.bucket,
            )?),
        };

        let records: Arc<dyn RecordStore> = if storage.use_psql {
            #[cfg(feature = "postgres")]
            {
                let postgres_config = storage.postgres.clone().ok_or_else(|| {
                    StudioError::ConfigError("PostgreSQL config required".into())
                })?;
                Arc::new(PostgresRecordStore::new(postgres_config).await?)
            }
            #[cfg(not(feature = "postgres"))]
            {
                return Err(StudioError::ConfigError(
                    "PostgreSQL feature not enabled".into(),
                ));
            }
        } else {
            log::warn!("USE_PSQL is not set; image records live in memory only");
            Arc::new(MemoryRecordStore::new())
        };

        Ok(Self { blobs, records })
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.blobs.health_check().await? && self.records.health_check().await?)
    }
}

/// Rejects empty, absolute and `.`/`..` paths so that a path can never leave its bucket.
pub fn validate_object_path(path: &str) -> Result<()> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(StudioError::persistence(format!(
            "Invalid object path: {}",
            path
        )));
    }
    Ok(())
}

/// `{base}/storage/v1/object/public/{bucket}/{path}` with each segment percent-encoded.
pub fn public_object_url(base: &url::Url, bucket: &str, path: &str) -> String {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(PUBLIC_OBJECT_PREFIX)
            .push(bucket)
            .extend(path.split('/'));
    }
    url.to_string()
}

pub fn parse_base_url(raw: &str) -> Result<url::Url> {
    url::Url::parse(raw)
        .map_err(|e| StudioError::ConfigError(format!("Invalid base url {}: {}", raw, e)))
}

/// Recovers the object path from a public URL: everything after the first
/// `bucket` segment, percent-decoded. `None` when the URL does not contain it.
pub fn extract_storage_path(public_url: &str, bucket: &str) -> Option<String> {
    let parsed = url::Url::parse(public_url).ok()?;
    let parts: Vec<&str> = parsed.path_segments()?.filter(|p| !p.is_empty()).collect();
    let bucket_index = parts.iter().position(|part| *part == bucket)?;

    let path = parts[bucket_index + 1..]
        .iter()
        .map(|segment| percent_decode(segment))
        .collect::<Vec<_>>()
        .join("/");

    (!path.is_empty()).then_some(path)
}

pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                decoded.push(value);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Guesses a content type from an object path's extension.
pub fn content_type_for_path(path: &str) -> &'static str {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_round_trips_through_extraction() {
        let base = url::Url::parse("http://localhost:8080").unwrap();
        let url = public_object_url(&base, "images", "user 1/1700-abc.png");
        assert_eq!(
            url,
            "http://localhost:8080/storage/v1/object/public/images/user%201/1700-abc.png"
        );
        assert_eq!(
            extract_storage_path(&url, "images").as_deref(),
            Some("user 1/1700-abc.png")
        );
    }

    #[test]
    fn extraction_needs_bucket_segment() {
        assert_eq!(extract_storage_path("https://cdn.example.com/other/a.png", "images"), None);
        assert_eq!(extract_storage_path("https://cdn.example.com/images/", "images"), None);
        assert_eq!(extract_storage_path("not a url", "images"), None);
    }

    #[test]
    fn percent_decode_handles_multibyte_and_garbage() {
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("a%2Fb"), "a/b");
    }

    #[test]
    fn object_paths_cannot_escape() {
        assert!(validate_object_path("user/seed.png").is_ok());
        for bad in ["", "/abs.png", "user/../x.png", "user//x.png", "./x.png"] {
            assert!(validate_object_path(bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_path("u/s.png"), "image/png");
        assert_eq!(content_type_for_path("u/s.JPG"), "image/jpeg");
        assert_eq!(content_type_for_path("u/s"), "application/octet-stream");
    }
}
