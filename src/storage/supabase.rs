use crate::{
    config::SupabaseConfig,
    error::{Result, StudioError},
    storage::{
        parse_base_url, public_object_url,
        traits::{BlobStore, StoredBlob},
        validate_object_path,
    },
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct StorageErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Hosted object storage over the Supabase storage REST API.
pub struct SupabaseBlobStore {
    client: Client,
    base: url::Url,
    service_key: String,
    bucket: String,
}

impl SupabaseBlobStore {
    pub fn new(client: Client, config: SupabaseConfig, bucket: &str) -> Result<Self> {
        let url = config
            .url
            .ok_or_else(|| StudioError::ConfigError("SUPABASE_URL is required".into()))?;
        let service_key = config.service_role_key.ok_or_else(|| {
            StudioError::ConfigError("SUPABASE_SERVICE_ROLE_KEY is required".into())
        })?;

        Ok(Self {
            client,
            base: parse_base_url(&url)?,
            service_key,
            bucket: bucket.to_string(),
        })
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|e| StudioError::ConfigError(format!("Invalid service key: {}", e)))?;
        let apikey = HeaderValue::from_str(&self.service_key)
            .map_err(|e| StudioError::ConfigError(format!("Invalid service key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", apikey);
        Ok(headers)
    }

    /// `{base}/storage/v1/object/{bucket}/{path}`
    fn object_url(&self, path: &str) -> String {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "object"])
                .push(&self.bucket)
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url.to_string()
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        serde_json::from_str::<StorageErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| format!("Storage request failed {}: {}", status.as_u16(), text))
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        validate_object_path(path)?;

        let response = self
            .client
            .post(self.object_url(path))
            .headers(self.build_headers()?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StudioError::persistence(format!("Storage upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StudioError::PersistenceFailure(
                Self::error_message(response).await,
            ));
        }

        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.base, &self.bucket, path)
    }

    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>> {
        validate_object_path(path)?;

        let response = self
            .client
            .get(self.public_url(path))
            .send()
            .await
            .map_err(|e| StudioError::persistence(format!("Storage fetch failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(None),
            status if status.is_success() => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(StudioError::persistence)?
                    .to_vec();
                Ok(Some(StoredBlob {
                    bytes,
                    content_type,
                }))
            }
            _ => Err(StudioError::PersistenceFailure(
                Self::error_message(response).await,
            )),
        }
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .delete(self.object_url(""))
            .headers(self.build_headers()?)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| StudioError::persistence(format!("Storage remove failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StudioError::PersistenceFailure(
                Self::error_message(response).await,
            ));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "bucket"])
                .push(&self.bucket);
        }

        let response = self
            .client
            .get(url)
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("Storage health check failed: {}", e)))?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseBlobStore {
        let config = SupabaseConfig::default().with_credentials(
            "https://project.supabase.co",
            "anon",
            "service",
        );
        SupabaseBlobStore::new(Client::new(), config, "images").unwrap()
    }

    #[test]
    fn requires_url_and_service_key() {
        assert!(matches!(
            SupabaseBlobStore::new(Client::new(), SupabaseConfig::default(), "images"),
            Err(StudioError::ConfigError(_))
        ));
    }

    #[test]
    fn builds_object_and_public_urls() {
        let store = store();
        assert_eq!(
            store.object_url("user/1700-abc.png"),
            "https://project.supabase.co/storage/v1/object/images/user/1700-abc.png"
        );
        assert_eq!(
            store.public_url("user/1700-abc.png"),
            "https://project.supabase.co/storage/v1/object/public/images/user/1700-abc.png"
        );
    }

    #[test]
    fn headers_carry_service_key() {
        let headers = store().build_headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer service");
        assert_eq!(headers.get("apikey").unwrap(), "service");
    }
}
