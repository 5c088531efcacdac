use crate::{
    error::{Result, StudioError},
    storage::{
        content_type_for_path, parse_base_url, public_object_url,
        traits::{BlobStore, StoredBlob},
        validate_object_path,
    },
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Blobs as plain files under `root`. The content type is recovered from the
/// file extension, which the pipeline always derives from it.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: url::Url,
    bucket: String,
}

impl LocalBlobStore {
    pub async fn new(root: &str, public_base_url: &str, bucket: &str) -> Result<Self> {
        let root = PathBuf::from(root).join(bucket);
        fs::create_dir_all(&root).await.map_err(|e| {
            StudioError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        log::info!("Local blob storage at {}", root.display());

        Ok(Self {
            root,
            public_base: parse_base_url(public_base_url)?,
            bucket: bucket.to_string(),
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_object_path(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(StudioError::persistence)?;
        }

        // create_new makes the existence check and the write one atomic step.
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    StudioError::persistence(format!("The resource already exists: {}", path))
                }
                _ => StudioError::persistence(e),
            })?;

        file.write_all(&bytes).await.map_err(StudioError::persistence)?;
        file.flush().await.map_err(StudioError::persistence)?;

        log::debug!("Stored {} ({} bytes, {})", path, bytes.len(), content_type);
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.public_base, &self.bucket, path)
    }

    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(Some(StoredBlob {
                bytes,
                content_type: content_type_for_path(path).to_string(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StudioError::persistence(e)),
        }
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            let target = self.resolve(path)?;
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StudioError::persistence(e)),
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(fs::metadata(&self.root).await.map(|m| m.is_dir()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &tempfile::TempDir) -> LocalBlobStore {
        LocalBlobStore::new(
            dir.path().to_str().unwrap(),
            "http://localhost:8080",
            "images",
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let stored = store.upload("user-1/seed.png", vec![1, 2, 3], "image/png").await.unwrap();
        assert_eq!(stored, "user-1/seed.png");
        assert!(dir.path().join("images/user-1/seed.png").exists());

        let blob = store.fetch("user-1/seed.png").await.unwrap().unwrap();
        assert_eq!(blob.bytes, vec![1, 2, 3]);
        assert_eq!(blob.content_type, "image/png");
        assert!(store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn existing_object_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        store.upload("u/a.jpg", vec![1], "image/jpeg").await.unwrap();
        let err = store.upload("u/a.jpg", vec![9], "image/jpeg").await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(store.fetch("u/a.jpg").await.unwrap().unwrap().bytes, vec![1]);
    }

    #[tokio::test]
    async fn rejects_escaping_paths_and_tolerates_missing_removals() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        assert!(store.upload("../evil.png", vec![1], "image/png").await.is_err());
        assert!(store.fetch("u/missing.png").await.unwrap().is_none());
        store.remove(&["u/missing.png".to_string()]).await.unwrap();
    }
}
