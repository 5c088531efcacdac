use crate::{
    auth::{self, Authenticator},
    config::Config,
    error::{Result, StudioError},
    gallery::Gallery,
    pipeline::GenerationPipeline,
    providers::ProviderChain,
    storage::{BlobStore, StorageManager},
};
use std::sync::Arc;
use std::time::Duration;

/// Wires configuration into a ready pipeline, gallery and authenticator.
#[derive(Clone)]
pub struct Studio {
    pipeline: GenerationPipeline,
    gallery: Gallery,
    auth: Arc<dyn Authenticator>,
    storage: Arc<StorageManager>,
    bucket: String,
}

impl Studio {
    pub async fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation.timeout_secs))
            .build()
            .map_err(|e| StudioError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let chain = ProviderChain::from_config(&config.generation, http.clone());
        log::info!("Provider chain: {}", chain.names().join(" -> "));

        let storage = StorageManager::from_config(&config, http.clone()).await?;
        let authenticator = auth::from_config(&config.auth, &config.supabase, http)?;

        Ok(Self::from_parts(
            chain,
            storage,
            authenticator,
            &config.storage.bucket,
        ))
    }

    pub fn from_parts(
        chain: ProviderChain,
        storage: StorageManager,
        auth: Arc<dyn Authenticator>,
        bucket: &str,
    ) -> Self {
        let records = storage.records().clone();
        let blobs = storage.blobs().clone();

        Self {
            pipeline: GenerationPipeline::new(chain, records.clone(), blobs.clone()),
            gallery: Gallery::new(records, blobs, bucket),
            auth,
            storage: Arc::new(storage),
            bucket: bucket.to_string(),
        }
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn auth(&self) -> &dyn Authenticator {
        self.auth.as_ref()
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        self.storage.blobs()
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, GenerationConfig, StorageConfig};
    use crate::models::{GenerationRequest, Identity, PageRange};

    #[tokio::test]
    async fn builds_from_default_config() {
        let config = Config::new()
            .with_generation(GenerationConfig::new().with_mock(true))
            .with_auth(AuthConfig::default().with_token("t", Identity::new("alice")));
        let studio = Studio::new(config).await.unwrap();

        assert_eq!(studio.pipeline().chain().names(), vec!["placeholder"]);
        assert_eq!(studio.bucket(), "images");
        assert_eq!(
            studio.auth().identify("t").await.unwrap().map(|i| i.id),
            Some("alice".to_string())
        );
        let feed = studio.gallery().feed(None, PageRange::new(1, 12)).await.unwrap();
        assert_eq!(feed.count, 0);
    }

    #[tokio::test]
    async fn local_backend_creates_bucket_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new()
            .with_storage(StorageConfig::new().with_local_dir(dir.path().to_str().unwrap()));
        let studio = Studio::new(config).await.unwrap();

        assert!(dir.path().join("images").is_dir());
        assert!(studio.blobs().health_check().await.unwrap());
    }

    #[tokio::test]
    async fn anonymous_generation_is_rejected() {
        let studio = Studio::new(Config::new()).await.unwrap();
        let err = studio
            .pipeline()
            .generate(None, GenerationRequest::new("a cat", "64x64"))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Unauthenticated));
    }
}
