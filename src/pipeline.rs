use crate::{
    error::{Result, StudioError},
    models::{GenerationJob, GenerationRequest, Identity, ImageRecord, NewImage},
    providers::{seed::derive_seed, ProviderChain},
    storage::{BlobStore, RecordStore},
};
use std::sync::Arc;

/// Validate, generate through the provider chain, then persist.
#[derive(Clone)]
pub struct GenerationPipeline {
    chain: ProviderChain,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl GenerationPipeline {
    pub fn new(
        chain: ProviderChain,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            chain,
            records,
            blobs,
        }
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub async fn generate(
        &self,
        identity: Option<&Identity>,
        request: GenerationRequest,
    ) -> Result<ImageRecord> {
        let identity = identity.ok_or(StudioError::Unauthenticated)?;
        let request = request.validate()?;

        let seed = request.seed.clone().unwrap_or_else(derive_seed);
        let job = GenerationJob::new(&request, seed);

        log::info!(
            "Generating {} for {} (seed {})",
            request.resolution,
            identity.id,
            job.seed
        );
        let result = self.chain.run(&job).await?;

        let path = format!("{}/{}.{}", identity.id, job.seed, result.extension());
        let stored = self
            .blobs
            .upload(&path, result.bytes, &result.content_type)
            .await
            .map_err(Self::as_persistence)?;
        let url = self.blobs.public_url(&stored);

        let image = NewImage {
            url,
            prompt: request.prompt,
            negative_prompt: request.negative_prompt,
            resolution: request.resolution,
            color: request.color,
            guidance: request.guidance,
            seed: job.seed,
            author_id: identity.id.clone(),
        };

        match self.records.insert_image(image).await {
            Ok(record) => {
                log::info!("Stored image {} at {}", record.id, stored);
                Ok(record)
            }
            Err(e) => {
                log::warn!("Image record insert failed; blob {} is orphaned", stored);
                Err(Self::as_persistence(e))
            }
        }
    }

    fn as_persistence(error: StudioError) -> StudioError {
        match error {
            StudioError::PersistenceFailure(_) => error,
            other => StudioError::persistence(other),
        }
    }
}
