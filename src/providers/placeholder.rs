use crate::{
    config::PlaceholderConfig,
    error::{Result, StudioError},
    models::{GenerationJob, GenerationResult},
    providers::{push_segments, read_image, ImageProvider},
};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

pub const NAME: &str = "placeholder";

/// Last resort: a seeded stock photo at the requested size. Ignores the prompt.
#[derive(Clone)]
pub struct PlaceholderProvider {
    client: Client,
    config: PlaceholderConfig,
}

impl PlaceholderProvider {
    pub fn new(client: Client, config: PlaceholderConfig) -> Self {
        Self { client, config }
    }

    pub fn request_url(&self, job: &GenerationJob) -> Result<Url> {
        push_segments(
            NAME,
            &self.config.base_url,
            &[
                "seed",
                job.seed.as_str(),
                job.width.to_string().as_str(),
                job.height.to_string().as_str(),
            ],
        )
    }
}

#[async_trait]
impl ImageProvider for PlaceholderProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate(&self, job: &GenerationJob) -> Result<GenerationResult> {
        let url = self.request_url(job)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StudioError::provider(NAME, e.to_string()))?;

        let (bytes, _) = read_image(NAME, response, "image/jpeg").await?;

        Ok(GenerationResult {
            bytes,
            content_type: "image/jpeg".to_string(),
            seed_used: job.seed.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationRequest;

    #[test]
    fn url_encodes_seed_and_size() {
        let provider = PlaceholderProvider::new(Client::new(), PlaceholderConfig::default());
        let request = GenerationRequest::new("ignored", "300x200").validate().unwrap();
        let job = GenerationJob::new(&request, "my seed".to_string());

        assert_eq!(
            provider.request_url(&job).unwrap().as_str(),
            "https://picsum.photos/seed/my%20seed/300/200"
        );
    }
}
