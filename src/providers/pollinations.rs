use crate::{
    config::PollinationsConfig,
    error::{Result, StudioError},
    models::{GenerationJob, GenerationResult},
    providers::{push_segments, read_image, ImageProvider},
};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use url::Url;

pub const NAME: &str = "pollinations";

/// Secondary provider. Needs no credentials; the prompt travels in the URL path.
#[derive(Clone)]
pub struct PollinationsProvider {
    client: Client,
    config: PollinationsConfig,
}

impl PollinationsProvider {
    pub fn new(client: Client, config: PollinationsConfig) -> Self {
        Self { client, config }
    }

    pub fn full_prompt(&self, job: &GenerationJob) -> String {
        let mut parts = vec![self.config.style_prefix.clone(), job.prompt.trim().to_string()];
        if let Some(color) = &job.color {
            parts.push(format!("dominant color: {}", color));
        }
        parts.join(", ")
    }

    pub fn request_url(&self, job: &GenerationJob) -> Result<Url> {
        let prompt = self.full_prompt(job);
        let mut url = push_segments(NAME, &self.config.base_url, &["prompt", prompt.as_str()])?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("width", &job.width.to_string())
                .append_pair("height", &job.height.to_string())
                .append_pair("seed", &job.seed)
                .append_pair("model", &self.config.model);
            if let Some(negative) = &job.negative_prompt {
                query.append_pair("negative_prompt", negative);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl ImageProvider for PollinationsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate(&self, job: &GenerationJob) -> Result<GenerationResult> {
        let url = self.request_url(job)?;
        log::debug!("Requesting {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "image/jpeg")
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

    fn provider() -> PollinationsProvider {
        PollinationsProvider::new(Client::new(), PollinationsConfig::default())
    }

    #[test]
    fn full_prompt_adds_style_and_color() {
        let request = GenerationRequest::new("  a cat  ", "512x512")
            .with_color("#ff0000")
            .validate()
            .unwrap();
        let job = GenerationJob::new(&request, "s".to_string());

        assert_eq!(
            provider().full_prompt(&job),
            "ultra realistic, highly detailed, 4k, a cat, dominant color: #ff0000"
        );
    }

    #[test]
    fn request_url_carries_dimensions_and_seed() {
        let request = GenerationRequest::new("a cat", "640x480")
            .with_negative_prompt("dogs")
            .validate()
            .unwrap();
        let job = GenerationJob::new(&request, "1700-abc".to_string());
        let url = provider().request_url(&job).unwrap();

        assert!(url
            .as_str()
            .starts_with("https://image.pollinations.ai/prompt/ultra%20realistic"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("width".into(), "640".into())));
        assert!(pairs.contains(&("height".into(), "480".into())));
        assert!(pairs.contains(&("seed".into(), "1700-abc".into())));
        assert!(pairs.contains(&("model".into(), "flux-schnell".into())));
        assert!(pairs.contains(&("negative_prompt".into(), "dogs".into())));
    }

    #[test]
    fn request_url_omits_absent_negative_prompt() {
        let request = GenerationRequest::new("a cat", "64x64").validate().unwrap();
        let job = GenerationJob::new(&request, "s".to_string());
        let url = provider().request_url(&job).unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k == "negative_prompt"));
    }
}
