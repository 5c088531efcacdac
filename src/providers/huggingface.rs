use crate::{
    config::HuggingFaceConfig,
    error::{Result, StudioError},
    models::{GenerationJob, GenerationResult},
    providers::{push_segments, read_image, ImageProvider},
};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use serde::Serialize;

pub const NAME: &str = "huggingface";

#[derive(Debug, Serialize)]
pub struct HuggingFacePayload<'a> {
    pub inputs: &'a str,
    pub parameters: HuggingFaceParameters<'a>,
}

#[derive(Debug, Serialize)]
pub struct HuggingFaceParameters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub seed: u32,
}

/// Primary provider: the Hugging Face serverless inference API.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceProvider {
    pub fn new(client: Client, config: HuggingFaceConfig) -> Self {
        Self { client, config }
    }

    pub fn payload<'a>(&self, job: &'a GenerationJob) -> HuggingFacePayload<'a> {
        HuggingFacePayload {
            inputs: &job.prompt,
            parameters: HuggingFaceParameters {
                negative_prompt: job.negative_prompt.as_deref(),
                width: job.width,
                height: job.height,
                guidance_scale: job.guidance.unwrap_or(self.config.default_guidance),
                num_inference_steps: self.config.inference_steps,
                seed: job.numeric_seed,
            },
        }
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn generate(&self, job: &GenerationJob) -> Result<GenerationResult> {
        // No token means no request at all.
        let token = self
            .config
            .token
            .as_deref()
            .ok_or_else(|| StudioError::provider(NAME, "HF_TOKEN missing"))?;

        let url = push_segments(NAME, &self.config.base_url, &["models"])?;
        // Model ids contain a '/', which must stay a path separator.
        let url = format!("{}/{}", url.as_str().trim_end_matches('/'), self.config.model);

        log::debug!("Requesting {} from {}", self.config.model, NAME);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(ACCEPT, "image/png")
            .json(&self.payload(job))
            .send()
            .await
            .map_err(|e| StudioError::provider(NAME, e.to_string()))?;

        let (bytes, content_type) = read_image(NAME, response, "image/png").await?;

        Ok(GenerationResult {
            bytes,
            content_type,
            seed_used: job.seed.clone(),
        })
    }
}
