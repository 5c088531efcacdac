pub mod huggingface;
pub mod placeholder;
pub mod pollinations;
pub mod seed;

use crate::{
    config::{GenerationConfig, ProviderKind},
    error::{Result, StudioError},
    logger,
    models::{GenerationJob, GenerationResult},
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;

pub use huggingface::HuggingFaceProvider;
pub use placeholder::PlaceholderProvider;
pub use pollinations::PollinationsProvider;

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, job: &GenerationJob) -> Result<GenerationResult>;
}

/// Ordered providers, tried until one returns an image.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &GenerationConfig, http: reqwest::Client) -> Self {
        let placeholder: Arc<dyn ImageProvider> = Arc::new(PlaceholderProvider::new(
            http.clone(),
            config.placeholder.clone(),
        ));

        if config.mock {
            return Self::new(vec![placeholder]);
        }

        let secondary: Arc<dyn ImageProvider> = Arc::new(PollinationsProvider::new(
            http.clone(),
            config.pollinations.clone(),
        ));

        let providers = match config.primary {
            ProviderKind::HuggingFace => vec![
                Arc::new(HuggingFaceProvider::new(http, config.huggingface.clone()))
                    as Arc<dyn ImageProvider>,
                secondary,
                placeholder,
            ],
            ProviderKind::Pollinations => vec![secondary, placeholder],
        };

        Self::new(providers)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn run(&self, job: &GenerationJob) -> Result<GenerationResult> {
        let mut last_error: Option<StudioError> = None;

        for provider in &self.providers {
            let timer = logger::timer(&format!("{} generation", provider.name()));
            match provider.generate(job).await {
                Ok(result) => {
                    log::info!(
                        "Generated {} bytes ({}) with {} in {}ms",
                        result.bytes.len(),
                        result.content_type,
                        provider.name(),
                        timer.elapsed().as_millis()
                    );
                    return Ok(result);
                }
                Err(e) => {
                    log::warn!("{} failed, falling back. Reason: {}", provider.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(StudioError::ProvidersExhausted(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no providers configured".to_string()),
        ))
    }

    /// (id, name, declared output) for every provider this crate ships.
    pub fn supported_providers() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            (huggingface::NAME, "Hugging Face inference API", "image/png"),
            (pollinations::NAME, "Pollinations", "image/jpeg"),
            (placeholder::NAME, "Picsum placeholder", "image/jpeg"),
        ]
    }
}

/// Turns a provider response into image bytes, rejecting non-image payloads.
/// Returns the response content type, or `default_content_type` when absent.
pub(crate) async fn read_image(
    provider: &'static str,
    response: reqwest::Response,
    default_content_type: &str,
) -> Result<(Vec<u8>, String)> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(StudioError::provider(
            provider,
            format!("request failed {}: {}", status.as_u16(), text),
        ));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| default_content_type.to_string());

    if !content_type.starts_with("image/") {
        return Err(StudioError::provider(
            provider,
            format!("unexpected content type {}", content_type),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StudioError::provider(provider, e.to_string()))?;
    if bytes.is_empty() {
        return Err(StudioError::provider(provider, "empty image body"));
    }

    Ok((bytes.to_vec(), content_type))
}

pub(crate) fn push_segments(
    provider: &'static str,
    base: &str,
    segments: &[&str],
) -> Result<url::Url> {
    let mut url = url::Url::parse(base)
        .map_err(|e| StudioError::ConfigError(format!("{} base url: {}", provider, e)))?;
    url.path_segments_mut()
        .map_err(|_| StudioError::ConfigError(format!("{} base url cannot be a base", provider)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider double that counts calls and either fails or returns fixed bytes.
    pub struct FakeProvider {
        name: &'static str,
        content_type: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        pub fn succeeding(name: &'static str, content_type: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                content_type: Some(content_type),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                content_type: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn chain_of(fakes: &[&Arc<FakeProvider>]) -> ProviderChain {
        ProviderChain::new(
            fakes
                .iter()
                .map(|fake| (*fake).clone() as Arc<dyn ImageProvider>)
                .collect(),
        )
    }

    #[async_trait]
    impl ImageProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn generate(&self, job: &GenerationJob) -> Result<GenerationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.content_type {
                Some(content_type) => Ok(GenerationResult {
                    bytes: format!("{}:{}", self.name, job.seed).into_bytes(),
                    content_type: content_type.to_string(),
                    seed_used: job.seed.clone(),
                }),
                None => Err(StudioError::provider(self.name, "boom")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{chain_of, FakeProvider};
    use super::*;
    use crate::models::GenerationRequest;

    fn job() -> GenerationJob {
        let request = GenerationRequest::new("a cat", "64x64").validate().unwrap();
        GenerationJob::new(&request, "seed-1".to_string())
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let first = FakeProvider::failing("first");
        let second = FakeProvider::succeeding("second", "image/jpeg");
        let third = FakeProvider::succeeding("third", "image/png");
        let chain = chain_of(&[&first, &second, &third]);

        let result = chain.run(&job()).await.unwrap();
        assert_eq!(result.content_type, "image/jpeg");
        assert_eq!(result.seed_used, "seed-1");
        assert_eq!((first.calls(), second.calls(), third.calls()), (1, 1, 0));
    }

    #[tokio::test]
    async fn exhaustion_reports_last_failure() {
        let chain = chain_of(&[&FakeProvider::failing("first"), &FakeProvider::failing("last")]);

        match chain.run(&job()).await {
            Err(StudioError::ProvidersExhausted(message)) => assert!(message.contains("last")),
            other => panic!("expected exhaustion, got {:?}", other.map(|r| r.content_type)),
        }
    }

    #[test]
    fn chain_order_follows_config() {
        let http = reqwest::Client::new();

        let chain = ProviderChain::from_config(&GenerationConfig::new(), http.clone());
        assert_eq!(chain.names(), vec!["huggingface", "pollinations", "placeholder"]);

        let config = GenerationConfig::new().with_primary(ProviderKind::Pollinations);
        let chain = ProviderChain::from_config(&config, http.clone());
        assert_eq!(chain.names(), vec!["pollinations", "placeholder"]);

        let chain = ProviderChain::from_config(&GenerationConfig::new().with_mock(true), http);
        assert_eq!(chain.names(), vec!["placeholder"]);
    }

    #[test]
    fn segments_are_appended_and_encoded() {
        let url = push_segments("test", "https://example.com/", &["prompt", "a cat/dog"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/prompt/a%20cat%2Fdog");
    }
}
