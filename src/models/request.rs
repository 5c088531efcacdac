use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inbound body of `POST /api/generate`. Every field is optional at the wire
/// level so that missing fields surface as `InvalidInput`, not a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub color: Option<String>,
    pub resolution: Option<String>,
    pub guidance: Option<f64>,
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StudioError::InvalidInput(format!("Invalid resolution: {}", s));

        let (w, h) = s.trim().split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Resolution { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub color: Option<String>,
    /// The resolution string exactly as submitted; it is stored verbatim.
    pub resolution: String,
    pub dimensions: Resolution,
    pub guidance: Option<f64>,
    pub seed: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, resolution: impl Into<String>) -> Self {
        GenerationRequest {
            prompt: Some(prompt.into()),
            resolution: Some(resolution.into()),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn validate(self) -> Result<ValidatedRequest> {
        let prompt = self
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| StudioError::InvalidInput("Missing fields: prompt".into()))?;
        let resolution = self
            .resolution
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| StudioError::InvalidInput("Missing fields: resolution".into()))?;
        let dimensions: Resolution = resolution.parse()?;

        let seed = self.seed.filter(|s| !s.trim().is_empty());
        if seed.as_deref().map_or(false, |s| s.contains('/')) {
            return Err(StudioError::InvalidInput(
                "Seed must not contain '/'".into(),
            ));
        }

        Ok(ValidatedRequest {
            prompt,
            negative_prompt: self.negative_prompt.filter(|n| !n.is_empty()),
            color: self.color.filter(|c| !c.is_empty()),
            resolution,
            dimensions,
            guidance: self.guidance,
            seed,
        })
    }
}

/// What a provider receives: the validated request with its seed resolved.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub color: Option<String>,
    pub width: u32,
    pub height: u32,
    pub guidance: Option<f64>,
    pub seed: String,
    pub numeric_seed: u32,
}

impl GenerationJob {
    pub fn new(request: &ValidatedRequest, seed: String) -> Self {
        GenerationJob {
            prompt: request.prompt.clone(),
            negative_prompt: request.negative_prompt.clone(),
            color: request.color.clone(),
            width: request.dimensions.width,
            height: request.dimensions.height,
            guidance: request.guidance,
            numeric_seed: crate::providers::seed::numeric_seed(&seed),
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(request: GenerationRequest) {
        match request.validate() {
            Err(StudioError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn parses_resolution() {
        let r: Resolution = "1024x768".parse().unwrap();
        assert_eq!(r, Resolution { width: 1024, height: 768 });
        assert_eq!(r.to_string(), "1024x768");
    }

    #[test]
    fn rejects_malformed_resolutions() {
        for bad in ["", "1024", "0x512", "512x0", "-1x5", "axb", "10x10x10", "1024X1024"] {
            assert!(bad.parse::<Resolution>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn missing_prompt_or_resolution_is_invalid() {
        assert_invalid(GenerationRequest::default());
        assert_invalid(GenerationRequest::new("", "1024x1024"));
        assert_invalid(GenerationRequest::new("   ", "1024x1024"));
        assert_invalid(GenerationRequest {
            prompt: Some("a cat".into()),
            ..Default::default()
        });
        assert_invalid(GenerationRequest::new("a cat", "big"));
    }

    #[test]
    fn seed_with_slash_is_invalid() {
        assert_invalid(GenerationRequest::new("a cat", "512x512").with_seed("../other"));
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        let request = GenerationRequest::new("a cat", "512x512")
            .with_seed("  ")
            .with_color("")
            .with_negative_prompt("")
            .validate()
            .unwrap();
        assert!(request.seed.is_none());
        assert!(request.color.is_none());
        assert!(request.negative_prompt.is_none());
        assert_eq!(request.resolution, "512x512");
    }

    #[test]
    fn deserializes_camel_case_body() {
        let body = r##"{"prompt":"a cat","negativePrompt":"dogs","resolution":"512x512","color":"#ff0000","guidance":7.5}"##;
        let request: GenerationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.negative_prompt.as_deref(), Some("dogs"));
        assert_eq!(request.guidance, Some(7.5));
        assert!(request.seed.is_none());
    }

    #[test]
    fn job_carries_numeric_seed() {
        let request = GenerationRequest::new("a cat", "640x480").validate().unwrap();
        let job = GenerationJob::new(&request, "abc".to_string());
        assert_eq!(job.numeric_seed, 97 + 98 + 99);
        assert_eq!((job.width, job.height), (640, 480));
    }
}
