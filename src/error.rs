use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("{0}")]
    InvalidInput(String),
    #[error("{provider} provider failed: {message}")]
    ProviderFailure {
        provider: &'static str,
        message: String,
    },
    #[error("All image providers failed: {0}")]
    ProvidersExhausted(String),
    #[error("{0}")]
    PersistenceFailure(String),
    #[error("Not found")]
    NotFound,
    #[error("Forbidden")]
    Forbidden,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl StudioError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        StudioError::ProviderFailure {
            provider,
            message: message.into(),
        }
    }

    pub fn persistence(message: impl std::fmt::Display) -> Self {
        StudioError::PersistenceFailure(message.to_string())
    }
}

impl From<serde_json::Error> for StudioError {
    fn from(e: serde_json::Error) -> Self {
        StudioError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
