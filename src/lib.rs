pub mod auth;
pub mod config;
pub mod error;
pub mod gallery;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;
pub mod studio;

pub use auth::{Authenticator, StaticAuthenticator, SupabaseAuthenticator};
pub use config::{
    AuthConfig, BlobBackend, Config, GenerationConfig, HuggingFaceConfig, PostgresConfig,
    ProviderKind, StorageConfig, SupabaseConfig,
};
pub use error::{Result, StudioError};
pub use gallery::Gallery;
pub use models::*;
pub use pipeline::GenerationPipeline;
pub use providers::{ImageProvider, ProviderChain};
pub use storage::{BlobStore, RecordStore, StorageManager};
pub use studio::Studio;
