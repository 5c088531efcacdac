use crate::models::Identity;
use std::collections::HashMap;
use std::env;

fn env_flag(name: &str) -> bool {
    env::var(name).ok().map_or(false, |val| val == "true")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    HuggingFace,
    Pollinations,
}

impl ProviderKind {
    /// `hf` selects Hugging Face; anything else selects Pollinations.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hf" | "huggingface" | "primary" => ProviderKind::HuggingFace,
            _ => ProviderKind::Pollinations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Memory,
    Local,
    Supabase,
}

impl BlobBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(BlobBackend::Memory),
            "local" => Some(BlobBackend::Local),
            "supabase" => Some(BlobBackend::Supabase),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBackend {
    Supabase,
    Static,
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub token: Option<String>,
    pub model: String,
    pub base_url: String,
    pub default_guidance: f64,
    pub inference_steps: u32,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        HuggingFaceConfig {
            token: None,
            model: "black-forest-labs/FLUX.1-schnell".to_string(),
            base_url: "https://api-inference.huggingface.co".to_string(),
            default_guidance: 5.0,
            inference_steps: 25,
        }
    }
}

impl HuggingFaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        HuggingFaceConfig {
            token: env::var("HF_TOKEN").ok().filter(|t| !t.is_empty()),
            model: env::var("HF_MODEL").unwrap_or(defaults.model),
            base_url: env::var("HF_BASE_URL").unwrap_or(defaults.base_url),
            ..defaults
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct PollinationsConfig {
    pub base_url: String,
    pub model: String,
    pub style_prefix: String,
}

impl Default for PollinationsConfig {
    fn default() -> Self {
        PollinationsConfig {
            base_url: "https://image.pollinations.ai".to_string(),
            model: "flux-schnell".to_string(),
            style_prefix: "ultra realistic, highly detailed, 4k".to_string(),
        }
    }
}

impl PollinationsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        PollinationsConfig {
            base_url: env::var("POLLINATIONS_BASE_URL").unwrap_or(defaults.base_url),
            ..defaults
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaceholderConfig {
    pub base_url: String,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        PlaceholderConfig {
            base_url: "https://picsum.photos".to_string(),
        }
    }
}

impl PlaceholderConfig {
    pub fn from_env() -> Self {
        PlaceholderConfig {
            base_url: env::var("PLACEHOLDER_BASE_URL")
                .unwrap_or_else(|_| Self::default().base_url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub mock: bool,
    pub primary: ProviderKind,
    pub timeout_secs: u64,
    pub huggingface: HuggingFaceConfig,
    pub pollinations: PollinationsConfig,
    pub placeholder: PlaceholderConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            mock: false,
            primary: ProviderKind::HuggingFace,
            timeout_secs: 120,
            huggingface: HuggingFaceConfig::default(),
            pollinations: PollinationsConfig::default(),
            placeholder: PlaceholderConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        GenerationConfig {
            mock: env_flag("MOCK_GENERATION"),
            primary: env::var("GENERATOR_PROVIDER")
                .map(|v| ProviderKind::parse(&v))
                .unwrap_or(ProviderKind::HuggingFace),
            timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            huggingface: HuggingFaceConfig::from_env(),
            pollinations: PollinationsConfig::from_env(),
            placeholder: PlaceholderConfig::from_env(),
        }
    }

    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    pub fn with_primary(mut self, primary: ProviderKind) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_huggingface(mut self, config: HuggingFaceConfig) -> Self {
        self.huggingface = config;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostgresConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl PostgresConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        PostgresConfig {
            host: env::var("POSTGRES_HOST").ok(),
            port: env::var("POSTGRES_PORT").ok().and_then(|s| s.parse().ok()),
            username: env::var("POSTGRES_USERNAME").ok(),
            password: env::var("POSTGRES_PASSWORD").ok(),
            database: env::var("POSTGRES_DATABASE").ok(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connection_info(
        mut self,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self.database = Some(database.into());
        self
    }
}

/// Hosted platform credentials, shared by the Supabase blob store and authenticator.
#[derive(Debug, Clone, Default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
}

impl SupabaseConfig {
    pub fn from_env() -> Self {
        SupabaseConfig {
            url: env::var("SUPABASE_URL").ok(),
            anon_key: env::var("SUPABASE_ANON_KEY").ok(),
            service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
        }
    }

    pub fn with_credentials(
        mut self,
        url: impl Into<String>,
        anon_key: impl Into<String>,
        service_role_key: impl Into<String>,
    ) -> Self {
        self.url = Some(url.into());
        self.anon_key = Some(anon_key.into());
        self.service_role_key = Some(service_role_key.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub blob_backend: BlobBackend,
    pub local_dir: String,
    pub use_psql: bool,
    pub postgres: Option<PostgresConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            bucket: "images".to_string(),
            blob_backend: BlobBackend::Memory,
            local_dir: "./data/blobs".to_string(),
            use_psql: false,
            postgres: None,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let use_psql = env_flag("USE_PSQL");
        StorageConfig {
            bucket: env::var("STORAGE_BUCKET").unwrap_or(defaults.bucket),
            blob_backend: env::var("BLOB_BACKEND")
                .ok()
                .and_then(|v| BlobBackend::parse(&v))
                .unwrap_or(defaults.blob_backend),
            local_dir: env::var("LOCAL_STORAGE_DIR").unwrap_or(defaults.local_dir),
            use_psql,
            postgres: use_psql.then(PostgresConfig::from_env),
        }
    }

    pub fn with_blob_backend(mut self, backend: BlobBackend) -> Self {
        self.blob_backend = backend;
        self
    }

    pub fn with_local_dir(mut self, dir: impl Into<String>) -> Self {
        self.local_dir = dir.into();
        self.blob_backend = BlobBackend::Local;
        self
    }

    pub fn with_postgres(mut self, config: PostgresConfig) -> Self {
        self.postgres = Some(config);
        self.use_psql = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub backend: AuthBackend,
    pub static_tokens: HashMap<String, Identity>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            backend: AuthBackend::Static,
            static_tokens: HashMap::new(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let backend = match env::var("AUTH_BACKEND").ok().as_deref() {
            Some("supabase") => AuthBackend::Supabase,
            _ => AuthBackend::Static,
        };
        let static_tokens = env::var("STATIC_AUTH_TOKENS")
            .map(|raw| parse_static_tokens(&raw))
            .unwrap_or_default();

        AuthConfig {
            backend,
            static_tokens,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.static_tokens.insert(token.into(), identity);
        self.backend = AuthBackend::Static;
        self
    }
}

/// Parses `token=user_id,token2=user_id2`. Malformed pairs are skipped.
pub fn parse_static_tokens(raw: &str) -> HashMap<String, Identity> {
    raw.split(',')
        .filter_map(|pair| {
            let (token, user_id) = pair.split_once('=')?;
            let (token, user_id) = (token.trim(), user_id.trim());
            if token.is_empty() || user_id.is_empty() {
                return None;
            }
            Some((token.to_string(), Identity::new(user_id)))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub public_base_url: String,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    pub supabase: SupabaseConfig,
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            public_base_url: "http://127.0.0.1:8080".to_string(),
            generation: GenerationConfig::default(),
            storage: StorageConfig::default(),
            supabase: SupabaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let public_base_url = env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| {
            format!("http://127.0.0.1:{}", port.unwrap_or(8080))
        });

        Config {
            port,
            public_base_url,
            generation: GenerationConfig::from_env(),
            storage: StorageConfig::from_env(),
            supabase: SupabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    pub fn with_generation(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    pub fn with_storage(mut self, config: StorageConfig) -> Self {
        self.storage = config;
        self
    }

    pub fn with_supabase(mut self, config: SupabaseConfig) -> Self {
        self.supabase = config;
        self
    }

    pub fn with_auth(mut self, config: AuthConfig) -> Self {
        self.auth = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_defaults_to_pollinations_for_unknown_values() {
        assert_eq!(ProviderKind::parse("hf"), ProviderKind::HuggingFace);
        assert_eq!(ProviderKind::parse(" HF "), ProviderKind::HuggingFace);
        assert_eq!(ProviderKind::parse("pollinations"), ProviderKind::Pollinations);
        assert_eq!(ProviderKind::parse("anything"), ProviderKind::Pollinations);
    }

    #[test]
    fn static_tokens_skip_malformed_pairs() {
        let tokens = parse_static_tokens("abc=user-1, def = user-2,broken,=x,y=");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["abc"].id, "user-1");
        assert_eq!(tokens["def"].id, "user-2");
    }

    #[test]
    fn builders_set_backends() {
        let storage = StorageConfig::new().with_local_dir("/tmp/blobs");
        assert_eq!(storage.blob_backend, BlobBackend::Local);

        let storage = StorageConfig::new().with_postgres(PostgresConfig::new());
        assert!(storage.use_psql);

        let auth = AuthConfig::default().with_token("t", Identity::new("u"));
        assert_eq!(auth.backend, AuthBackend::Static);
        assert_eq!(BlobBackend::parse("Supabase"), Some(BlobBackend::Supabase));
        assert_eq!(BlobBackend::parse("s3"), None);
    }
}
