pub mod static_tokens;
pub mod supabase;

use crate::{
    config::{AuthBackend, AuthConfig, SupabaseConfig},
    error::Result,
    models::{Identity, Session},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use static_tokens::StaticAuthenticator;
pub use supabase::SupabaseAuthenticator;

/// Cookie carrying the access token for browser callers.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
/// Cookie carrying the PKCE verifier written by the sign-in page.
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

/// Resolves bearer tokens to identities.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `None` for unknown, expired or malformed tokens.
    async fn identify(&self, token: &str) -> Result<Option<Identity>>;

    /// Trades an OAuth callback code for a session.
    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> Result<Session>;
}

pub fn from_config(
    auth: &AuthConfig,
    supabase: &SupabaseConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn Authenticator>> {
    let authenticator: Arc<dyn Authenticator> = match auth.backend {
        AuthBackend::Supabase => Arc::new(SupabaseAuthenticator::new(http, supabase.clone())?),
        AuthBackend::Static => {
            if auth.static_tokens.is_empty() {
                log::warn!("No STATIC_AUTH_TOKENS configured; every request is anonymous");
            }
            Arc::new(StaticAuthenticator::new(auth.static_tokens.clone()))
        }
    };
    Ok(authenticator)
}

/// Extracts the token from an `Authorization: Bearer` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Identity for an optional token; a rejected token is treated as anonymous.
pub async fn resolve(
    authenticator: &dyn Authenticator,
    token: Option<&str>,
) -> Result<Option<Identity>> {
    match token {
        Some(token) => authenticator.identify(token).await,
        None => Ok(None),
    }
}
