use crate::{
    auth::Authenticator,
    config::SupabaseConfig,
    error::{Result, StudioError},
    models::{Identity, Session},
    storage::parse_base_url,
};
use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, Default)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl From<SupabaseUser> for Identity {
    fn from(user: SupabaseUser) -> Self {
        let metadata = user.user_metadata.unwrap_or_default();
        Identity {
            id: user.id,
            email: user.email,
            name: metadata.full_name.or(metadata.name),
            avatar_url: metadata.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Supabase GoTrue REST client.
pub struct SupabaseAuthenticator {
    client: Client,
    base: url::Url,
    anon_key: String,
}

impl SupabaseAuthenticator {
    pub fn new(client: Client, config: SupabaseConfig) -> Result<Self> {
        let url = config
            .url
            .ok_or_else(|| StudioError::ConfigError("SUPABASE_URL is required".into()))?;
        let anon_key = config
            .anon_key
            .ok_or_else(|| StudioError::ConfigError("SUPABASE_ANON_KEY is required".into()))?;

        Ok(Self {
            client,
            base: parse_base_url(&url)?,
            anon_key,
        })
    }

    fn endpoint(&self, segment: &str) -> url::Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["auth", "v1", segment]);
        }
        url
    }

    fn user_url(&self) -> url::Url {
        self.endpoint("user")
    }

    fn token_url(&self) -> url::Url {
        let mut url = self.endpoint("token");
        url.query_pairs_mut().append_pair("grant_type", "pkce");
        url
    }
}

#[async_trait]
impl Authenticator for SupabaseAuthenticator {
    async fn identify(&self, token: &str) -> Result<Option<Identity>> {
        let response = self
            .client
            .get(self.user_url())
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("Auth lookup failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: SupabaseUser = response
                    .json()
                    .await
                    .map_err(|e| StudioError::SerializationError(e.to_string()))?;
                Ok(Some(user.into()))
            }
            status => {
                log::warn!("Auth lookup returned {}", status);
                Ok(None)
            }
        }
    }

    async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> Result<Session> {
        let response = self
            .client
            .post(self.token_url())
            .header("apikey", &self.anon_key)
            .json(&json!({
                "auth_code": code,
                "code_verifier": verifier.unwrap_or_default(),
            }))
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("Code exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AuthErrorBody>(&text)
                .ok()
                .and_then(|body| body.error_description.or(body.msg).or(body.message))
                .unwrap_or(text);
            log::warn!("Code exchange rejected ({}): {}", status, message);
            return Err(StudioError::Unauthenticated);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StudioError::SerializationError(e.to_string()))?;

        Ok(Session {
            access_token: token.access_token,
            expires_in: token.expires_in,
            identity: token.user.map(Identity::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> SupabaseAuthenticator {
        let config = SupabaseConfig::default().with_credentials(
            "https://project.supabase.co/",
            "anon",
            "service",
        );
        SupabaseAuthenticator::new(Client::new(), config).unwrap()
    }

    #[test]
    fn builds_endpoints() {
        let auth = authenticator();
        assert_eq!(
            auth.user_url().as_str(),
            "https://project.supabase.co/auth/v1/user"
        );
        assert_eq!(
            auth.token_url().as_str(),
            "https://project.supabase.co/auth/v1/token?grant_type=pkce"
        );
    }

    #[test]
    fn identity_prefers_full_name() {
        let user: SupabaseUser = serde_json::from_value(json!({
            "id": "u-1",
            "email": "a@example.com",
            "user_metadata": {"full_name": "Ada", "name": "ada", "avatar_url": "https://x/a.png"}
        }))
        .unwrap();
        let identity = Identity::from(user);
        assert_eq!(identity.name.as_deref(), Some("Ada"));
        assert_eq!(identity.avatar_url.as_deref(), Some("https://x/a.png"));

        let bare: SupabaseUser = serde_json::from_value(json!({"id": "u-2"})).unwrap();
        assert_eq!(Identity::from(bare), Identity::new("u-2"));
    }

    #[test]
    fn requires_anon_key() {
        let config = SupabaseConfig {
            url: Some("https://project.supabase.co".into()),
            ..SupabaseConfig::default()
        };
        assert!(SupabaseAuthenticator::new(Client::new(), config).is_err());
    }
}
