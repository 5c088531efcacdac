use crate::{
    auth::Authenticator,
    error::{Result, StudioError},
    models::{Identity, Session},
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Fixed token table for local development and tests.
pub struct StaticAuthenticator {
    tokens: HashMap<String, Identity>,
}

impl StaticAuthenticator {
    pub fn new(tokens: HashMap<String, Identity>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn identify(&self, token: &str) -> Result<Option<Identity>> {
        Ok(self.tokens.get(token).cloned())
    }

    // A code is accepted only when it is itself a known token.
    async fn exchange_code(&self, code: &str, _verifier: Option<&str>) -> Result<Session> {
        let identity = self
            .tokens
            .get(code)
            .cloned()
            .ok_or(StudioError::Unauthenticated)?;

        Ok(Session {
            access_token: code.to_string(),
            expires_in: None,
            identity: Some(identity),
        })
    }
}
