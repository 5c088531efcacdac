use serde::{Deserialize, Serialize};

/// The authenticated caller. Everything but `id` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Identity {
            id: id.into(),
            email: None,
            name: None,
            avatar_url: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub identity: Option<Identity>,
}
