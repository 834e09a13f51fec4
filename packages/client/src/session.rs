use crate::error::{ClientError, Result};

/// Authentication context threaded explicitly into every backend call.
///
/// Populated at login (outside this crate) and only ever read here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<i64>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: i64, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.username = Some(username.into());
        self
    }

    /// The bearer token, or `AuthRequired` when absent or blank.
    pub fn bearer(&self) -> Result<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::AuthRequired)
    }

    pub fn require_user_id(&self) -> Result<i64> {
        self.user_id.ok_or(ClientError::AuthRequired)
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_ok()
    }
}
