use std::time::Duration;

use crate::constants::{SEARCH_MIN_CHARS, SEARCH_SETTLE_MS};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the REST API, e.g. `https://api.example.com/v1`
    pub api_base: String,
    /// Bearer token attached to every request. Read-only from this
    /// crate's perspective; refresh is the surrounding app's concern.
    pub auth_token: Option<String>,
    /// Quiet period before an incremental search issues a lookup
    pub search_settle: Duration,
    /// Minimum query length that triggers a lookup
    pub search_min_chars: usize,
}

impl CoreConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            auth_token: None,
            search_settle: Duration::from_millis(SEARCH_SETTLE_MS),
            search_min_chars: SEARCH_MIN_CHARS,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}
