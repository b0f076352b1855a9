//! Session context carrying the bearer token sent with every stats request.
//!
//! The context is handed to [`StatsCacheManager`](crate::cache::StatsCacheManager)
//! at construction. Clones share the same token, so a login flow elsewhere in the
//! application can update it without rebuilding the dashboard.

use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct SessionContext {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionContext {
    /// Create a context with no credential
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context already holding a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// Current token, if any
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    /// Forget the token (logout)
    pub fn clear(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("has_token", &self.token().is_some())
            .finish()
    }
}
