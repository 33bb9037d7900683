//! Session token sourcing and invalidation
//!
//! The client does not own authentication: an embedding application injects
//! a [`SessionProvider`] that hands out the current bearer token and tears
//! the session down when the backend reports it dead. One provider, one
//! resolution strategy — token refresh, persistence and sign-in flows are
//! the provider's business.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

/// Supplies bearer tokens for outgoing requests and reacts to session death
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current access token, or `None` when no session is established.
    ///
    /// May be momentarily `None` while a session is still initializing; the
    /// client tolerates this by asking exactly once more after a short,
    /// configurable delay.
    async fn access_token(&self) -> Option<String>;

    /// Invalidate the current session.
    ///
    /// Called by the client after a request that carried a token is rejected
    /// with 401 — proof the session is no longer valid. Best-effort:
    /// implementations should log failures rather than surface them.
    async fn invalidate(&self);
}

/// In-memory session for embedders that manage tokens themselves, and for
/// tests that need a controllable token source
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    /// Create a session with no token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session holding `token`
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Install or replace the current token
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Current token, if any
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

#[async_trait]
impl SessionProvider for MemorySession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn invalidate(&self) {
        if self.token.write().take().is_some() {
            debug!("Session invalidated, token cleared");
        }
    }
}
