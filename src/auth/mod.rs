//! Authentication: credential store contract, session gate, lifecycle signals.
//!
//! The gate is the only writer of the current session. Everything else
//! reads it through `SessionGate::current_identity` / `is_authorized`.

pub mod gate;
pub mod mock_store;
pub mod signals;
pub mod token;

pub use gate::{Revalidation, Session, SessionGate, SessionState};
pub use mock_store::MockCredentialStore;
pub use signals::SignalListener;
pub use token::SessionToken;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::Identity;
use crate::session_cache::CacheError;

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
    #[error("Session cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Session state lock poisoned")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Credential store contract
// ═══════════════════════════════════════════════════════════

/// Successful login: the issued credential and who it belongs to.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: SessionToken,
    pub identity: Identity,
}

/// Out-of-band session lifecycle notification from the credential store.
#[derive(Debug, Clone)]
pub enum AuthSignal {
    /// A sign-in completed elsewhere (another tab, SSO redirect).
    SignedIn { token: SessionToken },
    /// The session ended elsewhere or was revoked.
    SignedOut,
    /// The credential was rotated. The identity is unchanged.
    /// `previous` is the SHA-256 digest of the credential it replaces, so
    /// only the session holding that credential adopts the new one.
    TokenRefreshed {
        previous: [u8; 32],
        token: SessionToken,
    },
}

/// Remote (or mock) credential issuer.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exchange email + secret for a credential.
    /// Fails with `AuthError::InvalidCredentials` on bad input.
    async fn login(&self, email: &str, secret: &str) -> Result<LoginGrant, AuthError>;

    /// Best-effort remote logout.
    async fn logout(&self, token: &SessionToken) -> Result<(), AuthError>;

    /// Resolve the identity for an existing credential.
    /// `Ok(None)` means the store no longer recognizes it.
    async fn current_user(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError>;

    /// Subscribe to lifecycle signals. Delivery order is preserved.
    fn subscribe(&self) -> broadcast::Receiver<AuthSignal>;
}
