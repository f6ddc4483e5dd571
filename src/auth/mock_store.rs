//! In-memory credential store backed by the demo account dataset.
//!
//! Secrets are kept as PBKDF2-SHA256 hashes with a per-account salt and
//! compared in constant time. Issued tokens are kept only as SHA-256
//! digests. Lifecycle changes made through this store (sign-in elsewhere,
//! revocation, refresh) are broadcast as `AuthSignal`s.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;

use super::token::SessionToken;
use super::{AuthError, AuthSignal, CredentialStore, LoginGrant};
use crate::models::{Identity, Role};

/// PBKDF2 rounds for stored secrets.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// Signals buffered per subscriber before the slowest one starts lagging.
const SIGNAL_CAPACITY: usize = 64;

/// Demo accounts: (id, email, name, role, secret).
const DEMO_ACCOUNTS: &[(&str, &str, &str, Role, &str)] = &[
    ("usr-admin", "admin@pawscare.com", "Alex Morgan", Role::Administrator, "Admin@2026!"),
    ("vet-1", "vet@pawscare.com", "Maya Ortiz", Role::Veterinarian, "Vet@2026!"),
    ("usr-staff", "staff@pawscare.com", "Sam Rivera", Role::Staff, "Staff@2026!"),
];

struct Account {
    identity: Identity,
    salt: [u8; SALT_LENGTH],
    secret_hash: [u8; HASH_LENGTH],
}

/// Mock credential store for offline mode and tests.
pub struct MockCredentialStore {
    iterations: u32,
    /// Keyed by normalized email.
    accounts: RwLock<HashMap<String, Account>>,
    /// Token digest → account email.
    tokens: RwLock<HashMap<[u8; 32], String>>,
    signals: broadcast::Sender<AuthSignal>,
    logout_outage: AtomicBool,
}

impl MockCredentialStore {
    /// Empty store hashing secrets with the given PBKDF2 rounds.
    pub fn new(iterations: u32) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            iterations: iterations.max(1),
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            signals,
            logout_outage: AtomicBool::new(false),
        }
    }

    /// Store seeded with the demo accounts.
    pub fn seeded() -> Self {
        Self::seeded_with_iterations(DEFAULT_ITERATIONS)
    }

    pub fn seeded_with_iterations(iterations: u32) -> Self {
        let store = Self::new(iterations);
        for (id, email, name, role, secret) in DEMO_ACCOUNTS {
            let mut identity = Identity::new(*id, *email, *name, *role);
            if *role == Role::Veterinarian {
                identity = identity.with_specialties(["surgery", "dentistry"]);
            }
            store.add_account(identity, secret);
        }
        store
    }

    /// Register (or replace) an account.
    pub fn add_account(&self, identity: Identity, secret: &str) {
        let salt: [u8; SALT_LENGTH] = rand::random();
        let secret_hash = self.hash_secret(secret, &salt);
        let key = normalize_email(&identity.email);
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(key, Account { identity, salt, secret_hash });
        }
    }

    /// Enable or disable an account. Returns false if unknown.
    pub fn set_active(&self, email: &str, active: bool) -> bool {
        let Ok(mut accounts) = self.accounts.write() else {
            return false;
        };
        match accounts.get_mut(&normalize_email(email)) {
            Some(account) => {
                account.identity.active = active;
                true
            }
            None => false,
        }
    }

    /// Simulate the remote logout endpoint being unreachable.
    pub fn set_logout_outage(&self, down: bool) {
        self.logout_outage.store(down, Ordering::SeqCst);
    }

    /// Invalidate a credential without notifying subscribers
    /// (server-side revocation the client has not heard about).
    pub fn revoke(&self, token: &SessionToken) -> bool {
        self.tokens
            .write()
            .map(|mut tokens| tokens.remove(&token.digest()).is_some())
            .unwrap_or(false)
    }

    /// Invalidate a credential and broadcast `SignedOut`.
    pub fn revoke_and_notify(&self, token: &SessionToken) -> bool {
        let revoked = self.revoke(token);
        if revoked {
            self.emit(AuthSignal::SignedOut);
        }
        revoked
    }

    /// A sign-in performed in another context; broadcasts `SignedIn`.
    pub fn sign_in_elsewhere(&self, email: &str, secret: &str) -> Result<SessionToken, AuthError> {
        let grant = self.issue(email, secret)?;
        self.emit(AuthSignal::SignedIn {
            token: grant.token.clone(),
        });
        Ok(grant.token)
    }

    /// Rotate a credential; broadcasts `TokenRefreshed` with the new value.
    pub fn refresh(&self, token: &SessionToken) -> Option<SessionToken> {
        let mut tokens = self.tokens.write().ok()?;
        let email = tokens.remove(&token.digest())?;
        let fresh = SessionToken::generate();
        tokens.insert(fresh.digest(), email);
        drop(tokens);

        self.emit(AuthSignal::TokenRefreshed {
            previous: token.digest(),
            token: fresh.clone(),
        });
        Some(fresh)
    }

    /// Number of live credentials.
    pub fn active_tokens(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    fn emit(&self, signal: AuthSignal) {
        // No subscribers is not an error.
        let _ = self.signals.send(signal);
    }

    fn hash_secret(&self, secret: &str, salt: &[u8; SALT_LENGTH]) -> [u8; HASH_LENGTH] {
        let mut out = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, self.iterations, &mut out);
        out
    }

    fn issue(&self, email: &str, secret: &str) -> Result<LoginGrant, AuthError> {
        let key = normalize_email(email);
        let identity = {
            let accounts = self.accounts.read().map_err(|_| AuthError::LockPoisoned)?;
            let Some(account) = accounts.get(&key) else {
                // Burn the same work as a real check so unknown emails
                // are not distinguishable by timing.
                let _ = self.hash_secret(secret, &[0u8; SALT_LENGTH]);
                return Err(AuthError::InvalidCredentials);
            };
            let candidate = self.hash_secret(secret, &account.salt);
            if !bool::from(candidate[..].ct_eq(&account.secret_hash[..])) {
                return Err(AuthError::InvalidCredentials);
            }
            if !account.identity.active {
                tracing::debug!(user_id = %account.identity.id, "Login refused for inactive account");
                return Err(AuthError::InvalidCredentials);
            }
            account.identity.clone()
        };

        let token = SessionToken::generate();
        self.tokens
            .write()
            .map_err(|_| AuthError::LockPoisoned)?
            .insert(token.digest(), key);
        Ok(LoginGrant { token, identity })
    }

    fn resolve(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError> {
        let email = {
            let tokens = self.tokens.read().map_err(|_| AuthError::LockPoisoned)?;
            match tokens.get(&token.digest()) {
                Some(email) => email.clone(),
                None => return Ok(None),
            }
        };
        let accounts = self.accounts.read().map_err(|_| AuthError::LockPoisoned)?;
        Ok(accounts
            .get(&email)
            .filter(|a| a.identity.active)
            .map(|a| a.identity.clone()))
    }
}

impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::seeded()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn login(&self, email: &str, secret: &str) -> Result<LoginGrant, AuthError> {
        self.issue(email, secret)
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), AuthError> {
        if self.logout_outage.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("logout endpoint unreachable".into()));
        }
        self.revoke(token);
        Ok(())
    }

    async fn current_user(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError> {
        self.resolve(token)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthSignal> {
        self.signals.subscribe()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
