//! Session gate: the single owner of "who is acting right now".
//!
//! States: Unauthenticated ⇄ Authenticated. Transitions happen only through
//! `authenticate`, `end_session`, `apply_signal`, `revalidate` and the
//! startup `restore`. Every transition writes the persistent cache before
//! the new in-memory state becomes visible.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};

use subtle::ConstantTimeEq;

use super::signals::SignalListener;
use super::token::SessionToken;
use super::{AuthError, AuthSignal, CredentialStore};
use crate::authorization;
use crate::models::{Identity, Role};
use crate::session_cache::PersistentSessionCache;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// A live credential bound to exactly one identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub identity: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Outcome of checking the held credential against the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revalidation {
    /// Store still recognizes the credential.
    Valid(Identity),
    /// Store no longer recognizes it; local session was dropped.
    Desynced,
    /// Nothing to check.
    Unauthenticated,
}

// ═══════════════════════════════════════════════════════════
// SessionGate
// ═══════════════════════════════════════════════════════════

/// Owns the current session. Shared as `Arc<SessionGate>`.
pub struct SessionGate {
    store: Arc<dyn CredentialStore>,
    cache: PersistentSessionCache,
    session: RwLock<Option<Session>>,
    /// Held for a whole transition (cache write + swap). Readers only
    /// take `session`, and only for the swap itself.
    transition: Mutex<()>,
}

impl SessionGate {
    /// Build a gate, optimistically restoring a complete cached pair.
    ///
    /// The cached credential is trusted without contacting the credential
    /// store. A partial or unreadable pair is cleared and the gate starts
    /// unauthenticated.
    pub fn restore(store: Arc<dyn CredentialStore>, cache: PersistentSessionCache) -> Self {
        let session = match cache.load() {
            Ok(Some((token, identity))) => {
                tracing::info!(user_id = %identity.id, role = %identity.role, "Restored cached session");
                Some(Session { token, identity })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unusable cached session");
                if let Err(e) = cache.clear() {
                    tracing::warn!(error = %e, "Failed to clear session cache");
                }
                None
            }
        };

        Self {
            store,
            cache,
            session: RwLock::new(session),
            transition: Mutex::new(()),
        }
    }

    // ── Read path ───────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        if self.current_role().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Current identity. Never touches the network.
    pub fn current_identity(&self) -> Option<Identity> {
        self.session
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.identity.clone()))
    }

    /// Role of the current identity. A poisoned lock reads as signed out.
    pub fn current_role(&self) -> Option<Role> {
        self.session
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.identity.role))
    }

    /// Copy of the held credential, for collaborators that must attach it
    /// to outgoing requests.
    pub fn current_token(&self) -> Option<SessionToken> {
        self.session
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.token.clone()))
    }

    /// Empty `required` means "any signed-in identity".
    pub fn is_authorized(&self, required: &[Role]) -> bool {
        authorization::is_role_allowed(self.current_role(), required)
    }

    // ── Transitions ─────────────────────────────────────────

    /// Sign in through the credential store.
    ///
    /// On failure nothing is written: neither the cache nor memory changes.
    pub async fn authenticate(&self, email: &str, secret: &str) -> Result<Identity, AuthError> {
        let grant = match self.store.login(email, secret).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::info!(error = %e, "Sign-in rejected");
                return Err(e);
            }
        };

        let identity = grant.identity.clone();
        self.install(grant.token, grant.identity)?;
        tracing::info!(user_id = %identity.id, role = %identity.role, "Signed in");
        Ok(identity)
    }

    /// Sign out. Always ends unauthenticated, even if the remote
    /// logout fails.
    pub async fn end_session(&self) {
        if let Some(token) = self.current_token() {
            if let Err(e) = self.store.logout(&token).await {
                tracing::warn!(error = %e, "Remote logout failed; clearing local session anyway");
            }
        }
        self.clear_local();
        tracing::info!("Signed out");
    }

    /// Apply one lifecycle signal from the credential store.
    pub async fn apply_signal(&self, signal: AuthSignal) {
        match signal {
            AuthSignal::SignedIn { token } => {
                tracing::debug!("Processing sign-in signal");
                match self.store.current_user(&token).await {
                    Ok(Some(identity)) => {
                        let user_id = identity.id.clone();
                        match self.install(token, identity) {
                            Ok(()) => tracing::info!(%user_id, "Session adopted from sign-in signal"),
                            Err(e) => tracing::warn!(error = %e, "Failed to adopt signalled session"),
                        }
                    }
                    Ok(None) => {
                        tracing::warn!("Sign-in signal carried an unrecognized credential; ignored")
                    }
                    Err(e) => tracing::warn!(error = %e, "Could not resolve signalled sign-in"),
                }
            }
            AuthSignal::SignedOut => {
                tracing::debug!("Processing sign-out signal");
                self.clear_local();
                tracing::info!("Session ended by credential store");
            }
            AuthSignal::TokenRefreshed { previous, token } => {
                tracing::debug!("Processing token refresh signal");
                match self.replace_token(&previous, token) {
                    Ok(true) => tracing::debug!("Session credential rotated"),
                    Ok(false) => tracing::debug!("Token refresh not addressed to this session; ignored"),
                    Err(e) => tracing::warn!(error = %e, "Failed to persist refreshed credential"),
                }
            }
        }
    }

    /// Check the held credential against the credential store.
    ///
    /// Restoration is optimistic; call this when a protected call is
    /// rejected (or eagerly, for strict deployments). A credential the
    /// store no longer recognizes, or that now resolves to a different
    /// identity or role than the one held, drops the local session.
    pub async fn revalidate(&self) -> Result<Revalidation, AuthError> {
        let Some(held) = self.snapshot() else {
            return Ok(Revalidation::Unauthenticated);
        };

        match self.store.current_user(&held.token).await? {
            Some(identity) if identity.id == held.identity.id && identity.role == held.identity.role => {
                Ok(Revalidation::Valid(identity))
            }
            Some(identity) => {
                if self.clear_if_current(&held.token) {
                    tracing::warn!(
                        held_user = %held.identity.id,
                        resolved_user = %identity.id,
                        "Held credential resolves to a different identity; signed out"
                    );
                }
                Ok(Revalidation::Desynced)
            }
            None => {
                if self.clear_if_current(&held.token) {
                    tracing::warn!("Cached session no longer recognized by credential store; signed out");
                }
                Ok(Revalidation::Desynced)
            }
        }
    }

    /// Start applying the credential store's signals in delivery order.
    pub fn listen(self: &Arc<Self>) -> SignalListener {
        SignalListener::spawn(Arc::clone(self), self.store.subscribe())
    }

    // ── Internals ───────────────────────────────────────────

    fn snapshot(&self) -> Option<Session> {
        self.session.read().ok().and_then(|guard| guard.as_ref().cloned())
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache first, then memory. The session lock is taken only for the
    /// swap; the transition lock keeps the two halves together.
    fn install(&self, token: SessionToken, identity: Identity) -> Result<(), AuthError> {
        let _transition = self.begin_transition();
        self.cache.store(&token, &identity)?;
        *self.session.write().map_err(|_| AuthError::LockPoisoned)? = Some(Session { token, identity });
        Ok(())
    }

    /// Swap in a rotated credential, but only if the held one is the
    /// credential it replaces (`previous` is its digest).
    fn replace_token(&self, previous: &[u8; 32], token: SessionToken) -> Result<bool, AuthError> {
        let _transition = self.begin_transition();
        let identity = {
            let guard = self.session.read().map_err(|_| AuthError::LockPoisoned)?;
            match guard.as_ref() {
                Some(session) if bool::from(session.token.digest()[..].ct_eq(&previous[..])) => {
                    session.identity.clone()
                }
                _ => return Ok(false),
            }
        };

        self.cache.store(&token, &identity)?;
        let mut guard = self.session.write().map_err(|_| AuthError::LockPoisoned)?;
        if let Some(session) = guard.as_mut() {
            session.token = token;
        }
        Ok(true)
    }

    fn clear_local(&self) {
        let _transition = self.begin_transition();
        if let Err(e) = self.cache.clear() {
            tracing::warn!(error = %e, "Failed to clear session cache");
        }
        *self.write_session() = None;
    }

    /// Drop the session only if it still holds `token`; a newer
    /// session that replaced it in the meantime wins.
    fn clear_if_current(&self, token: &SessionToken) -> bool {
        let _transition = self.begin_transition();
        let is_current = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| &s.token == token);
        if !is_current {
            return false;
        }
        if let Err(e) = self.cache.clear() {
            tracing::warn!(error = %e, "Failed to clear session cache");
        }
        *self.write_session() = None;
        true
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockCredentialStore;
    use std::sync::Weak;

    use crate::session_cache::{CacheError, KeyValueStore, MemoryStore, IDENTITY_KEY, TOKEN_KEY};

    const FAST: u32 = 1_000;

    fn setup() -> (Arc<MockCredentialStore>, MemoryStore, SessionGate) {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let kv = MemoryStore::new();
        let gate = SessionGate::restore(store.clone(), PersistentSessionCache::new(kv.clone()));
        (store, kv, gate)
    }

    /// A backend that refuses every write.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Ok(None)
        }
        fn set_all(&self, _entries: &[(&str, String)]) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
        fn remove_all(&self, _keys: &[&str]) -> Result<(), CacheError> {
            Ok(())
        }
    }

    /// Removal always fails; writes land in the shared inner store.
    struct StickyStore(MemoryStore);

    impl KeyValueStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.0.get(key)
        }
        fn set_all(&self, entries: &[(&str, String)]) -> Result<(), CacheError> {
            self.0.set_all(entries)
        }
        fn remove_all(&self, _keys: &[&str]) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "locked",
            )))
        }
    }

    /// Records, on every cache write, whether the session lock was free.
    struct ObservingStore {
        gate: Weak<SessionGate>,
        readable: Arc<Mutex<Vec<bool>>>,
    }

    impl KeyValueStore for ObservingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Ok(None)
        }
        fn set_all(&self, _entries: &[(&str, String)]) -> Result<(), CacheError> {
            if let Some(gate) = self.gate.upgrade() {
                let free = gate.session.try_read().is_ok();
                self.readable.lock().unwrap().push(free);
            }
            Ok(())
        }
        fn remove_all(&self, _keys: &[&str]) -> Result<(), CacheError> {
            Ok(())
        }
    }

    // ── Startup ──────────────────────────────────────────

    #[test]
    fn fresh_gate_is_unauthenticated() {
        let (_, _, gate) = setup();
        assert_eq!(gate.state(), SessionState::Unauthenticated);
        assert!(gate.current_identity().is_none());
        assert!(gate.current_token().is_none());
    }

    #[tokio::test]
    async fn restart_restores_cached_identity() {
        let (store, kv, gate) = setup();
        let signed_in = gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();
        drop(gate);

        let restarted = SessionGate::restore(store, PersistentSessionCache::new(kv));
        let restored = restarted.current_identity().unwrap();
        assert_eq!(restored.id, signed_in.id);
        assert_eq!(restored.role, signed_in.role);
        assert_eq!(restored.name, signed_in.name);
        assert!(restarted.is_authenticated());
    }

    #[test]
    fn partial_cache_is_cleared_at_startup() {
        let kv = MemoryStore::new();
        kv.set_all(&[(TOKEN_KEY, "\"orphan\"".to_string())]).unwrap();

        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let gate = SessionGate::restore(store, PersistentSessionCache::new(kv.clone()));

        assert!(!gate.is_authenticated());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn restore_does_not_consult_store() {
        let (store, kv, gate) = setup();
        gate.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();
        let token = gate.current_token().unwrap();
        store.revoke(&token);

        // Optimistic: still authenticated until something revalidates
        let restarted = SessionGate::restore(store, PersistentSessionCache::new(kv));
        assert!(restarted.is_authenticated());
    }

    // ── authenticate ─────────────────────────────────────

    #[tokio::test]
    async fn authenticate_admin_scenario() {
        let (_, kv, gate) = setup();
        let identity = gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();

        assert_eq!(identity.role, Role::Administrator);
        assert_eq!(gate.current_identity(), Some(identity));
        assert_eq!(kv.len(), 2);
    }

    #[tokio::test]
    async fn failed_authentication_changes_nothing() {
        let (_, kv, gate) = setup();

        for _ in 0..3 {
            let err = gate.authenticate("admin@pawscare.com", "wrong").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert!(gate.current_identity().is_none());
            assert!(kv.is_empty());
        }
    }

    #[tokio::test]
    async fn failed_authentication_keeps_existing_session() {
        let (_, kv, gate) = setup();
        gate.authenticate("vet@pawscare.com", "Vet@2026!").await.unwrap();
        let token = gate.current_token().unwrap();

        let err = gate.authenticate("admin@pawscare.com", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(gate.current_role(), Some(Role::Veterinarian));
        assert_eq!(gate.current_token(), Some(token));
        assert_eq!(kv.len(), 2);
    }

    #[tokio::test]
    async fn cache_write_failure_leaves_gate_signed_out() {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let gate = SessionGate::restore(store, PersistentSessionCache::new(ReadOnlyStore));

        let err = gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap_err();
        assert!(matches!(err, AuthError::Cache(_)));
        assert!(!gate.is_authenticated());
    }

    #[tokio::test]
    async fn second_login_replaces_first() {
        let (_, _, gate) = setup();
        gate.authenticate("vet@pawscare.com", "Vet@2026!").await.unwrap();
        gate.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();
        assert_eq!(gate.current_role(), Some(Role::Staff));
    }

    // ── end_session ──────────────────────────────────────

    #[tokio::test]
    async fn end_session_clears_everything() {
        let (store, kv, gate) = setup();
        gate.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();

        gate.end_session().await;
        assert!(gate.current_identity().is_none());
        assert!(kv.is_empty());
        assert_eq!(store.active_tokens(), 0);
    }

    #[tokio::test]
    async fn end_session_survives_remote_failure() {
        let (store, kv, gate) = setup();
        gate.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();
        store.set_logout_outage(true);

        gate.end_session().await;
        assert!(gate.current_identity().is_none());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn end_session_when_signed_out_is_harmless() {
        let (_, _, gate) = setup();
        gate.end_session().await;
        assert_eq!(gate.state(), SessionState::Unauthenticated);
    }

    // ── is_authorized ────────────────────────────────────

    #[tokio::test]
    async fn staff_authorization_scenario() {
        let (_, _, gate) = setup();
        gate.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();

        assert!(!gate.is_authorized(&[Role::Administrator]));
        assert!(gate.is_authorized(&[]));
        assert!(gate.is_authorized(&[Role::Administrator, Role::Staff]));
    }

    #[test]
    fn signed_out_fails_every_rule() {
        let (_, _, gate) = setup();
        assert!(!gate.is_authorized(&[]));
        for role in Role::ALL {
            assert!(!gate.is_authorized(&[role]));
        }
        assert!(!gate.is_authorized(&Role::ALL));
    }

    // ── Signals ──────────────────────────────────────────

    #[tokio::test]
    async fn signed_in_signal_adopts_resolvable_session() {
        let (store, kv, gate) = setup();
        let token = store.sign_in_elsewhere("vet@pawscare.com", "Vet@2026!").unwrap();

        gate.apply_signal(AuthSignal::SignedIn { token: token.clone() }).await;
        assert_eq!(gate.current_role(), Some(Role::Veterinarian));
        assert_eq!(gate.current_token(), Some(token));
        assert_eq!(kv.len(), 2);
    }

    #[tokio::test]
    async fn signed_in_signal_with_unknown_token_is_ignored() {
        let (_, kv, gate) = setup();
        gate.apply_signal(AuthSignal::SignedIn {
            token: SessionToken::new("forged"),
        })
        .await;
        assert!(!gate.is_authenticated());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn signed_out_signal_always_clears() {
        let (_, kv, gate) = setup();
        gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();

        gate.apply_signal(AuthSignal::SignedOut).await;
        assert!(!gate.is_authenticated());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn refresh_signal_replaces_only_token() {
        let (store, kv, gate) = setup();
        let before = gate.authenticate("vet@pawscare.com", "Vet@2026!").await.unwrap();
        let old = gate.current_token().unwrap();
        let fresh = store.refresh(&old).unwrap();

        gate.apply_signal(AuthSignal::TokenRefreshed {
            previous: old.digest(),
            token: fresh.clone(),
        })
        .await;
        assert_eq!(gate.current_token(), Some(fresh.clone()));
        assert_eq!(gate.current_identity(), Some(before.clone()));

        // Cache mirrors the new pair
        let restarted = SessionGate::restore(store, PersistentSessionCache::new(kv));
        assert_eq!(restarted.current_token(), Some(fresh));
        assert_eq!(restarted.current_identity(), Some(before));
    }

    #[tokio::test]
    async fn refresh_signal_while_signed_out_is_ignored() {
        let (_, kv, gate) = setup();
        gate.apply_signal(AuthSignal::TokenRefreshed {
            previous: SessionToken::new("old").digest(),
            token: SessionToken::new("tok"),
        })
        .await;
        assert!(!gate.is_authenticated());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn refresh_of_another_session_is_ignored() {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let vet = SessionGate::restore(store.clone(), PersistentSessionCache::new(MemoryStore::new()));
        let staff_kv = MemoryStore::new();
        let staff = SessionGate::restore(store.clone(), PersistentSessionCache::new(staff_kv.clone()));

        vet.authenticate("vet@pawscare.com", "Vet@2026!").await.unwrap();
        staff.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();
        let staff_token = staff.current_token().unwrap();
        let cached_token = staff_kv.get(TOKEN_KEY).unwrap();

        let vet_token = vet.current_token().unwrap();
        let fresh = store.refresh(&vet_token).unwrap();
        let signal = AuthSignal::TokenRefreshed {
            previous: vet_token.digest(),
            token: fresh.clone(),
        };
        staff.apply_signal(signal.clone()).await;
        vet.apply_signal(signal).await;

        assert_eq!(staff.current_token(), Some(staff_token.clone()));
        assert_eq!(staff_kv.get(TOKEN_KEY).unwrap(), cached_token);
        let held = store.current_user(&staff_token).await.unwrap().unwrap();
        assert_eq!(held.id, staff.current_identity().unwrap().id);

        assert_eq!(vet.current_token(), Some(fresh));
        assert_eq!(vet.current_role(), Some(Role::Veterinarian));
    }

    // ── end_session (cache) ──────────────────────────────

    #[tokio::test]
    async fn sign_out_sticks_when_cache_removal_fails() {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let kv = MemoryStore::new();
        let gate = SessionGate::restore(store.clone(), PersistentSessionCache::new(StickyStore(kv.clone())));
        gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();

        gate.end_session().await;
        assert!(!gate.is_authenticated());

        let restarted = SessionGate::restore(store, PersistentSessionCache::new(StickyStore(kv)));
        assert!(!restarted.is_authenticated());
    }

    // ── Lock scope ───────────────────────────────────────

    #[tokio::test]
    async fn readers_are_not_blocked_during_cache_writes() {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let readable = Arc::new(Mutex::new(Vec::new()));
        let observed = readable.clone();
        let gate = Arc::new_cyclic(|weak| {
            SessionGate::restore(
                store.clone(),
                PersistentSessionCache::new(ObservingStore {
                    gate: weak.clone(),
                    readable: observed,
                }),
            )
        });

        gate.authenticate("vet@pawscare.com", "Vet@2026!").await.unwrap();
        let old = gate.current_token().unwrap();
        let fresh = store.refresh(&old).unwrap();
        gate.apply_signal(AuthSignal::TokenRefreshed {
            previous: old.digest(),
            token: fresh,
        })
        .await;

        let readable = readable.lock().unwrap();
        assert_eq!(readable.len(), 2);
        assert!(readable.iter().all(|free| *free));
    }

    // ── revalidate ───────────────────────────────────────

    #[tokio::test]
    async fn revalidate_valid_session() {
        let (_, _, gate) = setup();
        let who = gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();
        assert_eq!(gate.revalidate().await.unwrap(), Revalidation::Valid(who));
        assert!(gate.is_authenticated());
    }

    #[tokio::test]
    async fn revalidate_revoked_session_desyncs() {
        let (store, kv, gate) = setup();
        gate.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();
        store.revoke(&gate.current_token().unwrap());

        assert_eq!(gate.revalidate().await.unwrap(), Revalidation::Desynced);
        assert!(!gate.is_authenticated());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn revalidate_credential_of_other_identity_desyncs() {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let vet_token = store.login("vet@pawscare.com", "Vet@2026!").await.unwrap().token;
        let staff = crate::models::Identity::new("usr-staff", "staff@pawscare.com", "Sam Rivera", Role::Staff);

        // A cached pair whose credential belongs to someone else
        let kv = MemoryStore::new();
        PersistentSessionCache::new(kv.clone()).store(&vet_token, &staff).unwrap();
        let gate = SessionGate::restore(store, PersistentSessionCache::new(kv.clone()));
        assert_eq!(gate.current_role(), Some(Role::Staff));

        assert_eq!(gate.revalidate().await.unwrap(), Revalidation::Desynced);
        assert!(!gate.is_authenticated());
        assert!(kv.get(IDENTITY_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn revalidate_after_role_change_desyncs() {
        let (store, _, gate) = setup();
        let who = gate.authenticate("staff@pawscare.com", "Staff@2026!").await.unwrap();

        let mut promoted = who.clone();
        promoted.role = Role::Administrator;
        store.add_account(promoted, "Staff@2026!");

        assert_eq!(gate.revalidate().await.unwrap(), Revalidation::Desynced);
        assert_eq!(gate.current_role(), None);
    }

    #[tokio::test]
    async fn revalidate_when_signed_out() {
        let (_, _, gate) = setup();
        assert_eq!(gate.revalidate().await.unwrap(), Revalidation::Unauthenticated);
    }

    #[tokio::test]
    async fn gates_are_isolated() {
        let store = Arc::new(MockCredentialStore::seeded_with_iterations(FAST));
        let a = SessionGate::restore(store.clone(), PersistentSessionCache::new(MemoryStore::new()));
        let b = SessionGate::restore(store, PersistentSessionCache::new(MemoryStore::new()));

        a.authenticate("admin@pawscare.com", "Admin@2026!").await.unwrap();
        assert!(a.is_authenticated());
        assert!(!b.is_authenticated());
    }
}
