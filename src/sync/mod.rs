//! Session-profile synchronizer — keeps the current user consistent with
//! the auth provider's session.
//!
//! DESIGN
//! ======
//! The synchronizer is the only writer of a `watch` cell holding
//! `AuthState`. Readers subscribe to the cell instead of polling.
//!
//! Every state-changing step runs under a single in-flight guard. Explicit
//! operations (`sign_up`, `sign_in`, `sign_out`, `update_profile`) wait for
//! it; session-change events only `try_lock`. An event that finds the guard
//! held raises `pending_reconcile` instead of running, and whoever releases
//! the guard replays one reconciliation, so overlapping events collapse into
//! a single pass but a session change is never lost. Event handling
//! reconciles against the provider's *current* session rather than the event
//! payload, so a stale `SignedIn` that arrives after a rollback cannot
//! resurrect a user.
//!
//! Sign-in and sign-up publish only when the provider still holds a session
//! for the resolved identity. Sign-up without a session (email confirmation
//! pending) creates the profile row but leaves the user absent.
//!
//! Profile reads and writes are bounded by a timeout, and startup
//! reconciliation as a whole shares one bound. On expiry the store
//! future is dropped, so a late result has nowhere to land and can never
//! overwrite state that was already settled.
//!
//! SIGN-UP POLICY
//! ==============
//! Insert exactly one profile keyed by the new identity id. A uniqueness
//! violation means a server-side trigger won the race, so fall back to a
//! read. Any other failure signs the provider session out and clears the
//! user before the error is returned; callers never observe an
//! authenticated-but-profileless steady state.

pub mod state;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{AuthProvider, ProviderError, Session, SessionEvent};
use crate::nav::{DASHBOARD_PATH, HOME_PATH, Navigator};
use crate::profile::{NewProfile, ProfileStore, ProfileUpdate, StoreError, UserProfile, normalize_email};
pub use state::AuthState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("an account with this email already exists; use a different email or sign in")]
    DuplicateIdentity,
    #[error("user profile not found for {0}; please contact support")]
    ProfileMissing(Uuid),
    #[error("profile resolution timed out after {}s", .0.as_secs())]
    ResolutionTimeout(Duration),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("the auth session changed before the operation completed")]
    SessionChanged,
    #[error("auth provider error: {0}")]
    Provider(ProviderError),
    #[error("profile store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::DuplicateIdentity => "E_DUPLICATE_IDENTITY",
            Self::ProfileMissing(_) => "E_PROFILE_MISSING",
            Self::ResolutionTimeout(_) => "E_RESOLUTION_TIMEOUT",
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::SessionChanged => "E_SESSION_CHANGED",
            Self::Provider(_) => "E_PROVIDER",
            Self::Store(_) => "E_STORE",
        }
    }
}

impl From<ProviderError> for SyncError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::DuplicateIdentity => Self::DuplicateIdentity,
            other => Self::Provider(other),
        }
    }
}

// =============================================================================
// SYNCHRONIZER
// =============================================================================

pub struct Synchronizer {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn ProfileStore>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
    in_flight: Mutex<()>,
    /// Set by session events that found the guard held.
    pending_reconcile: AtomicBool,
    timeout: Duration,
}

impl Synchronizer {
    #[must_use]
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn ProfileStore>,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::initial());
        Self {
            provider,
            store,
            navigator,
            state,
            in_flight: Mutex::new(()),
            pending_reconcile: AtomicBool::new(false),
            timeout,
        }
    }

    /// Receive every state transition from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Restore any existing session and start listening for session changes.
    ///
    /// Always settles `loading = false` before returning, within one timeout
    /// for the whole restore. Reconciliation failures (including the
    /// resolution timeout) are logged and leave the user absent. The returned
    /// task runs until the provider's event stream closes or the synchronizer
    /// is dropped.
    pub async fn initialize(self: &Arc<Self>) -> JoinHandle<()> {
        // Subscribe before reconciling so no transition is missed.
        let events = self.provider.subscribe();
        self.guarded(self.restore_session()).await;
        info!(authenticated = self.snapshot().is_authenticated(), "auth state initialized");
        spawn_session_watcher(Arc::downgrade(self), events)
    }

    /// Read the profile for `identity_id` and publish it if found.
    ///
    /// `Ok(None)` means no row exists; the caller decides whether that is
    /// expected (mid sign-up) or an integrity problem (sign-in).
    ///
    /// # Errors
    ///
    /// `ResolutionTimeout` if the store does not answer in time, or the
    /// store's own failure.
    pub async fn resolve_profile(&self, identity_id: Uuid) -> Result<Option<UserProfile>, SyncError> {
        self.guarded(self.resolve_profile_inner(identity_id)).await
    }

    /// Create an account and its profile, then publish the profile.
    ///
    /// When the provider issues no session (email confirmation pending) the
    /// created profile is returned but not published, and no navigation
    /// happens.
    ///
    /// # Errors
    ///
    /// `InvalidEmail`, `DuplicateIdentity`, `ProfileMissing`,
    /// `ResolutionTimeout`, or an opaque provider/store failure. On any
    /// error the provider session is signed out and the user cleared.
    /// `SessionChanged` if a different session took over mid-operation; the
    /// user then follows that session.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserProfile, SyncError> {
        self.guarded(async {
            info!("sign-up started");
            self.set_loading(true);
            let result = self.sign_up_inner(email, password, first_name, last_name).await;
            self.settle_authentication("sign-up", result, true).await
        })
        .await
    }

    /// Authenticate and publish the existing profile.
    ///
    /// # Errors
    ///
    /// `ProfileMissing` if the account has no profile row; otherwise as for
    /// [`Synchronizer::sign_up`]. On any error the session is rolled back.
    /// `SessionChanged` if the session ended or changed identity before the
    /// profile was resolved.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, SyncError> {
        self.guarded(async {
            info!("sign-in started");
            self.set_loading(true);
            let result = self.sign_in_inner(email, password).await;
            self.settle_authentication("sign-in", result, false).await
        })
        .await
    }

    /// End the session. Local state is cleared even if the provider call
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after the user has been cleared.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        self.guarded(self.sign_out_inner()).await
    }

    /// Change the current user's display attributes.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a current user, `ResolutionTimeout`, or
    /// the store failure.
    pub async fn update_profile(&self, changes: ProfileUpdate) -> Result<UserProfile, SyncError> {
        self.guarded(self.update_profile_inner(changes)).await
    }

    // -------------------------------------------------------------------------
    // operation bodies
    // -------------------------------------------------------------------------

    /// Run `op` under the in-flight guard, then replay any session event
    /// that was skipped while the guard was held.
    async fn guarded<T>(&self, op: impl Future<Output = T>) -> T {
        let guard = self.in_flight.lock().await;
        let out = op.await;
        drop(guard);
        if self.pending_reconcile.load(Ordering::SeqCst) {
            self.handle_session_event("deferred").await;
        }
        out
    }

    async fn restore_session(&self) {
        self.set_loading(true);
        match self.bounded(self.reconcile()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, code = e.error_code(), "session restore failed; continuing signed out");
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "session restore timed out; continuing signed out");
                self.set_user(None);
            }
        }
        self.set_loading(false);
    }

    async fn resolve_profile_inner(&self, identity_id: Uuid) -> Result<Option<UserProfile>, SyncError> {
        let profile = self.fetch_profile(identity_id).await?;
        if let Some(profile) = &profile {
            self.set_user(Some(profile.clone()));
        }
        Ok(profile)
    }

    async fn sign_out_inner(&self) -> Result<(), SyncError> {
        let result = self.provider.sign_out().await;
        self.publish(None, false);

        match result {
            Ok(()) => {
                info!("signed out");
                self.navigator.navigate(HOME_PATH);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "provider sign-out failed; local state cleared");
                Err(e.into())
            }
        }
    }

    async fn update_profile_inner(&self, changes: ProfileUpdate) -> Result<UserProfile, SyncError> {
        let current = self.current_user().ok_or(SyncError::NotAuthenticated)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let updated = self.bounded(self.store.update(current.id, &changes)).await??;
        info!(user_id = %updated.id, "profile updated");
        self.set_user(Some(updated.clone()));
        Ok(updated)
    }

    async fn sign_up_inner(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserProfile, SyncError> {
        let email = normalize_email(email).ok_or(SyncError::InvalidEmail)?;
        let identity = self.provider.sign_up(&email, password).await?;
        info!(user_id = %identity.id, "account created; creating profile");

        let new_profile = NewProfile {
            id: identity.id,
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
        };

        match self.bounded(self.store.insert(&new_profile)).await? {
            Ok(profile) => Ok(profile),
            Err(StoreError::UniqueViolation) => {
                info!(user_id = %identity.id, "profile already exists; resolving existing row");
                self.fetch_profile(identity.id)
                    .await?
                    .ok_or(SyncError::ProfileMissing(identity.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn sign_in_inner(&self, email: &str, password: &str) -> Result<UserProfile, SyncError> {
        let email = normalize_email(email).ok_or(SyncError::InvalidEmail)?;
        let identity = self.provider.sign_in_with_password(&email, password).await?;
        self.fetch_profile(identity.id)
            .await?
            .ok_or(SyncError::ProfileMissing(identity.id))
    }

    /// Publish a successful authentication or roll the session back.
    ///
    /// The profile is published only while the provider still holds a
    /// session for it. With `allow_unconfirmed`, a missing session returns
    /// the profile unpublished.
    async fn settle_authentication(
        &self,
        operation: &'static str,
        result: Result<UserProfile, SyncError>,
        allow_unconfirmed: bool,
    ) -> Result<UserProfile, SyncError> {
        let profile = match result {
            Ok(profile) => profile,
            Err(e) => return Err(self.roll_back(operation, e).await),
        };
        let session = match self.current_session().await {
            Ok(session) => session,
            Err(e) => return Err(self.roll_back(operation, e).await),
        };

        match session.map(|s| s.identity.id) {
            Some(id) if id == profile.id => {
                info!(user_id = %profile.id, operation, "authenticated");
                self.publish(Some(profile.clone()), false);
                self.navigator.navigate(DASHBOARD_PATH);
                Ok(profile)
            }
            None if allow_unconfirmed => {
                info!(user_id = %profile.id, operation, "no session issued; awaiting email confirmation");
                self.publish(None, false);
                Ok(profile)
            }
            other => {
                warn!(user_id = %profile.id, session_id = ?other, operation, "session changed mid-operation; following provider");
                if let Err(e) = self.reconcile().await {
                    warn!(error = %e, code = e.error_code(), operation, "session reconciliation failed");
                }
                self.set_loading(false);
                Err(SyncError::SessionChanged)
            }
        }
    }

    async fn roll_back(&self, operation: &'static str, e: SyncError) -> SyncError {
        warn!(error = %e, code = e.error_code(), operation, "authentication failed; rolling back session");
        if let Err(sign_out_err) = self.provider.sign_out().await {
            error!(error = %sign_out_err, operation, "rollback sign-out failed");
        }
        self.publish(None, false);
        e
    }

    /// Make the user match the provider's current session. Caller holds
    /// the in-flight guard.
    async fn reconcile(&self) -> Result<(), SyncError> {
        let session = self.current_session().await?;
        let Some(session) = session else {
            self.set_user(None);
            return Ok(());
        };

        let identity_id = session.identity.id;
        if self.current_user().is_some_and(|u| u.id == identity_id) {
            debug!(user_id = %identity_id, "session already reconciled");
            return Ok(());
        }

        self.set_loading(true);
        match self.fetch_profile(identity_id).await {
            Ok(Some(profile)) => {
                info!(user_id = %identity_id, "session profile resolved");
                self.set_user(Some(profile));
                Ok(())
            }
            Ok(None) => {
                self.set_user(None);
                Err(SyncError::ProfileMissing(identity_id))
            }
            Err(e) => {
                // Whatever was held belongs to a different identity.
                self.set_user(None);
                Err(e)
            }
        }
    }

    /// Reconcile once for this event and any that arrive meanwhile. Raises
    /// the pending flag before trying the guard so the current holder always
    /// sees it on release.
    async fn handle_session_event(&self, trigger: &'static str) {
        self.pending_reconcile.store(true, Ordering::SeqCst);
        loop {
            let Ok(guard) = self.in_flight.try_lock() else {
                debug!(trigger, "guard held; reconciliation deferred");
                return;
            };
            if !self.pending_reconcile.swap(false, Ordering::SeqCst) {
                return;
            }
            debug!(trigger, "reconciling after session event");
            if let Err(e) = self.reconcile().await {
                warn!(error = %e, code = e.error_code(), trigger, "session reconciliation failed");
            }
            self.set_loading(false);
            drop(guard);
            if !self.pending_reconcile.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    async fn current_session(&self) -> Result<Option<Session>, SyncError> {
        self.bounded(self.provider.current_session())
            .await?
            .map_err(SyncError::from)
    }

    async fn fetch_profile(&self, identity_id: Uuid) -> Result<Option<UserProfile>, SyncError> {
        self.bounded(self.store.select_by_id(identity_id))
            .await?
            .map_err(SyncError::from)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = T>) -> Result<T, SyncError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| SyncError::ResolutionTimeout(self.timeout))
    }

    // -------------------------------------------------------------------------
    // state cell
    // -------------------------------------------------------------------------

    fn publish(&self, user: Option<UserProfile>, loading: bool) {
        self.state.send_if_modified(|s| {
            let next = AuthState { user, loading };
            if *s == next {
                return false;
            }
            *s = next;
            true
        });
    }

    fn set_user(&self, user: Option<UserProfile>) {
        let loading = self.is_loading();
        self.publish(user, loading);
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.loading != loading;
            s.loading = loading;
            changed
        });
    }
}

/// Spawn the background task that reacts to provider session events.
/// Holds only a weak reference so the synchronizer can be dropped.
fn spawn_session_watcher(sync: Weak<Synchronizer>, mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let trigger = match events.recv().await {
                Ok(event) => event.name(),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session events lagged; reconciling from current session");
                    "lagged"
                }
                Err(RecvError::Closed) => break,
            };
            let Some(sync) = sync.upgrade() else {
                break;
            };
            sync.handle_session_event(trigger).await;
        }
        debug!("session watcher stopped");
    })
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
