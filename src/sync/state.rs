//! Reactive auth state published by the synchronizer.

use crate::profile::UserProfile;

/// Snapshot of the current user and whether a synchronization step is
/// outstanding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub loading: bool,
}

impl AuthState {
    /// State before the first reconciliation has run.
    #[must_use]
    pub fn initial() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// True once loading has settled with nobody signed in. Route guards
    /// redirect to the login view on this condition.
    #[must_use]
    pub fn needs_login(&self) -> bool {
        !self.loading && self.user.is_none()
    }
}
