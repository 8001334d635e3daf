//! Navigation targets and the router seam.

use tracing::info;

/// Landing view shown after sign-out.
pub const HOME_PATH: &str = "/";
/// Signed-in landing view.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Router collaborator invoked after successful auth transitions.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless hosts; records the transition in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        info!(%path, "navigate");
    }
}
