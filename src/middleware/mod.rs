mod auth;
mod lifecycle;

pub use auth::{require_admin, require_user, CurrentAdmin, CurrentUser};
pub use lifecycle::{require_ready, AppLifecycle, LifecycleState};
