// Startup readiness, consulted before any /api request is dispatched
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Ready,
    Failed,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecycleState::Ready,
            2 => LifecycleState::Failed,
            _ => LifecycleState::Starting,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LifecycleState::Starting => 0,
            LifecycleState::Ready => 1,
            LifecycleState::Failed => 2,
        }
    }
}

/// Shared handle on the application's startup state. Clones observe the same value.
#[derive(Debug, Clone)]
pub struct AppLifecycle {
    state: Arc<AtomicU8>,
}

impl AppLifecycle {
    pub fn starting() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LifecycleState::Starting.as_u8())),
        }
    }

    pub fn ready() -> Self {
        let lifecycle = Self::starting();
        lifecycle.mark_ready();
        lifecycle
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn mark_ready(&self) {
        self.state.store(LifecycleState::Ready.as_u8(), Ordering::Release);
    }

    pub fn mark_failed(&self) {
        self.state.store(LifecycleState::Failed.as_u8(), Ordering::Release);
    }
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::starting()
    }
}

pub async fn require_ready(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.lifecycle.state() {
        LifecycleState::Ready => Ok(next.run(request).await),
        LifecycleState::Starting => Err(AppError::ServiceUnavailable("Service starting".to_string())),
        LifecycleState::Failed => Err(AppError::ServiceUnavailable("Database unavailable".to_string())),
    }
}
