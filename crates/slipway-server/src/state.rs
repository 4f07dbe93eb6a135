use slipway_core::intake::Intake;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<Intake>,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(intake: Arc<Intake>, api_key: &str) -> Self {
        Self {
            intake,
            api_key: Arc::from(api_key),
        }
    }
}
