//! Shared handler state

use std::sync::Arc;

use arcade_supervisor::Supervisor;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }
}
