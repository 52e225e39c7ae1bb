//! Server state

use std::sync::Arc;

use crate::config::Settings;
use crate::jobs::JobRegistry;

/// Server state shared across handlers
pub struct ServerState {
    pub settings: Arc<Settings>,
    pub registry: Arc<JobRegistry>,
}

impl ServerState {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            registry: Arc::new(JobRegistry::new()),
        }
    }
}
