//! Shared handler state

use std::sync::Arc;

use roomctl_hardware::ModuleManager;

use crate::feed::HealthFeed;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ModuleManager>,
    pub feed: HealthFeed,
}

impl AppState {
    pub fn new(manager: Arc<ModuleManager>, feed: HealthFeed) -> Self {
        Self { manager, feed }
    }
}
