use std::sync::Arc;

use crate::actions::{Actions, ContactStore};
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Finished action handlers.
    pub actions: Arc<Actions>,
}

impl AppState {
    /// Build the store and every action handler from `config`.
    pub fn new(config: ServerConfig) -> Self {
        let contacts = Arc::new(ContactStore::new(config.contact_capacity));
        let actions = Actions::new(config.action_config(), contacts);
        Self {
            config: Arc::new(config),
            actions: Arc::new(actions),
        }
    }
}
