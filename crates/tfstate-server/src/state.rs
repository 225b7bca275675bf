//! Application state shared across handlers.

use std::sync::Arc;

use tfstate_store::StateStore;

use crate::config::ServerConfig;
use crate::dispatch::LockDispatcher;

/// Everything a handler needs: the dispatcher (which owns the store) and
/// the configuration the server was started with.
#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: LockDispatcher,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            dispatcher: LockDispatcher::new(store),
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        self.dispatcher.store()
    }
}
