//! Application state.

use amzn_core::Connector;
use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionManager;

/// Shared application state handed to the MCP server
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// The single Amazon session
    pub session: Arc<SessionManager>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, connector: Arc<dyn Connector>) -> Arc<Self> {
        let session = SessionManager::new(connector, config.credentials());
        Arc::new(Self {
            config: Arc::new(config),
            session: Arc::new(session),
        })
    }
}
