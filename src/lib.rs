pub mod auth;
pub mod config;
pub mod contact_log;
pub mod error;
pub mod mail;
pub mod rest;
pub mod store;

use std::sync::Arc;

use auth::TokenRegistry;
use config::DaemonConfig;
use contact_log::ContactLog;
use store::ProjectStore;

/// Shared application state passed to every route handler and background
/// task.
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    /// File-backed project catalog.
    pub store: ProjectStore,
    /// In-memory session token registry. The single owner of the token map;
    /// all mutation goes through `issue` / `validate` / `sweep`.
    pub tokens: TokenRegistry,
    /// Append-only record of contact submission attempts.
    pub contact_log: ContactLog,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Wire the context up from resolved configuration.
    pub fn new(config: DaemonConfig) -> Self {
        let store = ProjectStore::new(config.projects_path());
        let tokens = TokenRegistry::new(config.token_ttl_minutes);
        let contact_log = ContactLog::new(config.contact_log_path());
        Self {
            config: Arc::new(config),
            store,
            tokens,
            contact_log,
            started_at: std::time::Instant::now(),
        }
    }
}
