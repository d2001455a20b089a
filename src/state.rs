//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::chat::{ChatOrchestrator, CompletionSource, IdentityResolver, SemanticIndex};
use crate::config::Config;

/// Shared application state
///
/// Port objects are constructed once at startup and injected here;
/// nothing in the request path owns its own upstream client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    identity: Arc<dyn IdentityResolver>,
    orchestrator: ChatOrchestrator,
}

impl AppState {
    pub fn new(
        config: Config,
        db: SqlitePool,
        identity: Arc<dyn IdentityResolver>,
        index: Arc<dyn SemanticIndex>,
        completion: Arc<dyn CompletionSource>,
    ) -> Self {
        let orchestrator =
            ChatOrchestrator::new(db.clone(), identity.clone(), index, completion);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                identity,
                orchestrator,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the identity resolver
    pub fn identity(&self) -> &Arc<dyn IdentityResolver> {
        &self.inner.identity
    }

    /// Get the chat orchestrator
    pub fn orchestrator(&self) -> &ChatOrchestrator {
        &self.inner.orchestrator
    }
}
