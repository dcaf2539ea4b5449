use std::sync::Arc;

use crate::config::Config;
use crate::import::registry::SessionRegistry;
use crate::llm_client::TextGenerator;
use crate::profile::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Section parser backend. Default: `LlmClient`.
    pub llm: Arc<dyn TextGenerator>,
    /// Where confirmed imports are persisted. PostgreSQL, or in-memory without `DATABASE_URL`.
    pub profiles: Arc<dyn ProfileStore>,
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
}
