use crate::config::Config;
use crate::db::Database;
use crate::fetch::ImageFetcher;
use std::sync::Arc;

/// Shared per-process state. Exports themselves are request-scoped; nothing
/// here holds per-request buffers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub fetcher: ImageFetcher,
}

impl AppState {
    pub fn new(config: Config, db: Database, fetcher: ImageFetcher) -> Self {
        Self {
            config: Arc::new(config),
            db,
            fetcher,
        }
    }
}
