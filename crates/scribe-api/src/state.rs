use std::sync::Arc;

use scribe_db::{Database, Scoped};
use scribe_types::Identity;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self { db })
    }
}

/// Run store work scoped to `identity` off the async runtime.
pub(crate) async fn with_scoped<F, T>(state: &AppState, identity: Identity, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Scoped<'_>) -> scribe_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db.scoped(identity)))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

/// Path ids are plain integers.
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid ID: {raw:?}")))
}
