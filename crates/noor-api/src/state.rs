use std::sync::Arc;

use axum::http::StatusCode;
use tracing::error;

use noor_db::Database;
use noor_gateway::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub settings: Settings,
}

/// Runtime knobs the handlers need; filled from the server configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer key required by `POST /api/host/generate-token`.
    pub admin_key: String,
    /// Lifetime of new sessions and tokens.
    pub token_ttl_hours: i64,
}

impl AppStateInner {
    pub fn new(db: Database, dispatcher: Dispatcher, settings: Settings) -> AppState {
        Arc::new(Self {
            db,
            dispatcher,
            settings,
        })
    }
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .map_err(ApiError::from)
}
