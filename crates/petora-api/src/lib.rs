pub mod convert;
pub mod error;
pub mod groups;
pub mod listings;
pub mod messages;
pub mod posts;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tracing::error;

use petora_db::Database;

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

/// All routes, without transport layers (CORS, tracing) so tests can
/// drive it directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/{id}", get(groups::get_group))
        .route("/groups/{id}/join", put(groups::join_group))
        .route("/groups/{id}/messages", post(messages::send_message))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post).put(posts::update_post))
        .route("/pets", post(listings::create_listing))
        .route("/pets/{id}", get(listings::get_listing))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let out = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::Error::from(e)
        })??;
    Ok(out)
}
