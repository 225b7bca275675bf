use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all endpoints.
///
/// Workspaces live under `/s/`; `/health/dump/` lists every stored record.
///
/// State routes accept any method; `LOCK` and `UNLOCK` are not standard
/// verbs, so method filtering happens in the handler. The bare prefixes
/// without a trailing slash redirect to it.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_size;
    Router::new()
        .route("/s", any(handler::trailing_slash_redirect))
        .route("/s/", any(handler::state_handler))
        .route("/s/*workspace", any(handler::state_handler))
        .route("/health/dump", any(handler::trailing_slash_redirect))
        .route("/health/dump/", get(handler::dump_handler))
        .route("/health/dump/*rest", get(handler::dump_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
