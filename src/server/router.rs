//! Route table for the thin ops surface.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Builds the full router: one `Router::new()` with every route mounted, `with_state` applied
/// once, tracing as the outermost layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/kb/{kb_id}/documents", post(handlers::upload_document))
        .route("/kb/{kb_id}/documents/text", post(handlers::push_document))
        .route("/documents/reprocess", post(handlers::reprocess_documents))
        .route("/documents/{document_id}", delete(handlers::delete_document))
        .route("/kb/{kb_id}/search", post(handlers::search))
        .route("/kb/{kb_id}/cache/clear", post(handlers::clear_kb_cache))
        .route("/kb/{kb_id}/rebuild", post(handlers::rebuild_kb))
        .route("/pending/process", post(handlers::process_pending))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
