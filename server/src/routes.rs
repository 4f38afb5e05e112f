//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/storage/trash",
            get(handlers::list_trash)
                .post(handlers::trash_item)
                .delete(handlers::delete_trash),
        )
        .route("/storage/restore", post(handlers::restore_trash))
        .route("/storage/audit", get(handlers::list_audit))
        .route("/books/{id}/upload", post(handlers::upload_book))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        // Unauthenticated for load balancer probes
        .route("/health", get(handlers::health_check))
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
