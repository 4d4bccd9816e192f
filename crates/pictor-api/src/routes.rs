//! Route table.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{assets, assignments, onedrive, strategies, upload};
use crate::state::SharedState;

/// Multipart framing overhead on top of the configured upload ceiling.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

pub fn build_router(state: SharedState) -> Router {
    let uploads_dir = ServeDir::new(&state.config.local_storage_path);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/upload", post(upload::upload))
        .route("/api/assets", get(assets::list_assets))
        .route("/api/assets/{id}", delete(assets::delete_asset))
        .route("/api/usage", get(assets::usage_report))
        .route("/s/{share_id}", get(assets::resolve_share))
        .route(
            "/api/admin/strategies",
            post(strategies::create_strategy).get(strategies::list_strategies),
        )
        .route(
            "/api/admin/strategies/{id}",
            put(strategies::update_strategy).delete(strategies::delete_strategy),
        )
        .route(
            "/api/admin/strategies/{id}/config",
            put(strategies::update_strategy_config),
        )
        .route(
            "/api/admin/strategies/{id}/default",
            post(strategies::set_default_strategy),
        )
        .route(
            "/api/admin/strategies/{id}/onedrive/exchange",
            post(onedrive::exchange_onedrive_code),
        )
        .route(
            "/api/admin/assignments",
            post(assignments::grant_assignment),
        )
        .route(
            "/api/admin/assignments/{tenant_id}",
            get(assignments::list_assignments),
        )
        .route(
            "/api/admin/assignments/{tenant_id}/{strategy_id}",
            delete(assignments::revoke_assignment),
        )
        .route(
            "/api/admin/assignments/{tenant_id}/{strategy_id}/quota",
            put(assignments::set_assignment_quota),
        )
        .route(
            "/api/admin/assignments/{tenant_id}/{strategy_id}/default",
            post(assignments::set_default_assignment),
        )
        .nest_service("/uploads", uploads_dir)
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_bytes + BODY_LIMIT_SLACK,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
