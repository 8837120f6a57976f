//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Audit logger → 3. Auth validator (protected routes only)

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Audit → Auth (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/me", get(endpoints::auth::me))
        .route("/auth/logout", post(endpoints::auth::logout))
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/available-slots",
            get(endpoints::appointments::available_slots),
        )
        .route(
            "/appointments/patient/:identifier",
            get(endpoints::appointments::by_patient),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail).delete(endpoints::appointments::delete),
        )
        .route(
            "/inventory",
            get(endpoints::inventory::list).post(endpoints::inventory::create),
        )
        .route(
            "/inventory/:id",
            get(endpoints::inventory::detail)
                .put(endpoints::inventory::update)
                .delete(endpoints::inventory::delete),
        )
        .route(
            "/medical-records",
            get(endpoints::medical_records::list).post(endpoints::medical_records::create),
        )
        .route(
            "/medical-records/search/:name",
            get(endpoints::medical_records::search),
        )
        .route(
            "/medical-records/:id",
            get(endpoints::medical_records::detail)
                .put(endpoints::medical_records::update)
                .delete(endpoints::medical_records::delete),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes (audited, no auth required)
    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected.merge(unprotected))
        .layer(CorsLayer::permissive())
}
