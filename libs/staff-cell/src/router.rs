// libs/staff-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn staff_routes(state: Arc<AppConfig>) -> Router {
    // Absence management is staff-only, so every route sits behind auth
    let protected_routes = Router::new()
        .route(
            "/",
            post(handlers::crear_ausencia).get(handlers::listar_ausencias),
        )
        .route("/{ausencia_id}/aprobar", put(handlers::aprobar_ausencia))
        .route("/{ausencia_id}/cancelar", put(handlers::cancelar_ausencia))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
