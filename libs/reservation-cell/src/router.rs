// libs/reservation-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn reservation_routes(state: Arc<AppConfig>) -> Router {
    // Browsing stays open; anything that touches a cita needs a session
    let public_routes = Router::new()
        .route("/servicios", get(handlers::listar_servicios))
        .route("/empleados", get(handlers::listar_empleados))
        .route("/horarios", get(handlers::listar_horarios));

    let protected_routes = Router::new()
        .route("/procesar", post(handlers::procesar_reserva))
        .route("/mis-citas", get(handlers::mis_citas))
        .route("/cancelar/{cita_id}", put(handlers::cancelar_cita))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
