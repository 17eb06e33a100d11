use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use reservation_cell::router::reservation_routes;
use shared_config::AppConfig;
use staff_cell::router::staff_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Salon Reservas API is running!" }))
        .route(
            "/health",
            get(|| async { Json(json!({ "status": "ok" })) }),
        )
        .nest("/reservacion", reservation_routes(state.clone()))
        .nest("/ausencias", staff_routes(state))
}
