// libs/staff-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::time::local_day_bounds;

use crate::models::{CrearAusenciaRequest, EstadoAusencia, StaffError};
use crate::services::AbsenceService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListarAusenciasParams {
    pub empleado_id: Option<Uuid>,
    pub estado: Option<EstadoAusencia>,
    /// Local calendar dates, `YYYY-MM-DD`, both inclusive.
    pub desde: Option<String>,
    pub hasta: Option<String>,
}

fn parse_fecha_local(valor: &str, campo: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(valor, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("{} debe tener formato YYYY-MM-DD", campo)))
}

fn is_staff(user: &User) -> bool {
    matches!(user.role.as_deref(), Some("empleado") | Some("admin"))
}

fn map_staff_error(e: StaffError) -> AppError {
    match e {
        StaffError::EmpleadoNotFound => AppError::NotFound("Empleado no encontrado".to_string()),
        StaffError::AusenciaNotFound => AppError::NotFound("Ausencia no encontrada".to_string()),
        StaffError::InvalidRange(msg) => AppError::BadRequest(msg),
        StaffError::InvalidTransition(estado) => AppError::BadRequest(format!(
            "La ausencia no admite esa operación en estado {}",
            estado
        )),
        StaffError::Database(msg) => AppError::Internal(msg),
    }
}

#[axum::debug_handler]
pub async fn crear_ausencia(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CrearAusenciaRequest>,
) -> Result<Json<Value>, AppError> {
    if !is_staff(&user) {
        return Err(AppError::Auth(
            "Solo el personal puede registrar ausencias".to_string(),
        ));
    }

    let service = AbsenceService::new(&state);
    let ausencia = service
        .crear(request, auth.token())
        .await
        .map_err(map_staff_error)?;

    Ok(Json(json!({
        "success": true,
        "ausencia": ausencia,
        "message": "Ausencia registrada, pendiente de aprobación"
    })))
}

#[axum::debug_handler]
pub async fn listar_ausencias(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<ListarAusenciasParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !is_staff(&user) {
        return Err(AppError::Auth(
            "Solo el personal puede consultar ausencias".to_string(),
        ));
    }

    // Day-granular range: desde opens at local midnight, hasta closes at the
    // end of its local day, so a single-day query is desde == hasta
    let desde = params
        .desde
        .as_deref()
        .map(|v| parse_fecha_local(v, "desde"))
        .transpose()?
        .map(|d| local_day_bounds(d).0);
    let hasta = params
        .hasta
        .as_deref()
        .map(|v| parse_fecha_local(v, "hasta"))
        .transpose()?
        .map(|d| local_day_bounds(d).1);
    if let (Some(desde), Some(hasta)) = (desde, hasta) {
        if hasta <= desde {
            return Err(AppError::ValidationError(
                "hasta debe ser igual o posterior a desde".to_string(),
            ));
        }
    }

    let service = AbsenceService::new(&state);
    let ausencias = service
        .listar(params.empleado_id, params.estado, desde, hasta, auth.token())
        .await
        .map_err(map_staff_error)?;

    Ok(Json(json!({
        "success": true,
        "total": ausencias.len(),
        "ausencias": ausencias
    })))
}

#[axum::debug_handler]
pub async fn aprobar_ausencia(
    State(state): State<Arc<AppConfig>>,
    Path(ausencia_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if user.role.as_deref() != Some("admin") {
        return Err(AppError::Auth(
            "Solo un administrador puede aprobar ausencias".to_string(),
        ));
    }

    let service = AbsenceService::new(&state);
    let ausencia = service
        .aprobar(ausencia_id, auth.token())
        .await
        .map_err(map_staff_error)?;

    Ok(Json(json!({
        "success": true,
        "ausencia": ausencia,
        "message": "Ausencia aprobada"
    })))
}

#[axum::debug_handler]
pub async fn cancelar_ausencia(
    State(state): State<Arc<AppConfig>>,
    Path(ausencia_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !is_staff(&user) {
        return Err(AppError::Auth(
            "Solo el personal puede cancelar ausencias".to_string(),
        ));
    }

    let service = AbsenceService::new(&state);
    let ausencia = service
        .cancelar(ausencia_id, auth.token())
        .await
        .map_err(map_staff_error)?;

    Ok(Json(json!({
        "success": true,
        "ausencia": ausencia,
        "message": "Ausencia cancelada"
    })))
}
