// libs/reservation-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use catalog_cell::models::ServicioOrden;
use catalog_cell::services::CatalogService;
use chrono::NaiveDate;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::{AppError, CONFLICTO_AUSENCIA, CONFLICTO_CITA};
use shared_utils::time::{local_to_utc, minutes_from_midnight};
use staff_cell::models::{EmpleadoPublico, StaffError};
use staff_cell::services::EmployeeService;

use crate::models::{
    BookingError, CancelarCitaRequest, CitaOrden, EmpleadosQuery, HorarioDisponible,
    HorariosQuery, MisCitasQuery, ProcesarReservaRequest, ServicioReservacion, ServiciosQuery,
};
use crate::services::{AvailabilityService, BookingService};

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::CitaNotFound => AppError::NotFound("Cita no encontrada".to_string()),
        BookingError::EmpleadoNotFound => AppError::NotFound("Empleado no encontrado".to_string()),
        BookingError::ServicioInvalido(id) => {
            AppError::NotFound(format!("Servicio {} no disponible", id))
        }
        BookingError::Validation(msg) => AppError::ValidationError(msg),
        BookingError::Solapamiento => AppError::Conflict {
            codigo: CONFLICTO_CITA,
            message: "El horario seleccionado ya no está disponible".to_string(),
        },
        BookingError::EmpleadoAusente => AppError::Conflict {
            codigo: CONFLICTO_AUSENCIA,
            message: "El empleado no está disponible en esa fecha".to_string(),
        },
        BookingError::TransicionInvalida(estado) => AppError::BadRequest(format!(
            "La cita no admite esa operación en estado {}",
            estado
        )),
        BookingError::NoAutorizado(msg) => AppError::Auth(msg),
        BookingError::Database(msg) => AppError::Database(msg),
    }
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

fn parse_fecha(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError("fecha inválida, se espera YYYY-MM-DD".to_string()))
}

fn parse_hora(raw: &str) -> Result<i32, AppError> {
    minutes_from_midnight(raw)
        .ok_or_else(|| AppError::ValidationError(format!("hora inválida: {}", raw)))
}

/// Public catalog listing used by the booking screen. `orden` must name one
/// of the allow-listed sorts; anything else is rejected before any query.
#[axum::debug_handler]
pub async fn listar_servicios(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<ServiciosQuery>,
) -> Result<Json<Value>, AppError> {
    let orden = match params.orden.as_deref() {
        Some(valor) => ServicioOrden::parse(valor)
            .ok_or_else(|| AppError::ValidationError(format!("orden inválido: {}", valor)))?,
        None => ServicioOrden::default(),
    };

    let service = CatalogService::new(&state);
    let catalogo = service
        .servicios_catalogo(orden, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let servicios: Vec<ServicioReservacion> =
        catalogo.into_iter().map(ServicioReservacion::from).collect();

    Ok(Json(json!({
        "success": true,
        "servicios": servicios
    })))
}

/// Employees free of citas and ausencias in the requested local window.
#[axum::debug_handler]
pub async fn listar_empleados(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<EmpleadosQuery>,
) -> Result<Json<Value>, AppError> {
    let fecha = parse_fecha(&params.fecha)?;
    let desde = parse_hora(&params.hora_inicio)?;
    let hasta = parse_hora(&params.hora_fin)?;
    if hasta <= desde {
        return Err(AppError::ValidationError(
            "hora_fin debe ser posterior a hora_inicio".to_string(),
        ));
    }

    let inicio = local_to_utc(fecha, desde);
    let fin = local_to_utc(fecha, hasta);

    let service = EmployeeService::new(&state);
    let disponibles = service
        .disponibles_en_ventana(inicio, fin, None)
        .await
        .map_err(map_staff_error)?;
    let empleados: Vec<EmpleadoPublico> =
        disponibles.iter().map(EmpleadoPublico::from).collect();

    Ok(Json(json!({
        "success": true,
        "empleados": empleados
    })))
}

/// Free slots of one employee on one date. The `servicios` parameter is
/// validated but does not change the slot filter.
#[axum::debug_handler]
pub async fn listar_horarios(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<HorariosQuery>,
) -> Result<Json<Value>, AppError> {
    let fecha = parse_fecha(&params.fecha)?;
    if let Some(raw) = params.servicios.as_deref() {
        for trozo in raw.split(',').filter(|t| !t.trim().is_empty()) {
            trozo.trim().parse::<i64>().map_err(|_| {
                AppError::ValidationError(format!("servicio inválido: {}", trozo))
            })?;
        }
    }

    let empleados = EmployeeService::new(&state);
    let empleado = empleados
        .get_empleado(params.empleado_id, None)
        .await
        .map_err(map_staff_error)?;
    if !empleado.activo {
        return Err(AppError::NotFound("Empleado no encontrado".to_string()));
    }

    let service = AvailabilityService::new(&state);
    let dia = service
        .disponibilidad_dia(params.empleado_id, fecha, None)
        .await
        .map_err(map_booking_error)?;
    let horarios: Vec<HorarioDisponible> =
        dia.horarios.into_iter().map(HorarioDisponible::from).collect();

    Ok(Json(json!({
        "success": true,
        "horarios": horarios,
        "empleadoAusente": dia.empleado_ausente
    })))
}

#[axum::debug_handler]
pub async fn procesar_reserva(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ProcesarReservaRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let reserva = service
        .procesar_reserva(&user, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "data": reserva,
        "message": "Reserva confirmada"
    })))
}

#[axum::debug_handler]
pub async fn mis_citas(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<MisCitasQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let orden = match params.orden.as_deref() {
        Some(valor) => CitaOrden::parse(valor)
            .ok_or_else(|| AppError::ValidationError(format!("orden inválido: {}", valor)))?,
        None => CitaOrden::default(),
    };

    let service = BookingService::new(&state);
    let citas = service
        .mis_citas(&user, orden, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "total": citas.len(),
        "citas": citas
    })))
}

#[axum::debug_handler]
pub async fn cancelar_cita(
    State(state): State<Arc<AppConfig>>,
    Path(cita_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelarCitaRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let cita = service
        .cancelar_cita(&user, cita_id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "cita": cita,
        "message": "Cita cancelada"
    })))
}
