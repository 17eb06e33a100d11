// libs/reservation-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

/// Appointment lifecycle. Serialized lowercase to match the `estado` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EstadoCita {
    Pendiente,
    Confirmada,
    Completada,
    Cancelada,
    NoAsistio,
}

/// PostgREST `not.in` list of the states that release an employee's window.
/// Every availability and conflict query filters with this, so the three
/// lists (here, the exclusion constraint, the RPC) agree by construction.
pub const ESTADOS_LIBERADOS: &str = "cancelada,no_asistio";

impl EstadoCita {
    /// Whether a cita in this state still occupies its `[inicio, fin)`
    /// window on the employee's agenda.
    pub fn bloquea_agenda(&self) -> bool {
        !matches!(self, EstadoCita::Cancelada | EstadoCita::NoAsistio)
    }

    /// Terminal states admit no further transition.
    pub fn es_terminal(&self) -> bool {
        matches!(
            self,
            EstadoCita::Completada | EstadoCita::Cancelada | EstadoCita::NoAsistio
        )
    }
}

impl fmt::Display for EstadoCita {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstadoCita::Pendiente => write!(f, "pendiente"),
            EstadoCita::Confirmada => write!(f, "confirmada"),
            EstadoCita::Completada => write!(f, "completada"),
            EstadoCita::Cancelada => write!(f, "cancelada"),
            EstadoCita::NoAsistio => write!(f, "no_asistio"),
        }
    }
}

/// Who asked for a cancellation. Stored in `cancelada_por`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CanceladaPor {
    Cliente,
    Empleado,
    Admin,
}

impl fmt::Display for CanceladaPor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanceladaPor::Cliente => write!(f, "cliente"),
            CanceladaPor::Empleado => write!(f, "empleado"),
            CanceladaPor::Admin => write!(f, "admin"),
        }
    }
}

/// Appointment, as stored in `citas`. Timestamps are UTC; the wall-clock
/// times shown to clients come from projecting these through the business
/// offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cita {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub empleado_id: Uuid,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: DateTime<Utc>,
    pub estado: EstadoCita,
    pub total: f64,
    pub notas: Option<String>,
    pub cancelada_por: Option<CanceladaPor>,
    pub motivo_cancelacion: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Line item of a cita. `precio_unitario`, `descuento_aplicado` and
/// `duracion_minutos` are snapshots taken at booking time; later catalog
/// edits never touch them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitaServicio {
    pub id: i64,
    pub cita_id: Uuid,
    pub servicio_id: i64,
    pub cantidad: i32,
    pub precio_unitario: f64,
    pub descuento_aplicado: f64,
    pub duracion_minutos: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EstadoPago {
    Pendiente,
    Pagado,
    Reembolsado,
}

/// Payment record, one per cita, created inside the booking transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pago {
    pub id: Uuid,
    pub cita_id: Uuid,
    pub monto: f64,
    pub metodo: Option<String>,
    pub estado: EstadoPago,
    pub created_at: DateTime<Utc>,
}

/// Insert-only notification events, written best effort after commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TipoNotificacion {
    CitaCreada,
    CitaCancelada,
}

impl fmt::Display for TipoNotificacion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TipoNotificacion::CitaCreada => write!(f, "cita_creada"),
            TipoNotificacion::CitaCancelada => write!(f, "cita_cancelada"),
        }
    }
}

// ==============================================================================
// SLOTS & AVAILABILITY
// ==============================================================================

/// Bookable window expressed as minutes from local midnight, half-open.
/// Never persisted; templates and availability responses are built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start_min: i32,
    pub end_min: i32,
}

impl Slot {
    pub const fn new(start_min: i32, end_min: i32) -> Self {
        Self { start_min, end_min }
    }
}

/// Wire shape of a free slot: `{"inicio": "09:15", "fin": "09:45"}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HorarioDisponible {
    pub inicio: String,
    pub fin: String,
}

impl From<Slot> for HorarioDisponible {
    fn from(slot: Slot) -> Self {
        Self {
            inicio: shared_utils::time::format_minutes(slot.start_min),
            fin: shared_utils::time::format_minutes(slot.end_min),
        }
    }
}

/// Result of filtering one employee's day. `empleado_ausente` is set only
/// when approved absences alone wipe the template; a day emptied by
/// bookings keeps it false.
#[derive(Debug, Clone)]
pub struct DayAvailability {
    pub horarios: Vec<Slot>,
    pub empleado_ausente: bool,
}

/// Outcome of the commit-time conflict re-check. `Cita` and `Ausencia` map
/// to distinct 409 codigos on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCheck {
    Clear,
    Cita,
    Ausencia,
}

// ==============================================================================
// REQUEST / RESPONSE DTOS
// ==============================================================================

/// One selected catalog service in a booking request. `duracion` is the
/// per-unit duration in minutes as shown to the client when it picked the
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicioSeleccionado {
    pub id: i64,
    pub duracion: i32,
    pub cantidad: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorarioSeleccionado {
    /// Slot start as "HH:MM" local time.
    pub inicio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcesarReservaRequest {
    pub empleado_id: Uuid,
    pub servicios: Vec<ServicioSeleccionado>,
    /// "YYYY-MM-DD" in the business timezone.
    pub fecha: String,
    pub horario: HorarioSeleccionado,
    pub total: f64,
}

/// Booking confirmation payload (`data` in the 200 response).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservaConfirmada {
    pub cita_id: Uuid,
    pub fecha: String,
    pub hora_inicio: String,
    pub total: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CancelarCitaRequest {
    pub motivo: Option<String>,
}

/// Query params for `GET /reservacion/servicios`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiciosQuery {
    pub orden: Option<String>,
}

/// Query params for `GET /reservacion/mis-citas`.
#[derive(Debug, Clone, Deserialize)]
pub struct MisCitasQuery {
    pub orden: Option<String>,
}

/// Query params for `GET /reservacion/horarios`. `servicios` is accepted
/// and validated but the slot filter depends only on citas and ausencias.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorariosQuery {
    pub empleado_id: Uuid,
    pub fecha: String,
    pub servicios: Option<String>,
}

/// Query params for `GET /reservacion/empleados`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmpleadosQuery {
    pub fecha: String,
    pub hora_inicio: String,
    pub hora_fin: String,
}

/// Service shape exposed on `GET /reservacion/servicios`. The booking UI
/// reads `duracion` and echoes it back in `ServicioSeleccionado`.
#[derive(Debug, Clone, Serialize)]
pub struct ServicioReservacion {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub duracion: i32,
    pub precio: f64,
    pub categoria: Option<String>,
}

impl From<catalog_cell::models::ServicioCatalogo> for ServicioReservacion {
    fn from(servicio: catalog_cell::models::ServicioCatalogo) -> Self {
        Self {
            id: servicio.id,
            nombre: servicio.nombre,
            descripcion: servicio.descripcion,
            duracion: servicio.duracion_minutos,
            precio: servicio.precio,
            categoria: servicio.categoria,
        }
    }
}

/// A cita as returned by `GET /reservacion/mis-citas`: the row plus its
/// line items and payment, stitched from their tables.
#[derive(Debug, Clone, Serialize)]
pub struct CitaDetalle {
    #[serde(flatten)]
    pub cita: Cita,
    pub servicios: Vec<CitaServicio>,
    pub pago: Option<Pago>,
}

/// Sort options for listings, rendered to fixed PostgREST fragments so no
/// caller-supplied text ever reaches an `order=` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CitaOrden {
    #[default]
    InicioDesc,
    InicioAsc,
}

impl CitaOrden {
    /// Map a query-string value to an ordering; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inicio_desc" => Some(CitaOrden::InicioDesc),
            "inicio_asc" => Some(CitaOrden::InicioAsc),
            _ => None,
        }
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            CitaOrden::InicioDesc => "fecha_inicio.desc",
            CitaOrden::InicioAsc => "fecha_inicio.asc",
        }
    }
}

// ==============================================================================
// BOOKING RULES
// ==============================================================================

/// Bounds the orchestrator enforces before touching storage.
#[derive(Debug, Clone)]
pub struct ReglasReserva {
    pub max_dias_antelacion: i64,
    pub duracion_minima_minutos: i32,
    pub duracion_maxima_minutos: i32,
    pub max_servicios_por_reserva: usize,
}

impl Default for ReglasReserva {
    fn default() -> Self {
        Self {
            max_dias_antelacion: 90,
            duracion_minima_minutos: 15,
            duracion_maxima_minutos: 240,
            max_servicios_por_reserva: 10,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Cita no encontrada")]
    CitaNotFound,

    #[error("Empleado no encontrado o inactivo")]
    EmpleadoNotFound,

    #[error("Servicio {0} no encontrado o inactivo")]
    ServicioInvalido(i64),

    #[error("Solicitud inválida: {0}")]
    Validation(String),

    #[error("El horario solicitado se solapa con otra cita")]
    Solapamiento,

    #[error("El empleado no está disponible en ese horario")]
    EmpleadoAusente,

    #[error("Una cita en estado {0} no admite esa operación")]
    TransicionInvalida(EstadoCita),

    #[error("No autorizado: {0}")]
    NoAutorizado(String),

    #[error("Error de base de datos: {0}")]
    Database(String),
}
