// libs/staff-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// EMPLOYEE MODELS
// ==============================================================================

/// Staff member, as stored in `empleados`. Inactive employees stay in the
/// table so historical appointments keep their reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Empleado {
    pub id: Uuid,
    pub nombre: String,
    pub puesto: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

/// Employee shape exposed on public booking endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmpleadoPublico {
    pub id: Uuid,
    pub nombre: String,
    pub puesto: Option<String>,
}

impl From<&Empleado> for EmpleadoPublico {
    fn from(empleado: &Empleado) -> Self {
        Self {
            id: empleado.id,
            nombre: empleado.nombre.clone(),
            puesto: empleado.puesto.clone(),
        }
    }
}

// ==============================================================================
// ABSENCE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MotivoAusencia {
    Vacaciones,
    Enfermedad,
    Permiso,
    Otro,
}

impl MotivoAusencia {
    /// Whether an approved absence with this motivo removes the employee
    /// from the bookable agenda. `Otro` covers notes like training blocks
    /// the salon still books around.
    pub fn bloquea_agenda(&self) -> bool {
        !matches!(self, MotivoAusencia::Otro)
    }
}

impl fmt::Display for MotivoAusencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotivoAusencia::Vacaciones => write!(f, "vacaciones"),
            MotivoAusencia::Enfermedad => write!(f, "enfermedad"),
            MotivoAusencia::Permiso => write!(f, "permiso"),
            MotivoAusencia::Otro => write!(f, "otro"),
        }
    }
}

/// Comma list used inside PostgREST `motivo=in.(...)` filters. Must stay in
/// step with [`MotivoAusencia::bloquea_agenda`].
pub const MOTIVOS_BLOQUEANTES: &str = "vacaciones,enfermedad,permiso";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EstadoAusencia {
    Pendiente,
    Aprobada,
    Cancelada,
}

impl fmt::Display for EstadoAusencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstadoAusencia::Pendiente => write!(f, "pendiente"),
            EstadoAusencia::Aprobada => write!(f, "aprobada"),
            EstadoAusencia::Cancelada => write!(f, "cancelada"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ausencia {
    pub id: Uuid,
    pub empleado_id: Uuid,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: DateTime<Utc>,
    pub motivo: MotivoAusencia,
    pub estado: EstadoAusencia,
    pub notas: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ausencia {
    pub fn bloquea_agenda(&self) -> bool {
        self.estado == EstadoAusencia::Aprobada && self.motivo.bloquea_agenda()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrearAusenciaRequest {
    pub empleado_id: Uuid,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: DateTime<Utc>,
    pub motivo: MotivoAusencia,
    pub notas: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum StaffError {
    #[error("Empleado no encontrado")]
    EmpleadoNotFound,

    #[error("Ausencia no encontrada")]
    AusenciaNotFound,

    #[error("Rango de fechas no válido: {0}")]
    InvalidRange(String),

    #[error("La ausencia no admite esa operación en estado {0}")]
    InvalidTransition(EstadoAusencia),

    #[error("Error de base de datos: {0}")]
    Database(String),
}
