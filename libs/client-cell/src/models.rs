// libs/client-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Salon customer, as stored in `clientes`. `perfil_id` ties the row to a
/// Supabase auth user; rows created at the counter for walk-ins have none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cliente {
    pub id: Uuid,
    pub perfil_id: Option<Uuid>,
    pub nombre: String,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ClientError {
    #[error("Error de base de datos: {0}")]
    Database(String),
}
