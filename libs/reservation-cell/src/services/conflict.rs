// libs/reservation-cell/src/services/conflict.rs
//
// Commit-time re-check over absolute UTC timestamps. Independent of the
// slot-based availability listing, so a booking raced between listing and
// submit still gets caught here (and, last, by the store's exclusion
// constraint).

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::overlaps;
use staff_cell::services::AbsenceService;

use crate::models::{BookingError, ConflictCheck, ESTADOS_LIBERADOS};

#[derive(Debug, Deserialize)]
struct CitaEnRango {
    id: Uuid,
    fecha_inicio: DateTime<Utc>,
    fecha_fin: DateTime<Utc>,
}

pub struct ConflictService {
    supabase: SupabaseClient,
    ausencias: AbsenceService,
}

impl ConflictService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            ausencias: AbsenceService::new(config),
        }
    }

    /// Check `[inicio, fin)` against the employee's citas and approved
    /// blocking ausencias. Rows come back from a range query and each one
    /// is confirmed with the shared overlap predicate before it counts.
    /// Never mutates state.
    pub async fn verificar(
        &self,
        empleado_id: Uuid,
        inicio: DateTime<Utc>,
        fin: DateTime<Utc>,
        excluir_cita: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<ConflictCheck, BookingError> {
        let citas = self
            .citas_en_rango(empleado_id, inicio, fin, excluir_cita, auth_token)
            .await?;
        if let Some(cita) = citas
            .iter()
            .find(|cita| overlaps(inicio, fin, cita.fecha_inicio, cita.fecha_fin))
        {
            debug!(
                "Cita {} ocupa [{}, {}) del empleado {}",
                cita.id, cita.fecha_inicio, cita.fecha_fin, empleado_id
            );
            return Ok(ConflictCheck::Cita);
        }

        let ausencias = self
            .ausencias
            .aprobadas_bloqueantes_en_rango(empleado_id, inicio, fin, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        if let Some(ausencia) = ausencias
            .iter()
            .filter(|ausencia| ausencia.bloquea_agenda())
            .find(|ausencia| overlaps(inicio, fin, ausencia.fecha_inicio, ausencia.fecha_fin))
        {
            debug!(
                "Ausencia {} cubre [{}, {}) del empleado {}",
                ausencia.id, ausencia.fecha_inicio, ausencia.fecha_fin, empleado_id
            );
            return Ok(ConflictCheck::Ausencia);
        }

        Ok(ConflictCheck::Clear)
    }

    async fn citas_en_rango(
        &self,
        empleado_id: Uuid,
        inicio: DateTime<Utc>,
        fin: DateTime<Utc>,
        excluir_cita: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Vec<CitaEnRango>, BookingError> {
        let desde = urlencoding::encode(&inicio.to_rfc3339()).into_owned();
        let hasta = urlencoding::encode(&fin.to_rfc3339()).into_owned();

        let mut path = format!(
            "/rest/v1/citas?empleado_id=eq.{}&fecha_inicio=lt.{}&fecha_fin=gt.{}&estado=not.in.({})&select=id,fecha_inicio,fecha_fin",
            empleado_id, hasta, desde, ESTADOS_LIBERADOS
        );
        if let Some(id) = excluir_cita {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| BookingError::Database(format!("Invalid cita row: {}", e)))
            })
            .collect()
    }
}
