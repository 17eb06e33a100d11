// libs/reservation-cell/src/services/availability.rs
//
// Filters a day's slot template against one employee's agenda. Citas and
// ausencias live in UTC; both are projected onto the local day as minute
// bands before any comparison, so multi-day absences block exactly the
// portion that falls on the requested date.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::{clamp_to_local_day, local_day_bounds, overlaps};
use staff_cell::services::AbsenceService;

use crate::models::{BookingError, DayAvailability, Slot, ESTADOS_LIBERADOS};
use crate::services::schedule;

#[derive(Debug, Deserialize)]
struct RangoOcupado {
    fecha_inicio: DateTime<Utc>,
    fecha_fin: DateTime<Utc>,
}

pub struct AvailabilityService {
    supabase: SupabaseClient,
    ausencias: AbsenceService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            ausencias: AbsenceService::new(config),
        }
    }

    /// Free slots for one employee on one date, with the absence marker per
    /// the availability convention: `empleado_ausente` only when approved
    /// absences alone empty the template.
    pub async fn disponibilidad_dia(
        &self,
        empleado_id: Uuid,
        fecha: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<DayAvailability, BookingError> {
        let slots = schedule::slots_for_date(fecha);
        let (desde, hasta) = local_day_bounds(fecha);

        let citas = self
            .citas_bloqueantes(empleado_id, desde, hasta, auth_token)
            .await?;
        let ausencias = self
            .ausencias
            .aprobadas_bloqueantes_en_rango(empleado_id, desde, hasta, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let bandas_cita: Vec<(i32, i32)> = citas
            .iter()
            .filter_map(|cita| clamp_to_local_day(fecha, cita.fecha_inicio, cita.fecha_fin))
            .collect();
        // The query already filters estado/motivo; bloquea_agenda re-checks
        // the same rule on the parsed rows.
        let bandas_ausencia: Vec<(i32, i32)> = ausencias
            .iter()
            .filter(|ausencia| ausencia.bloquea_agenda())
            .filter_map(|ausencia| {
                clamp_to_local_day(fecha, ausencia.fecha_inicio, ausencia.fecha_fin)
            })
            .collect();

        debug!(
            "Empleado {} el {}: {} citas y {} ausencias proyectadas sobre {} slots",
            empleado_id,
            fecha,
            bandas_cita.len(),
            bandas_ausencia.len(),
            slots.len()
        );

        Ok(filtrar_dia(slots, &bandas_ausencia, &bandas_cita))
    }

    async fn citas_bloqueantes(
        &self,
        empleado_id: Uuid,
        desde: DateTime<Utc>,
        hasta: DateTime<Utc>,
        auth_token: Option<&str>,
    ) -> Result<Vec<RangoOcupado>, BookingError> {
        let desde_q = urlencoding::encode(&desde.to_rfc3339()).into_owned();
        let hasta_q = urlencoding::encode(&hasta.to_rfc3339()).into_owned();

        let path = format!(
            "/rest/v1/citas?empleado_id=eq.{}&fecha_inicio=lt.{}&fecha_fin=gt.{}&estado=not.in.({})&select=fecha_inicio,fecha_fin",
            empleado_id, hasta_q, desde_q, ESTADOS_LIBERADOS
        );

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

/// Pure filter behind `disponibilidad_dia`. Absence bands are applied
/// first; only when they empty the template on their own does the result
/// carry `empleado_ausente = true`. A day emptied by citas is simply full.
pub fn filtrar_dia(
    slots: &[Slot],
    bandas_ausencia: &[(i32, i32)],
    bandas_cita: &[(i32, i32)],
) -> DayAvailability {
    let tras_ausencias = descartar_ocupados(slots, bandas_ausencia);

    if tras_ausencias.is_empty() && !bandas_ausencia.is_empty() {
        return DayAvailability {
            horarios: Vec::new(),
            empleado_ausente: true,
        };
    }

    DayAvailability {
        horarios: descartar_ocupados(&tras_ausencias, bandas_cita),
        empleado_ausente: false,
    }
}

fn descartar_ocupados(slots: &[Slot], bandas: &[(i32, i32)]) -> Vec<Slot> {
    slots
        .iter()
        .copied()
        .filter(|slot| {
            !bandas
                .iter()
                .any(|&(inicio, fin)| overlaps(slot.start_min, slot.end_min, inicio, fin))
        })
        .collect()
}
