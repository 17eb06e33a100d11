use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{Empleado, StaffError, MOTIVOS_BLOQUEANTES};

/// Minimal row shape for overlap queries against `citas` and
/// `ausencias_empleado`. Only the owning employee matters here.
#[derive(Debug, Deserialize)]
struct OcupacionRow {
    empleado_id: Uuid,
}

pub struct EmployeeService {
    supabase: SupabaseClient,
}

impl EmployeeService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_empleado(
        &self,
        empleado_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Empleado, StaffError> {
        let path = format!("/rest/v1/empleados?id=eq.{}", empleado_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map_err(|e| StaffError::Database(format!("Invalid empleado row: {}", e))),
            None => Err(StaffError::EmpleadoNotFound),
        }
    }

    pub async fn list_activos(
        &self,
        auth_token: Option<&str>,
    ) -> Result<Vec<Empleado>, StaffError> {
        let rows: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/empleados?activo=eq.true&order=nombre.asc",
                auth_token,
                None,
            )
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| StaffError::Database(format!("Invalid empleado row: {}", e)))
            })
            .collect()
    }

    /// Active employees free during the given UTC window: no live
    /// appointment and no approved blocking absence intersecting it. One
    /// range query per table covers the whole staff; the busy set is
    /// resolved in memory.
    pub async fn disponibles_en_ventana(
        &self,
        inicio: DateTime<Utc>,
        fin: DateTime<Utc>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Empleado>, StaffError> {
        let empleados = self.list_activos(auth_token).await?;
        if empleados.is_empty() {
            return Ok(empleados);
        }

        let desde = urlencoding::encode(&inicio.to_rfc3339()).into_owned();
        let hasta = urlencoding::encode(&fin.to_rfc3339()).into_owned();

        let citas_path = format!(
            "/rest/v1/citas?fecha_inicio=lt.{}&fecha_fin=gt.{}&estado=not.in.(cancelada,no_asistio)&select=empleado_id",
            hasta, desde
        );
        let ausencias_path = format!(
            "/rest/v1/ausencias_empleado?estado=eq.aprobada&motivo=in.({})&fecha_inicio=lt.{}&fecha_fin=gt.{}&select=empleado_id",
            MOTIVOS_BLOQUEANTES, hasta, desde
        );

        let mut ocupados: HashSet<Uuid> = HashSet::new();
        for path in [citas_path, ausencias_path] {
            let rows: Vec<Value> = self
                .supabase
                .request(Method::GET, &path, auth_token, None)
                .await
                .map_err(|e| StaffError::Database(e.to_string()))?;
            for row in rows {
                let ocupacion: OcupacionRow = serde_json::from_value(row)
                    .map_err(|e| StaffError::Database(format!("Invalid ocupacion row: {}", e)))?;
                ocupados.insert(ocupacion.empleado_id);
            }
        }

        debug!(
            "{} of {} active employees busy between {} and {}",
            ocupados.len(),
            empleados.len(),
            inicio,
            fin
        );

        Ok(empleados
            .into_iter()
            .filter(|empleado| !ocupados.contains(&empleado.id))
            .collect())
    }
}
