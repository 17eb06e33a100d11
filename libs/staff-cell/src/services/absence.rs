use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    Ausencia, CrearAusenciaRequest, EstadoAusencia, StaffError, MOTIVOS_BLOQUEANTES,
};

pub struct AbsenceService {
    supabase: SupabaseClient,
}

impl AbsenceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn prefer_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn parse_row(row: Value) -> Result<Ausencia, StaffError> {
        serde_json::from_value(row)
            .map_err(|e| StaffError::Database(format!("Invalid ausencia row: {}", e)))
    }

    /// Register an absence request. It enters the agenda only once approved.
    pub async fn crear(
        &self,
        request: CrearAusenciaRequest,
        auth_token: &str,
    ) -> Result<Ausencia, StaffError> {
        if request.fecha_fin <= request.fecha_inicio {
            return Err(StaffError::InvalidRange(
                "fechaFin debe ser posterior a fechaInicio".to_string(),
            ));
        }

        let ausencia_data = json!({
            "empleado_id": request.empleado_id,
            "fecha_inicio": request.fecha_inicio.to_rfc3339(),
            "fecha_fin": request.fecha_fin.to_rfc3339(),
            "motivo": request.motivo,
            "estado": EstadoAusencia::Pendiente,
            "notas": request.notas,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/ausencias_empleado",
                Some(auth_token),
                Some(ausencia_data),
                Some(Self::prefer_representation()),
            )
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| StaffError::Database("Failed to create ausencia".to_string()))?;
        let ausencia = Self::parse_row(row)?;

        info!(
            "Ausencia {} registered for empleado {} ({} to {})",
            ausencia.id, ausencia.empleado_id, ausencia.fecha_inicio, ausencia.fecha_fin
        );
        Ok(ausencia)
    }

    pub async fn get(&self, ausencia_id: Uuid, auth_token: &str) -> Result<Ausencia, StaffError> {
        let path = format!("/rest/v1/ausencias_empleado?id=eq.{}", ausencia_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => Self::parse_row(row),
            None => Err(StaffError::AusenciaNotFound),
        }
    }

    /// Approve a pending absence. From that moment it blocks the agenda if
    /// its motivo does.
    pub async fn aprobar(
        &self,
        ausencia_id: Uuid,
        auth_token: &str,
    ) -> Result<Ausencia, StaffError> {
        let ausencia = self.get(ausencia_id, auth_token).await?;
        if ausencia.estado != EstadoAusencia::Pendiente {
            return Err(StaffError::InvalidTransition(ausencia.estado));
        }

        self.set_estado(ausencia_id, EstadoAusencia::Aprobada, auth_token)
            .await
    }

    /// Cancel a pending or approved absence, freeing its window again.
    pub async fn cancelar(
        &self,
        ausencia_id: Uuid,
        auth_token: &str,
    ) -> Result<Ausencia, StaffError> {
        let ausencia = self.get(ausencia_id, auth_token).await?;
        if ausencia.estado == EstadoAusencia::Cancelada {
            return Err(StaffError::InvalidTransition(ausencia.estado));
        }

        self.set_estado(ausencia_id, EstadoAusencia::Cancelada, auth_token)
            .await
    }

    async fn set_estado(
        &self,
        ausencia_id: Uuid,
        estado: EstadoAusencia,
        auth_token: &str,
    ) -> Result<Ausencia, StaffError> {
        let path = format!("/rest/v1/ausencias_empleado?id=eq.{}", ausencia_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "estado": estado })),
                Some(Self::prefer_representation()),
            )
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(StaffError::AusenciaNotFound)?;
        let ausencia = Self::parse_row(row)?;

        info!("Ausencia {} moved to estado {}", ausencia.id, estado);
        Ok(ausencia)
    }

    pub async fn listar(
        &self,
        empleado_id: Option<Uuid>,
        estado: Option<EstadoAusencia>,
        desde: Option<DateTime<Utc>>,
        hasta: Option<DateTime<Utc>>,
        auth_token: &str,
    ) -> Result<Vec<Ausencia>, StaffError> {
        let mut path = String::from("/rest/v1/ausencias_empleado?order=fecha_inicio.desc");
        if let Some(id) = empleado_id {
            path.push_str(&format!("&empleado_id=eq.{}", id));
        }
        if let Some(estado) = estado {
            path.push_str(&format!("&estado=eq.{}", estado));
        }
        // Range filters select any absence intersecting [desde, hasta)
        if let Some(desde) = desde {
            path.push_str(&format!(
                "&fecha_fin=gt.{}",
                urlencoding::encode(&desde.to_rfc3339())
            ));
        }
        if let Some(hasta) = hasta {
            path.push_str(&format!(
                "&fecha_inicio=lt.{}",
                urlencoding::encode(&hasta.to_rfc3339())
            ));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        rows.into_iter().map(Self::parse_row).collect()
    }

    /// Approved absences with an agenda-blocking motivo that intersect the
    /// given UTC range, newest first left to the database default.
    pub async fn aprobadas_bloqueantes_en_rango(
        &self,
        empleado_id: Uuid,
        inicio: DateTime<Utc>,
        fin: DateTime<Utc>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Ausencia>, StaffError> {
        let desde = urlencoding::encode(&inicio.to_rfc3339()).into_owned();
        let hasta = urlencoding::encode(&fin.to_rfc3339()).into_owned();

        let path = format!(
            "/rest/v1/ausencias_empleado?empleado_id=eq.{}&estado=eq.aprobada&motivo=in.({})&fecha_inicio=lt.{}&fecha_fin=gt.{}",
            empleado_id, MOTIVOS_BLOQUEANTES, hasta, desde
        );
        debug!(
            "Fetching blocking absences for empleado {} between {} and {}",
            empleado_id, inicio, fin
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| StaffError::Database(e.to_string()))?;

        rows.into_iter().map(Self::parse_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_against(mock_server: &MockServer) -> AbsenceService {
        let mut config = TestConfig::default().to_app_config();
        config.supabase_url = mock_server.uri();
        AbsenceService::new(&config)
    }

    fn request_for(empleado_id: Uuid, horas: i64) -> CrearAusenciaRequest {
        let inicio = Utc::now() + chrono::Duration::days(7);
        CrearAusenciaRequest {
            empleado_id,
            fecha_inicio: inicio,
            fecha_fin: inicio + chrono::Duration::hours(horas),
            motivo: crate::models::MotivoAusencia::Vacaciones,
            notas: None,
        }
    }

    #[tokio::test]
    async fn crear_rejects_inverted_range() {
        let mock_server = MockServer::start().await;
        let service = service_against(&mock_server);

        let mut request = request_for(Uuid::new_v4(), 8);
        request.fecha_fin = request.fecha_inicio - chrono::Duration::hours(1);

        let result = service.crear(request, "token").await;
        assert!(matches!(result, Err(StaffError::InvalidRange(_))));
    }

    #[tokio::test]
    async fn aprobar_rejects_non_pending() {
        let mock_server = MockServer::start().await;
        let ausencia_id = Uuid::new_v4();
        let empleado_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/ausencias_empleado"))
            .and(query_param("id", format!("eq.{}", ausencia_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                MockSupabaseResponses::ausencia_response(
                    &ausencia_id.to_string(),
                    &empleado_id.to_string(),
                    "2025-06-01T09:00:00Z",
                    "2025-06-03T18:00:00Z",
                    "vacaciones",
                    "cancelada",
                )
            ])))
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server);
        let result = service.aprobar(ausencia_id, "token").await;

        assert!(matches!(
            result,
            Err(StaffError::InvalidTransition(EstadoAusencia::Cancelada))
        ));
    }

    #[tokio::test]
    async fn aprobar_patches_pending_row() {
        let mock_server = MockServer::start().await;
        let ausencia_id = Uuid::new_v4();
        let empleado_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/ausencias_empleado"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                MockSupabaseResponses::ausencia_response(
                    &ausencia_id.to_string(),
                    &empleado_id.to_string(),
                    "2025-06-01T09:00:00Z",
                    "2025-06-03T18:00:00Z",
                    "vacaciones",
                    "pendiente",
                )
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/ausencias_empleado"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                MockSupabaseResponses::ausencia_response(
                    &ausencia_id.to_string(),
                    &empleado_id.to_string(),
                    "2025-06-01T09:00:00Z",
                    "2025-06-03T18:00:00Z",
                    "vacaciones",
                    "aprobada",
                )
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server);
        let ausencia = service.aprobar(ausencia_id, "token").await.unwrap();

        assert_eq!(ausencia.estado, EstadoAusencia::Aprobada);
    }

    #[tokio::test]
    async fn listar_applies_day_range_filters() {
        let mock_server = MockServer::start().await;

        let desde: DateTime<Utc> = "2025-06-01T05:00:00Z".parse().unwrap();
        let hasta: DateTime<Utc> = "2025-06-08T05:00:00Z".parse().unwrap();

        Mock::given(method("GET"))
            .and(path("/rest/v1/ausencias_empleado"))
            .and(query_param("fecha_fin", format!("gt.{}", desde.to_rfc3339())))
            .and(query_param(
                "fecha_inicio",
                format!("lt.{}", hasta.to_rfc3339()),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server);
        let ausencias = service
            .listar(None, None, Some(desde), Some(hasta), "token")
            .await
            .unwrap();

        assert!(ausencias.is_empty());
    }

    #[tokio::test]
    async fn rango_query_carries_blocking_filters() {
        let mock_server = MockServer::start().await;
        let empleado_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/ausencias_empleado"))
            .and(query_param("estado", "eq.aprobada"))
            .and(query_param("motivo", format!("in.({})", MOTIVOS_BLOQUEANTES)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server);
        let inicio = Utc::now();
        let ausencias = service
            .aprobadas_bloqueantes_en_rango(
                empleado_id,
                inicio,
                inicio + chrono::Duration::hours(8),
                Some("token"),
            )
            .await
            .unwrap();

        assert!(ausencias.is_empty());
    }
}
