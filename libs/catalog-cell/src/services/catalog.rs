use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CatalogError, Categoria, Servicio, ServicioCatalogo, ServicioOrden};

pub struct CatalogService {
    supabase: Arc<SupabaseClient>,
}

impl CatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Active services joined with their category names, in the requested
    /// order. This is the payload behind the public catalog listing.
    pub async fn servicios_catalogo(
        &self,
        orden: ServicioOrden,
        auth_token: Option<&str>,
    ) -> Result<Vec<ServicioCatalogo>, CatalogError> {
        let servicios = self.servicios_activos(orden, auth_token).await?;
        let categorias = self.categorias(auth_token).await?;

        let catalogo = servicios
            .into_iter()
            .map(|servicio| {
                let categoria = servicio.categoria_id.and_then(|id| {
                    categorias
                        .iter()
                        .find(|c| c.id == id)
                        .map(|c| c.nombre.clone())
                });
                ServicioCatalogo {
                    id: servicio.id,
                    nombre: servicio.nombre,
                    descripcion: servicio.descripcion,
                    precio: servicio.precio,
                    duracion_minutos: servicio.duracion_minutos,
                    categoria,
                }
            })
            .collect();

        Ok(catalogo)
    }

    pub async fn servicios_activos(
        &self,
        orden: ServicioOrden,
        auth_token: Option<&str>,
    ) -> Result<Vec<Servicio>, CatalogError> {
        let path = format!(
            "/rest/v1/servicios?activo=eq.true&order={}",
            orden.as_query()
        );
        debug!("Fetching active services ordered by {}", orden.as_query());

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| CatalogError::Database(format!("Invalid servicio row: {}", e)))
            })
            .collect()
    }

    pub async fn categorias(
        &self,
        auth_token: Option<&str>,
    ) -> Result<Vec<Categoria>, CatalogError> {
        let rows: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/categorias?order=orden.asc",
                auth_token,
                None,
            )
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| CatalogError::Database(format!("Invalid categoria row: {}", e)))
            })
            .collect()
    }

    /// Fetch the selected services by id. Fails when any id is missing or
    /// inactive, so a stale cart surfaces as an error instead of a silently
    /// shorter booking.
    pub async fn servicios_por_ids(
        &self,
        ids: &[i64],
        auth_token: Option<&str>,
    ) -> Result<Vec<Servicio>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/servicios?id=in.({})&activo=eq.true", id_list);
        debug!("Fetching services by id: {}", id_list);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let servicios: Vec<Servicio> = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| CatalogError::Database(format!("Invalid servicio row: {}", e)))
            })
            .collect::<Result<_, _>>()?;

        for id in ids {
            if !servicios.iter().any(|s| s.id == *id) {
                return Err(CatalogError::ServicioNotFound(*id));
            }
        }

        Ok(servicios)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service_against(mock_server: &MockServer) -> CatalogService {
        let test_config = TestConfig::default();
        let mut config = test_config.to_app_config();
        config.supabase_url = mock_server.uri();
        CatalogService::new(&config)
    }

    #[tokio::test]
    async fn catalogo_joins_category_names() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/servicios"))
            .and(query_param("activo", "eq.true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::servicio_response(1, "Corte de pelo", 18.5, 30),
                {
                    "id": 2,
                    "nombre": "Afeitado",
                    "descripcion": null,
                    "precio": 12.0,
                    "duracion_minutos": 30,
                    "categoria_id": null,
                    "activo": true
                }
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/categorias"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::categoria_response(1, "Peluquería", 1)
            ])))
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server).await;
        let catalogo = service
            .servicios_catalogo(ServicioOrden::default(), None)
            .await
            .unwrap();

        assert_eq!(catalogo.len(), 2);
        assert_eq!(catalogo[0].categoria.as_deref(), Some("Peluquería"));
        assert_eq!(catalogo[1].categoria, None);
    }

    #[tokio::test]
    async fn listing_passes_allow_listed_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/servicios"))
            .and(query_param("order", "precio.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server).await;
        let servicios = service
            .servicios_activos(ServicioOrden::PrecioDesc, None)
            .await
            .unwrap();

        assert!(servicios.is_empty());
    }

    #[tokio::test]
    async fn missing_id_fails_the_lookup() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/servicios"))
            .and(query_param("id", "in.(1,99)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::servicio_response(1, "Corte de pelo", 18.5, 30)
            ])))
            .mount(&mock_server)
            .await;

        let service = service_against(&mock_server).await;
        let result = service.servicios_por_ids(&[1, 99], None).await;

        assert!(matches!(result, Err(CatalogError::ServicioNotFound(99))));
    }

    #[tokio::test]
    async fn empty_id_list_skips_the_request() {
        let mock_server = MockServer::start().await;
        let service = service_against(&mock_server).await;

        let servicios = service.servicios_por_ids(&[], None).await.unwrap();
        assert!(servicios.is_empty());
    }
}
