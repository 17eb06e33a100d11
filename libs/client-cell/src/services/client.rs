use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::User;

use crate::models::{Cliente, ClientError};

pub struct ClientService {
    supabase: SupabaseClient,
}

impl ClientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Customer row linked to the given auth profile, if one exists.
    pub async fn buscar_por_perfil(
        &self,
        perfil_id: &str,
        auth_token: &str,
    ) -> Result<Option<Cliente>, ClientError> {
        let path = format!("/rest/v1/clientes?perfil_id=eq.{}", perfil_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClientError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let cliente = serde_json::from_value(row)
                    .map_err(|e| ClientError::Database(format!("Invalid cliente row: {}", e)))?;
                Ok(Some(cliente))
            }
            None => Ok(None),
        }
    }

    /// Find the customer row for an authenticated user, creating it on the
    /// first booking. The display name falls back from the user metadata to
    /// the email local part.
    pub async fn resolver_para_usuario(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Cliente, ClientError> {
        if let Some(cliente) = self.buscar_por_perfil(&user.id, auth_token).await? {
            return Ok(cliente);
        }

        debug!("No cliente row for profile {}, creating one", user.id);

        let cliente_data = json!({
            "perfil_id": user.id,
            "nombre": display_name(user),
            "email": user.email,
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clientes",
                Some(auth_token),
                Some(cliente_data),
                Some(headers),
            )
            .await
            .map_err(|e| ClientError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(ClientError::Database(
                "Failed to create cliente row".to_string(),
            ));
        }

        let cliente: Cliente = serde_json::from_value(result[0].clone())
            .map_err(|e| ClientError::Database(format!("Invalid cliente row: {}", e)))?;

        info!("Cliente {} created for profile {}", cliente.id, user.id);
        Ok(cliente)
    }
}

fn display_name(user: &User) -> String {
    if let Some(metadata) = &user.metadata {
        for key in ["nombre", "full_name", "name"] {
            if let Some(nombre) = metadata.get(key).and_then(|v| v.as_str()) {
                if !nombre.trim().is_empty() {
                    return nombre.trim().to_string();
                }
            }
        }
    }

    user.email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| prefix.to_string())
        .unwrap_or_else(|| "Cliente".to_string())
}
