// libs/reservation-cell/src/services/notify.rs
//
// Best-effort notification events. The booking path never awaits the
// insert: it runs post-commit in a spawned task and a failure is only
// logged, never surfaced to the caller.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, TipoNotificacion};

pub struct NotificationService {
    supabase: Arc<SupabaseClient>,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Insert one `notificaciones` row and wait for the result. The booking
    /// path goes through `dispatch_background` instead.
    pub async fn registrar(
        &self,
        cita_id: Uuid,
        tipo: TipoNotificacion,
        auth_token: Option<&str>,
    ) -> Result<(), BookingError> {
        Self::insertar(&self.supabase, cita_id, tipo, auth_token).await
    }

    /// Fire-and-forget insert in a spawned task. The handle is returned for
    /// tests; production callers drop it.
    pub fn dispatch_background(
        &self,
        cita_id: Uuid,
        tipo: TipoNotificacion,
        auth_token: Option<String>,
    ) -> JoinHandle<()> {
        let supabase = Arc::clone(&self.supabase);
        tokio::spawn(async move {
            if let Err(e) = Self::insertar(&supabase, cita_id, tipo, auth_token.as_deref()).await {
                warn!(
                    "Notificación {} de la cita {} no registrada: {}",
                    tipo, cita_id, e
                );
            }
        })
    }

    async fn insertar(
        supabase: &SupabaseClient,
        cita_id: Uuid,
        tipo: TipoNotificacion,
        auth_token: Option<&str>,
    ) -> Result<(), BookingError> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let body = json!({
            "cita_id": cita_id,
            "tipo": tipo,
        });

        let _rows: Vec<Value> = supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notificaciones",
                auth_token,
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        debug!("Notificación {} registrada para la cita {}", tipo, cita_id);
        Ok(())
    }
}
