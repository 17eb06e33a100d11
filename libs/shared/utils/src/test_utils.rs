use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "cliente".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn cliente(email: &str) -> Self {
        Self::new(email, "cliente")
    }

    pub fn empleado(email: &str) -> Self {
        Self::new(email, "empleado")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for wiremock-backed tests. Field names follow the
/// live table columns, so handlers parse them exactly as in production.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn cliente_response(cliente_id: &str, perfil_id: &str) -> serde_json::Value {
        json!({
            "id": cliente_id,
            "perfil_id": perfil_id,
            "nombre": "Ana Prueba",
            "telefono": "+34600000000",
            "email": "ana@example.com",
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn empleado_response(empleado_id: &str, nombre: &str) -> serde_json::Value {
        json!({
            "id": empleado_id,
            "nombre": nombre,
            "puesto": "estilista",
            "activo": true,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn servicio_response(
        id: i64,
        nombre: &str,
        precio: f64,
        duracion_minutos: i32,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "nombre": nombre,
            "descripcion": null,
            "precio": precio,
            "duracion_minutos": duracion_minutos,
            "categoria_id": 1,
            "activo": true,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn categoria_response(id: i64, nombre: &str, orden: i32) -> serde_json::Value {
        json!({
            "id": id,
            "nombre": nombre,
            "orden": orden
        })
    }

    pub fn cita_response(
        cita_id: &str,
        cliente_id: &str,
        empleado_id: &str,
        fecha_inicio: &str,
        fecha_fin: &str,
        estado: &str,
    ) -> serde_json::Value {
        json!({
            "id": cita_id,
            "cliente_id": cliente_id,
            "empleado_id": empleado_id,
            "fecha_inicio": fecha_inicio,
            "fecha_fin": fecha_fin,
            "estado": estado,
            "total": 25.0,
            "notas": null,
            "cancelada_por": null,
            "motivo_cancelacion": null,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn cita_servicio_response(cita_id: &str, servicio_id: i64) -> serde_json::Value {
        json!({
            "id": 1,
            "cita_id": cita_id,
            "servicio_id": servicio_id,
            "cantidad": 1,
            "precio_unitario": 25.0,
            "descuento_aplicado": 0.0,
            "duracion_minutos": 30
        })
    }

    pub fn ausencia_response(
        ausencia_id: &str,
        empleado_id: &str,
        fecha_inicio: &str,
        fecha_fin: &str,
        motivo: &str,
        estado: &str,
    ) -> serde_json::Value {
        json!({
            "id": ausencia_id,
            "empleado_id": empleado_id,
            "fecha_inicio": fecha_inicio,
            "fecha_fin": fecha_fin,
            "motivo": motivo,
            "estado": estado,
            "notas": null,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn pago_response(pago_id: &str, cita_id: &str, monto: f64) -> serde_json::Value {
        json!({
            "id": pago_id,
            "cita_id": cita_id,
            "monto": monto,
            "metodo": "pendiente",
            "estado": "pendiente",
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn reserva_rpc_response(cita_id: &str) -> serde_json::Value {
        json!({ "cita_id": cita_id })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_roles() {
        let cliente = TestUser::cliente("ana@example.com");
        assert_eq!(cliente.role, "cliente");

        let empleado = TestUser::empleado("luis@example.com");
        assert_eq!(empleado.role, "empleado");

        let user_model = cliente.to_user();
        assert_eq!(user_model.email, Some(cliente.email.clone()));
        assert_eq!(user_model.role, Some("cliente".to_string()));
        assert_eq!(user_model.id, cliente.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }
}
