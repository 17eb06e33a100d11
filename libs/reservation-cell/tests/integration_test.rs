use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reservation_cell::router::reservation_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_config(mock_server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: TestConfig::default().jwt_secret,
    }
}

fn app(config: AppConfig) -> Router {
    reservation_routes(Arc::new(config))
}

fn proximo_lunes() -> NaiveDate {
    let mut fecha = Utc::now().date_naive() + Duration::days(7);
    while fecha.weekday() != Weekday::Mon {
        fecha += Duration::days(1);
    }
    fecha
}

fn cuerpo_reserva(empleado_id: Uuid, fecha: NaiveDate) -> String {
    json!({
        "empleadoId": empleado_id,
        "servicios": [{ "id": 3, "duracion": 45, "cantidad": 1 }],
        "fecha": fecha.format("%Y-%m-%d").to_string(),
        "horario": { "inicio": "09:15" },
        "total": 32.5
    })
    .to_string()
}

async fn setup_reserva_mocks(mock_server: &MockServer, empleado_id: Uuid, perfil_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/empleados"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::empleado_response(&empleado_id.to_string(), "Miguel")
        ])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clientes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::cliente_response(&Uuid::new_v4().to_string(), perfil_id)
        ])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/servicios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::servicio_response(3, "Corte de caballero", 18.0, 45)
        ])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/ausencias_empleado"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/notificaciones"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 1 }])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let cuerpo = cuerpo_reserva(Uuid::new_v4(), proximo_lunes());

    // No header at all
    let response = app(config.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/procesar")
                .header("Content-Type", "application/json")
                .body(Body::from(cuerpo.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Expired token
    let user = TestUser::cliente("ana@example.com");
    let vencido = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);
    let response = app(config.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/procesar")
                .header("Authorization", format!("Bearer {}", vencido))
                .header("Content-Type", "application/json")
                .body(Body::from(cuerpo.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Token signed with another secret
    let ajeno = JwtTestUtils::create_invalid_signature_token(&user);
    let response = app(config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/procesar")
                .header("Authorization", format!("Bearer {}", ajeno))
                .header("Content-Type", "application/json")
                .body(Body::from(cuerpo))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_catalog_needs_no_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/servicios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::servicio_response(1, "Corte de caballero", 15.0, 30)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/categorias"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::categoria_response(1, "Cortes", 1)
        ])))
        .mount(&mock_server)
        .await;

    let response = app(test_config(&mock_server))
        .oneshot(
            Request::builder()
                .uri("/servicios")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["servicios"][0]["duracion"], 30);
}

#[tokio::test]
async fn booking_over_http_returns_confirmation() {
    let mock_server = MockServer::start().await;
    let empleado_id = Uuid::new_v4();
    let cita_id = Uuid::new_v4();
    let user = TestUser::cliente("ana@example.com");
    let config = test_config(&mock_server);
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    setup_reserva_mocks(&mock_server, empleado_id, &user.id).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/reservar_cita"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::reserva_rpc_response(&cita_id.to_string()),
        ))
        .mount(&mock_server)
        .await;

    let response = app(config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/procesar")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(cuerpo_reserva(empleado_id, proximo_lunes())))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["success"], true);
    assert_eq!(json_response["data"]["citaId"], cita_id.to_string());
    assert_eq!(json_response["data"]["horaInicio"], "09:15");
}

#[tokio::test]
async fn booking_race_has_exactly_one_winner() {
    let mock_server = MockServer::start().await;
    let empleado_id = Uuid::new_v4();
    let user = TestUser::cliente("ana@example.com");
    let config = test_config(&mock_server);
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    setup_reserva_mocks(&mock_server, empleado_id, &user.id).await;
    // The store grants the slot once; the second insert trips the
    // exclusion constraint.
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/reservar_cita"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::reserva_rpc_response(&Uuid::new_v4().to_string()),
        ))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/reservar_cita"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "conflicting key value violates exclusion constraint \"citas_sin_solape\""
        })))
        .mount(&mock_server)
        .await;

    let application = app(config);
    let fecha = proximo_lunes();
    let pedir = |app: Router, cuerpo: String, token: String| async move {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/procesar")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(cuerpo))
                .unwrap(),
        )
        .await
        .unwrap()
    };

    let (primera, segunda) = tokio::join!(
        pedir(
            application.clone(),
            cuerpo_reserva(empleado_id, fecha),
            token.clone()
        ),
        pedir(application, cuerpo_reserva(empleado_id, fecha), token),
    );

    let mut estados = vec![primera.status(), segunda.status()];
    estados.sort();
    assert_eq!(estados, vec![StatusCode::OK, StatusCode::CONFLICT]);

    let perdedora = if primera.status() == StatusCode::CONFLICT {
        primera
    } else {
        segunda
    };
    let body = axum::body::to_bytes(perdedora.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["success"], false);
    assert_eq!(json_response["codigo"], "cita_solapada");
}

#[tokio::test]
async fn cancelling_frees_the_slot_for_new_bookings() {
    let mock_server = MockServer::start().await;
    let empleado_id = Uuid::new_v4();
    let cita_id = Uuid::new_v4();
    let cliente_id = Uuid::new_v4();
    let user = TestUser::cliente("ana@example.com");
    let config = test_config(&mock_server);
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/empleados"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::empleado_response(&empleado_id.to_string(), "Miguel")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/ausencias_empleado"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clientes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::cliente_response(&cliente_id.to_string(), &user.id)
        ])))
        .mount(&mock_server)
        .await;
    // The 09:15-10:00 local window is taken while the cita is pendiente
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::cita_response(
                &cita_id.to_string(),
                &cliente_id.to_string(),
                &empleado_id.to_string(),
                "2027-03-08T14:15:00Z",
                "2027-03-08T15:00:00Z",
                "pendiente",
            )
        ])))
        .mount(&mock_server)
        .await;

    let uri_horarios = format!("/horarios?empleadoId={}&fecha=2027-03-08", empleado_id);
    let response = app(config.clone())
        .oneshot(
            Request::builder()
                .uri(&uri_horarios)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let antes: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(antes["horarios"].as_array().unwrap().len(), 11);
    assert_eq!(antes["horarios"][0]["inicio"], "10:15");

    // Cancel the cita as its owner
    let mut cancelada = MockSupabaseResponses::cita_response(
        &cita_id.to_string(),
        &cliente_id.to_string(),
        &empleado_id.to_string(),
        "2027-03-08T14:15:00Z",
        "2027-03-08T15:00:00Z",
        "cancelada",
    );
    cancelada["cancelada_por"] = json!("cliente");
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelada])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/notificaciones"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 1 }])))
        .mount(&mock_server)
        .await;

    let response = app(config.clone())
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(&format!("/cancelar/{}", cita_id))
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A cancelled cita no longer matches the blocking-estado filter, so
    // the availability query comes back empty.
    Mock::given(method("GET"))
        .and(path("/rest/v1/citas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    let response = app(config)
        .oneshot(
            Request::builder()
                .uri(&uri_horarios)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let despues: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(despues["horarios"].as_array().unwrap().len(), 13);
    assert_eq!(despues["horarios"][0]["inicio"], "09:15");
}

#[tokio::test]
async fn booking_with_empty_services_is_bad_request() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server);
    let user = TestUser::cliente("ana@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    let cuerpo = json!({
        "empleadoId": Uuid::new_v4(),
        "servicios": [],
        "fecha": proximo_lunes().format("%Y-%m-%d").to_string(),
        "horario": { "inicio": "09:15" },
        "total": 0.0
    })
    .to_string();

    let response = app(config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/procesar")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(cuerpo))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["success"], false);
}
