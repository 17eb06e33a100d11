// libs/reservation-cell/src/services/booking.rs
//
// Booking orchestrator: request shape -> window in UTC -> employee,
// client and catalog lookups -> conflict re-check -> atomic persist via
// the `reservar_cita` function. The store's exclusion constraint is the
// final arbiter between racing requests; everything before it can only
// reject early.

use chrono::{Duration, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use catalog_cell::models::CatalogError;
use catalog_cell::services::CatalogService;
use client_cell::services::ClientService;
use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};
use shared_models::auth::User;
use shared_utils::time::{format_minutes, local_to_utc, minutes_from_midnight};
use staff_cell::models::StaffError;
use staff_cell::services::EmployeeService;

use crate::models::{
    BookingError, CanceladaPor, CancelarCitaRequest, Cita, CitaDetalle, CitaOrden, CitaServicio,
    ConflictCheck, EstadoCita, Pago, ProcesarReservaRequest, ReglasReserva, ReservaConfirmada,
    ServicioSeleccionado, Slot, TipoNotificacion,
};
use crate::services::conflict::ConflictService;
use crate::services::lifecycle::CitaLifecycleService;
use crate::services::notify::NotificationService;
use crate::services::schedule;

#[derive(Debug, Deserialize)]
struct ReservaRpcRespuesta {
    cita_id: Uuid,
}

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    catalogo: CatalogService,
    clientes: ClientService,
    empleados: EmployeeService,
    conflictos: ConflictService,
    lifecycle: CitaLifecycleService,
    notificaciones: NotificationService,
    reglas: ReglasReserva,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            catalogo: CatalogService::new(config),
            clientes: ClientService::new(config),
            empleados: EmployeeService::new(config),
            conflictos: ConflictService::new(config),
            lifecycle: CitaLifecycleService::new(),
            notificaciones: NotificationService::new(config),
            reglas: ReglasReserva::default(),
        }
    }

    fn prefer_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// Book an appointment for the calling user. Persistence happens in one
    /// Postgres transaction; a loser of the booking race comes back as
    /// `Solapamiento` no matter how late the overlap was detected.
    pub async fn procesar_reserva(
        &self,
        user: &User,
        request: ProcesarReservaRequest,
        auth_token: &str,
    ) -> Result<ReservaConfirmada, BookingError> {
        info!(
            "Procesando reserva: empleado {} el {} a las {}",
            request.empleado_id, request.fecha, request.horario.inicio
        );

        // Step 1: request shape and slot membership
        let (fecha, slot) = self.validar_solicitud(&request)?;
        let duracion = self.duracion_total(&request.servicios)?;

        // Step 2: absolute window
        let inicio = local_to_utc(fecha, slot.start_min);
        let fin = inicio + Duration::minutes(duracion);
        let ahora = Utc::now();
        if inicio < ahora {
            return Err(BookingError::Validation(
                "no se puede reservar en el pasado".to_string(),
            ));
        }
        if inicio > ahora + Duration::days(self.reglas.max_dias_antelacion) {
            return Err(BookingError::Validation(format!(
                "solo se admiten reservas hasta {} días por adelantado",
                self.reglas.max_dias_antelacion
            )));
        }

        // Step 3: employee must exist and be active
        let empleado = self
            .empleados
            .get_empleado(request.empleado_id, Some(auth_token))
            .await
            .map_err(map_staff_error)?;
        if !empleado.activo {
            return Err(BookingError::EmpleadoNotFound);
        }

        // Step 4: caller -> cliente, created on first booking
        let cliente = self
            .clientes
            .resolver_para_usuario(user, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        // Step 5: catalog rows for the price snapshot
        let ids: Vec<i64> = request.servicios.iter().map(|s| s.id).collect();
        let servicios = self
            .catalogo
            .servicios_por_ids(&ids, Some(auth_token))
            .await
            .map_err(map_catalog_error)?;
        let precios: HashMap<i64, f64> = servicios.iter().map(|s| (s.id, s.precio)).collect();

        // Step 6: conflict re-check over the actual window
        match self
            .conflictos
            .verificar(request.empleado_id, inicio, fin, None, Some(auth_token))
            .await?
        {
            ConflictCheck::Cita => return Err(BookingError::Solapamiento),
            ConflictCheck::Ausencia => return Err(BookingError::EmpleadoAusente),
            ConflictCheck::Clear => {}
        }

        // Step 7: atomic persist. The function re-checks ausencias inside
        // the transaction and the exclusion constraint rejects overlap.
        let mut lineas = Vec::with_capacity(request.servicios.len());
        for seleccion in &request.servicios {
            let precio = precios
                .get(&seleccion.id)
                .copied()
                .ok_or(BookingError::ServicioInvalido(seleccion.id))?;
            // Snapshot columns. No promotion path grants a discount today,
            // so every line records 0 at booking time.
            lineas.push(json!({
                "servicio_id": seleccion.id,
                "cantidad": seleccion.cantidad,
                "precio_unitario": precio,
                "descuento_aplicado": 0.0,
                "duracion_minutos": seleccion.duracion,
            }));
        }

        let params = json!({
            "p_cliente_id": cliente.id,
            "p_empleado_id": request.empleado_id,
            "p_fecha_inicio": inicio.to_rfc3339(),
            "p_fecha_fin": fin.to_rfc3339(),
            "p_total": request.total,
            "p_servicios": lineas,
        });

        let respuesta: ReservaRpcRespuesta = self
            .supabase
            .rpc("reservar_cita", Some(auth_token), params)
            .await
            .map_err(map_reserva_error)?;

        // Step 8: post-commit side effect, never awaited here
        self.notificaciones.dispatch_background(
            respuesta.cita_id,
            TipoNotificacion::CitaCreada,
            Some(auth_token.to_string()),
        );

        info!(
            "Cita {} reservada para el cliente {} ({} - {})",
            respuesta.cita_id, cliente.id, inicio, fin
        );

        Ok(ReservaConfirmada {
            cita_id: respuesta.cita_id,
            fecha: fecha.format("%Y-%m-%d").to_string(),
            hora_inicio: format_minutes(slot.start_min),
            total: request.total,
        })
    }

    /// Cancel a cita. Owners cancel freely; staff cancelling someone
    /// else's cita must give a motivo. The lifecycle table rejects
    /// terminal states before anything is written.
    pub async fn cancelar_cita(
        &self,
        user: &User,
        cita_id: Uuid,
        request: CancelarCitaRequest,
        auth_token: &str,
    ) -> Result<Cita, BookingError> {
        let cita = self.get_cita(cita_id, auth_token).await?;
        self.lifecycle
            .validate_transition(cita.estado, EstadoCita::Cancelada)?;

        let actor = self.resolver_actor(user, &cita, auth_token).await?;
        let motivo = request
            .motivo
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        if actor != CanceladaPor::Cliente && motivo.is_none() {
            return Err(BookingError::Validation(
                "motivo es obligatorio al cancelar una cita ajena".to_string(),
            ));
        }

        let body = json!({
            "estado": EstadoCita::Cancelada,
            "cancelada_por": actor,
            "motivo_cancelacion": motivo,
        });
        let path = format!("/rest/v1/citas?id=eq.{}", cita_id);
        let rows: Vec<Cita> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(Self::prefer_representation()),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        let actualizada = rows.into_iter().next().ok_or(BookingError::CitaNotFound)?;

        self.notificaciones.dispatch_background(
            cita_id,
            TipoNotificacion::CitaCancelada,
            Some(auth_token.to_string()),
        );

        info!("Cita {} cancelada por {}", cita_id, actor);
        Ok(actualizada)
    }

    /// Caller-scoped listing with line items and payment stitched in. A
    /// user who never booked has no cliente row and gets an empty list.
    pub async fn mis_citas(
        &self,
        user: &User,
        orden: CitaOrden,
        auth_token: &str,
    ) -> Result<Vec<CitaDetalle>, BookingError> {
        let Some(cliente) = self
            .clientes
            .buscar_por_perfil(&user.id, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?
        else {
            return Ok(Vec::new());
        };

        let path = format!(
            "/rest/v1/citas?cliente_id=eq.{}&order={}",
            cliente.id,
            orden.as_query()
        );
        let citas: Vec<Cita> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        if citas.is_empty() {
            return Ok(Vec::new());
        }

        let lista = citas
            .iter()
            .map(|cita| cita.id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let servicios: Vec<CitaServicio> = self
            .supabase
            .request(
                Method::GET,
                &format!("/rest/v1/cita_servicios?cita_id=in.({})", lista),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        let pagos: Vec<Pago> = self
            .supabase
            .request(
                Method::GET,
                &format!("/rest/v1/pagos?cita_id=in.({})", lista),
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let mut servicios_por_cita: HashMap<Uuid, Vec<CitaServicio>> = HashMap::new();
        for linea in servicios {
            servicios_por_cita.entry(linea.cita_id).or_default().push(linea);
        }
        let mut pagos_por_cita: HashMap<Uuid, Pago> =
            pagos.into_iter().map(|pago| (pago.cita_id, pago)).collect();

        debug!("{} citas del cliente {}", citas.len(), cliente.id);

        Ok(citas
            .into_iter()
            .map(|cita| {
                let id = cita.id;
                CitaDetalle {
                    servicios: servicios_por_cita.remove(&id).unwrap_or_default(),
                    pago: pagos_por_cita.remove(&id),
                    cita,
                }
            })
            .collect())
    }

    pub async fn get_cita(&self, cita_id: Uuid, auth_token: &str) -> Result<Cita, BookingError> {
        let path = format!("/rest/v1/citas?id=eq.{}", cita_id);
        let rows: Vec<Cita> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        rows.into_iter().next().ok_or(BookingError::CitaNotFound)
    }

    fn validar_solicitud(
        &self,
        request: &ProcesarReservaRequest,
    ) -> Result<(NaiveDate, Slot), BookingError> {
        if request.servicios.is_empty() {
            return Err(BookingError::Validation(
                "debe seleccionar al menos un servicio".to_string(),
            ));
        }
        if request.servicios.len() > self.reglas.max_servicios_por_reserva {
            return Err(BookingError::Validation(format!(
                "una reserva admite como máximo {} servicios",
                self.reglas.max_servicios_por_reserva
            )));
        }
        for seleccion in &request.servicios {
            if seleccion.cantidad <= 0 || seleccion.duracion <= 0 {
                return Err(BookingError::Validation(
                    "cantidad y duración deben ser positivas".to_string(),
                ));
            }
        }
        if request.total < 0.0 {
            return Err(BookingError::Validation(
                "total no puede ser negativo".to_string(),
            ));
        }

        let fecha = NaiveDate::parse_from_str(&request.fecha, "%Y-%m-%d")
            .map_err(|_| BookingError::Validation("fecha inválida, se espera YYYY-MM-DD".to_string()))?;
        let inicio_min = minutes_from_midnight(&request.horario.inicio).ok_or_else(|| {
            BookingError::Validation("horario.inicio inválido, se espera HH:MM".to_string())
        })?;
        let slot = schedule::slot_que_inicia(fecha, inicio_min).ok_or_else(|| {
            BookingError::Validation(
                "horario.inicio no corresponde a un horario de la agenda".to_string(),
            )
        })?;

        Ok((fecha, slot))
    }

    fn duracion_total(&self, servicios: &[ServicioSeleccionado]) -> Result<i64, BookingError> {
        let total: i64 = servicios
            .iter()
            .map(|s| s.duracion as i64 * s.cantidad as i64)
            .sum();
        if total < self.reglas.duracion_minima_minutos as i64
            || total > self.reglas.duracion_maxima_minutos as i64
        {
            return Err(BookingError::Validation(format!(
                "la duración total debe estar entre {} y {} minutos",
                self.reglas.duracion_minima_minutos, self.reglas.duracion_maxima_minutos
            )));
        }
        Ok(total)
    }

    /// Ownership first: the cita's own cliente cancels as titular whatever
    /// their role. Everyone else needs a staff role.
    async fn resolver_actor(
        &self,
        user: &User,
        cita: &Cita,
        auth_token: &str,
    ) -> Result<CanceladaPor, BookingError> {
        let cliente = self
            .clientes
            .buscar_por_perfil(&user.id, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        if cliente.is_some_and(|c| c.id == cita.cliente_id) {
            return Ok(CanceladaPor::Cliente);
        }

        match user.role.as_deref() {
            Some("admin") => Ok(CanceladaPor::Admin),
            Some("empleado") => Ok(CanceladaPor::Empleado),
            _ => Err(BookingError::NoAutorizado(
                "solo el titular puede cancelar esta cita".to_string(),
            )),
        }
    }
}

fn map_staff_error(error: StaffError) -> BookingError {
    match error {
        StaffError::EmpleadoNotFound => BookingError::EmpleadoNotFound,
        other => BookingError::Database(other.to_string()),
    }
}

fn map_catalog_error(error: CatalogError) -> BookingError {
    match error {
        CatalogError::ServicioNotFound(id) => BookingError::ServicioInvalido(id),
        CatalogError::Database(msg) => BookingError::Database(msg),
    }
}

/// Map a `reservar_cita` failure. The function raises `empleado_ausente`
/// from its in-transaction absence check; the exclusion constraint
/// surfaces as a 409 (or as `cita_solapada` in the message).
fn map_reserva_error(error: SupabaseError) -> BookingError {
    if error.body_contains("empleado_ausente") {
        BookingError::EmpleadoAusente
    } else if error.is_conflict() || error.body_contains("cita_solapada") {
        BookingError::Solapamiento
    } else {
        BookingError::Database(error.to_string())
    }
}
