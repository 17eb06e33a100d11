// libs/reservation-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{BookingError, EstadoCita};

/// Transition table for `citas.estado`. Cancellation goes through here, as
/// will any future confirm/complete operation.
pub struct CitaLifecycleService;

impl CitaLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_transition(
        &self,
        actual: EstadoCita,
        siguiente: EstadoCita,
    ) -> Result<(), BookingError> {
        debug!("Validando transición {} -> {}", actual, siguiente);

        if !self.transiciones_validas(actual).contains(&siguiente) {
            warn!("Transición rechazada: {} -> {}", actual, siguiente);
            return Err(BookingError::TransicionInvalida(actual));
        }

        Ok(())
    }

    pub fn transiciones_validas(&self, actual: EstadoCita) -> &'static [EstadoCita] {
        match actual {
            EstadoCita::Pendiente => &[
                EstadoCita::Confirmada,
                EstadoCita::Cancelada,
                EstadoCita::NoAsistio,
            ],
            EstadoCita::Confirmada => &[
                EstadoCita::Completada,
                EstadoCita::Cancelada,
                EstadoCita::NoAsistio,
            ],
            // Terminal states admit nothing
            EstadoCita::Completada | EstadoCita::Cancelada | EstadoCita::NoAsistio => &[],
        }
    }
}

impl Default for CitaLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
