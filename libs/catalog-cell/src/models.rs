// libs/catalog-cell/src/models.rs
use serde::{Deserialize, Serialize};

// ==============================================================================
// CATALOG MODELS
// ==============================================================================

/// Service offered by the salon, as stored in `servicios`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Servicio {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: f64,
    pub duracion_minutos: i32,
    pub categoria_id: Option<i64>,
    pub activo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Categoria {
    pub id: i64,
    pub nombre: String,
    pub orden: i32,
}

/// Row shape the booking UI receives: a service plus its category name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicioCatalogo {
    pub id: i64,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub precio: f64,
    pub duracion_minutos: i32,
    pub categoria: Option<String>,
}

/// Orderings the catalog listing accepts. Query params map onto this
/// allow-list, so callers can never inject raw `order=` expressions into the
/// PostgREST request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServicioOrden {
    #[default]
    NombreAsc,
    PrecioAsc,
    PrecioDesc,
}

impl ServicioOrden {
    /// Map a query-string value to an ordering; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nombre_asc" => Some(ServicioOrden::NombreAsc),
            "precio_asc" => Some(ServicioOrden::PrecioAsc),
            "precio_desc" => Some(ServicioOrden::PrecioDesc),
            _ => None,
        }
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            ServicioOrden::NombreAsc => "nombre.asc",
            ServicioOrden::PrecioAsc => "precio.asc",
            ServicioOrden::PrecioDesc => "precio.desc",
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum CatalogError {
    #[error("Servicio {0} no encontrado o inactivo")]
    ServicioNotFound(i64),

    #[error("Error de base de datos: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orden_parses_known_values() {
        assert_eq!(
            ServicioOrden::parse("precio_asc"),
            Some(ServicioOrden::PrecioAsc)
        );
        assert_eq!(
            ServicioOrden::parse("precio_desc"),
            Some(ServicioOrden::PrecioDesc)
        );
        assert_eq!(
            ServicioOrden::parse("nombre_asc"),
            Some(ServicioOrden::NombreAsc)
        );
    }

    #[test]
    fn orden_rejects_raw_postgrest_expressions() {
        assert_eq!(ServicioOrden::parse("precio.desc,id.asc"), None);
        assert_eq!(ServicioOrden::parse("nombre.asc;drop table"), None);
        assert_eq!(ServicioOrden::parse(""), None);
    }

    #[test]
    fn orden_default_is_nombre_asc() {
        assert_eq!(ServicioOrden::default().as_query(), "nombre.asc");
    }

    #[test]
    fn servicio_deserializes_from_postgrest_row() {
        let row = serde_json::json!({
            "id": 3,
            "nombre": "Corte de pelo",
            "descripcion": "Corte y peinado",
            "precio": 18.5,
            "duracion_minutos": 30,
            "categoria_id": 1,
            "activo": true,
            "created_at": "2025-01-01T00:00:00Z"
        });

        let servicio: Servicio = serde_json::from_value(row).unwrap();
        assert_eq!(servicio.id, 3);
        assert_eq!(servicio.duracion_minutos, 30);
        assert!(servicio.activo);
    }
}
