//! Validation of incoming position reports.
//!
//! Reports arrive as loosely typed JSON from devices and simulators. Field
//! names of older senders (`busId`, `timestamp`) are accepted as aliases.

use model::position::PositionReport;
use serde_json::{Map, Value};
use thiserror::Error;
use utility::{
    id::Id,
    serde::{coerce, date_time},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The request body must be a JSON object.")]
    NotAnObject,
    #[error("The request body is not valid JSON: {0}")]
    MalformedBody(String),
    #[error("`{0}` is required.")]
    Missing(&'static str),
    #[error("`{field}` {expected}.")]
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
}

const VEHICLE_ID: (&str, &str) = ("vehicleId", "busId");
const OBSERVED_AT: (&str, &str) = ("observedAt", "timestamp");

/// Returns the value of `name` or its alias, treating `null` as absent.
fn field<'a>(object: &'a Map<String, Value>, (name, alias): (&str, &str)) -> Option<&'a Value> {
    object
        .get(name)
        .or_else(|| object.get(alias))
        .filter(|value| !value.is_null())
}

fn coordinate(
    object: &Map<String, Value>,
    name: &'static str,
) -> Result<f64, ValidationError> {
    let value = field(object, (name, name)).ok_or(ValidationError::Missing(name))?;
    coerce::to_f64(value).ok_or(ValidationError::Invalid {
        field: name,
        expected: "must be a finite number",
    })
}

/// Turns a JSON body into a typed report.
///
/// No range check is applied to the coordinates.
pub fn validate(body: &Value) -> Result<PositionReport, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let vehicle_id = field(object, VEHICLE_ID)
        .ok_or(ValidationError::Missing(VEHICLE_ID.0))
        .and_then(|value| {
            coerce::to_id(value).ok_or(ValidationError::Invalid {
                field: VEHICLE_ID.0,
                expected: "must be a non-empty string",
            })
        })?;
    let latitude = coordinate(object, "latitude")?;
    let longitude = coordinate(object, "longitude")?;

    let observed_at = match field(object, OBSERVED_AT) {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(date_time::parse_rfc3339(s).map_err(|_| {
            ValidationError::Invalid {
                field: OBSERVED_AT.0,
                expected: "must be an RFC 3339 timestamp",
            }
        })?),
        Some(_) => {
            return Err(ValidationError::Invalid {
                field: OBSERVED_AT.0,
                expected: "must be an RFC 3339 timestamp",
            })
        }
    };

    Ok(PositionReport {
        vehicle_id: Id::new(vehicle_id),
        latitude,
        longitude,
        observed_at,
    })
}
