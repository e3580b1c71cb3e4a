use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{vehicle::Vehicle, ExampleData};

/// A single GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Time of the fix as reported by the device, or the time of receipt if
    /// the device did not send one.
    pub observed_at: DateTime<Utc>,
}

/// The latest known position of a vehicle.
///
/// Serializes as `{ "vehicleId": .., "location": { .. } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePosition {
    pub vehicle_id: Id<Vehicle>,
    pub location: Position,
}

impl VehiclePosition {
    pub fn new(vehicle_id: Id<Vehicle>, location: Position) -> Self {
        Self {
            vehicle_id,
            location,
        }
    }
}

/// A validated position report, as accepted by the ingest endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub vehicle_id: Id<Vehicle>,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

impl PositionReport {
    /// Resolves the report into a position, stamping it with `received_at`
    /// if the device did not report a time.
    pub fn into_position(self, received_at: DateTime<Utc>) -> VehiclePosition {
        VehiclePosition::new(
            self.vehicle_id,
            Position {
                latitude: self.latitude,
                longitude: self.longitude,
                observed_at: self.observed_at.unwrap_or(received_at),
            },
        )
    }
}

impl ExampleData for PositionReport {
    fn example_data() -> Self {
        Self {
            vehicle_id: Id::from("B1"),
            latitude: 13.0827,
            longitude: 80.2707,
            observed_at: Utc.with_ymd_and_hms(2024, 7, 1, 7, 45, 0).single(),
        }
    }
}

/// Payload of the `locationUpdate` event pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub vehicle_id: Id<Vehicle>,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

impl LocationUpdate {
    pub const EVENT_NAME: &'static str = "locationUpdate";
}

impl From<VehiclePosition> for LocationUpdate {
    fn from(value: VehiclePosition) -> Self {
        Self {
            vehicle_id: value.vehicle_id,
            latitude: value.location.latitude,
            longitude: value.location.longitude,
            observed_at: value.location.observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use utility::id::Id;

    use super::{LocationUpdate, PositionReport, VehiclePosition};

    #[test]
    fn missing_observation_time_falls_back_to_receipt() {
        let received = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let report = PositionReport {
            vehicle_id: Id::from("B1"),
            latitude: 13.08,
            longitude: 80.27,
            observed_at: None,
        };
        let position = report.into_position(received);
        assert_eq!(position.location.observed_at, received);
    }

    #[test]
    fn position_and_event_wire_shapes() {
        let observed = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let position = PositionReport {
            vehicle_id: Id::from("B1"),
            latitude: 13.08,
            longitude: 80.27,
            observed_at: Some(observed),
        }
        .into_position(observed);

        assert_eq!(
            serde_json::to_value(&position).unwrap(),
            json!({
                "vehicleId": "B1",
                "location": {
                    "latitude": 13.08,
                    "longitude": 80.27,
                    "observedAt": "2024-01-01T12:00:00Z"
                }
            })
        );

        let update = LocationUpdate::from(position.clone());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "vehicleId": "B1",
                "latitude": 13.08,
                "longitude": 80.27,
                "observedAt": "2024-01-01T12:00:00Z"
            })
        );

        let back: VehiclePosition =
            serde_json::from_value(serde_json::to_value(&position).unwrap()).unwrap();
        assert_eq!(back, position);
    }
}
