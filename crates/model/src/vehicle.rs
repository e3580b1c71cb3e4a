use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

/// A tracked bus.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub bus_number: String,
    pub capacity: i32,
    /// Reference to the assigned driver, owned by the user directory.
    pub driver: Option<String>,
    /// Reference to the assigned route.
    pub route: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl HasId for Vehicle {
    type IdType = String;
}

impl Vehicle {
    pub fn new<S: Into<String>>(bus_number: S, capacity: i32) -> Self {
        Self {
            bus_number: bus_number.into(),
            capacity,
            driver: None,
            route: None,
            is_active: true,
        }
    }
}

impl ExampleData for Vehicle {
    fn example_data() -> Self {
        Self {
            bus_number: "TN-01-AB-1234".to_owned(),
            capacity: 48,
            driver: Some("driver-17".to_owned()),
            route: Some("route-guindy-velachery".to_owned()),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Vehicle;

    #[test]
    fn is_active_defaults_to_true() {
        let vehicle: Vehicle =
            serde_json::from_value(json!({ "busNumber": "7", "capacity": 40 }))
                .unwrap();
        assert!(vehicle.is_active);
        assert_eq!(vehicle.driver, None);
    }

    #[test]
    fn omits_missing_references() {
        let value = serde_json::to_value(Vehicle::new("7", 40)).unwrap();
        assert_eq!(
            value,
            json!({ "busNumber": "7", "capacity": 40, "isActive": true })
        );
    }
}
