use chrono::{DateTime, Utc};
use model::vehicle::Vehicle;
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct VehicleRow {
    pub id: String,
    pub bus_number: String,
    pub capacity: i32,
    pub driver: Option<String>,
    pub route: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DatabaseRow for VehicleRow {
    type Model = Vehicle;

    fn get_id(&self) -> Id<Vehicle> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Vehicle {
        Vehicle {
            bus_number: self.bus_number,
            capacity: self.capacity,
            driver: self.driver,
            route: self.route,
            is_active: self.is_active,
        }
    }
}
