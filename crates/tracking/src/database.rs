use std::{error, result};

use async_trait::async_trait;
use model::{vehicle::Vehicle, WithId};
use thiserror::Error;
use utility::id::Id;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("not found")]
    NotFound,
    /// A unique constraint was violated. Carries a human readable description.
    #[error("{0}")]
    Duplicate(String),
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

pub type Result<T> = result::Result<T, DatabaseError>;

/// Bus records. The record store owns these; the tracking core only reads them
/// to check that a reporting vehicle exists.
#[async_trait]
pub trait VehicleRepo {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>>;

    /// All vehicles ordered by bus number.
    async fn get_vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>>;

    async fn vehicle_exists(&mut self, id: &Id<Vehicle>) -> Result<bool>;

    async fn vehicle_by_bus_number(
        &mut self,
        bus_number: &str,
    ) -> Result<Option<WithId<Vehicle>>>;

    /// Inserts a vehicle. If `id` is `None`, the store generates one.
    ///
    /// Fails with `DatabaseError::Duplicate` if the id or the bus number is taken.
    async fn insert_vehicle(
        &mut self,
        id: Option<Id<Vehicle>>,
        vehicle: Vehicle,
    ) -> Result<WithId<Vehicle>>;
}

pub trait DatabaseOperations: VehicleRepo {}

impl<T: VehicleRepo> DatabaseOperations for T {}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// trait to implement a fleet database.
/// multiple concurrent accesses should be possible by e.g. cloning the database object.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseAutocommit + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}
