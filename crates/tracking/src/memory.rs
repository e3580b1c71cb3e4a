//! An in-process fleet database, used for development and tests.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use itertools::Itertools;
use model::{vehicle::Vehicle, WithId};
use tokio::sync::RwLock;
use utility::id::Id;
use uuid::Uuid;

use crate::database::{
    Database, DatabaseAutocommit, DatabaseError, DatabaseTransaction, Result, VehicleRepo,
};

type Vehicles = BTreeMap<String, Vehicle>;

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    vehicles: Arc<RwLock<Vehicles>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// A database pre-filled with the given vehicles.
    pub fn with_vehicles<I, S>(vehicles: I) -> Self
    where
        I: IntoIterator<Item = (S, Vehicle)>,
        S: Into<String>,
    {
        let vehicles = vehicles
            .into_iter()
            .map(|(id, vehicle)| (id.into(), vehicle))
            .collect();
        Self {
            vehicles: Arc::new(RwLock::new(vehicles)),
        }
    }
}

/// Ids, bus numbers and capacities of the demo fleet.
pub const DEMO_FLEET: [(&str, &str, i32); 3] = [
    ("B1", "101", 40),
    ("B2", "102", 40),
    ("B3", "103", 52),
];

impl MemoryDatabase {
    /// A database holding [`DEMO_FLEET`], the buses the simulator reports for
    /// by default.
    pub fn demo() -> Self {
        Self::with_vehicles(DEMO_FLEET.map(|(id, bus_number, capacity)| {
            (id, Vehicle::new(bus_number, capacity))
        }))
    }
}

fn check_unique(
    vehicles: &Vehicles,
    pending: &[(String, Vehicle)],
    id: &str,
    vehicle: &Vehicle,
) -> Result<()> {
    let mut all = vehicles
        .iter()
        .map(|(id, vehicle)| (id.as_str(), vehicle))
        .chain(pending.iter().map(|(id, vehicle)| (id.as_str(), vehicle)));
    if let Some((existing, _)) = all.find(|(existing, other)| {
        *existing == id || other.bus_number == vehicle.bus_number
    }) {
        return Err(DatabaseError::Duplicate(if existing == id {
            format!("Vehicle id `{}` already exists", id)
        } else {
            format!("Bus number `{}` already exists", vehicle.bus_number)
        }));
    }
    Ok(())
}

fn with_id((id, vehicle): (&String, &Vehicle)) -> WithId<Vehicle> {
    WithId::new(Id::new(id.clone()), vehicle.clone())
}

fn sorted(vehicles: impl Iterator<Item = WithId<Vehicle>>) -> Vec<WithId<Vehicle>> {
    vehicles
        .sorted_by(|a, b| a.content.bus_number.cmp(&b.content.bus_number))
        .collect()
}

fn generate_id(id: Option<Id<Vehicle>>) -> String {
    id.map(Id::into_inner)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

pub struct MemoryAutocommit {
    vehicles: Arc<RwLock<Vehicles>>,
}

impl DatabaseAutocommit for MemoryAutocommit {}

#[async_trait]
impl VehicleRepo for MemoryAutocommit {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        self.vehicles
            .read()
            .await
            .get_key_value(id.as_str())
            .map(with_id)
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>> {
        Ok(sorted(self.vehicles.read().await.iter().map(with_id)))
    }

    async fn vehicle_exists(&mut self, id: &Id<Vehicle>) -> Result<bool> {
        Ok(self.vehicles.read().await.contains_key(id.as_str()))
    }

    async fn vehicle_by_bus_number(
        &mut self,
        bus_number: &str,
    ) -> Result<Option<WithId<Vehicle>>> {
        Ok(self
            .vehicles
            .read()
            .await
            .iter()
            .find(|(_, vehicle)| vehicle.bus_number == bus_number)
            .map(with_id))
    }

    async fn insert_vehicle(
        &mut self,
        id: Option<Id<Vehicle>>,
        vehicle: Vehicle,
    ) -> Result<WithId<Vehicle>> {
        let id = generate_id(id);
        let mut vehicles = self.vehicles.write().await;
        check_unique(&vehicles, &[], &id, &vehicle)?;
        vehicles.insert(id.clone(), vehicle.clone());
        Ok(WithId::new(Id::new(id), vehicle))
    }
}

/// Buffers inserts until `commit`. Reads see committed data plus the buffer.
pub struct MemoryTransaction {
    vehicles: Arc<RwLock<Vehicles>>,
    pending: Vec<(String, Vehicle)>,
}

#[async_trait]
impl VehicleRepo for MemoryTransaction {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        if let Some(found) = self.pending.iter().find(|(pending, _)| pending == id.as_str())
        {
            return Ok(with_id((&found.0, &found.1)));
        }
        self.vehicles
            .read()
            .await
            .get_key_value(id.as_str())
            .map(with_id)
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>> {
        let vehicles = self.vehicles.read().await;
        Ok(sorted(
            vehicles
                .iter()
                .chain(self.pending.iter().map(|(id, vehicle)| (id, vehicle)))
                .map(with_id),
        ))
    }

    async fn vehicle_exists(&mut self, id: &Id<Vehicle>) -> Result<bool> {
        Ok(self.pending.iter().any(|(pending, _)| pending == id.as_str())
            || self.vehicles.read().await.contains_key(id.as_str()))
    }

    async fn vehicle_by_bus_number(
        &mut self,
        bus_number: &str,
    ) -> Result<Option<WithId<Vehicle>>> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles
            .iter()
            .chain(self.pending.iter().map(|(id, vehicle)| (id, vehicle)))
            .find(|(_, vehicle)| vehicle.bus_number == bus_number)
            .map(with_id))
    }

    async fn insert_vehicle(
        &mut self,
        id: Option<Id<Vehicle>>,
        vehicle: Vehicle,
    ) -> Result<WithId<Vehicle>> {
        let id = generate_id(id);
        check_unique(&*self.vehicles.read().await, &self.pending, &id, &vehicle)?;
        self.pending.push((id.clone(), vehicle.clone()));
        Ok(WithId::new(Id::new(id), vehicle))
    }
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let mut vehicles = self.vehicles.write().await;
        // another transaction may have committed in between
        for (id, vehicle) in self.pending.iter() {
            check_unique(&vehicles, &[], id, vehicle)?;
        }
        vehicles.extend(self.pending);
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;
    type Autocommit = MemoryAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        Ok(MemoryTransaction {
            vehicles: self.vehicles.clone(),
            pending: vec![],
        })
    }

    fn auto(&self) -> Self::Autocommit {
        MemoryAutocommit {
            vehicles: self.vehicles.clone(),
        }
    }
}
