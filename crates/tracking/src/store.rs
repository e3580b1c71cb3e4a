//! Latest known position per vehicle.
//!
//! The map is owned by a single actor, so every upsert is applied atomically
//! and in mailbox order. Concurrent reports for the same vehicle race and the
//! last one to reach the mailbox wins. There is no versioning and no history.

use std::{any::Any, collections::HashMap};

use actors::{
    actor::{Actor, ActorError, SupervisionStrategy},
    actor_ref::ActorRef,
    handler::{Handler, Message},
};
use async_trait::async_trait;
use itertools::Itertools;
use model::{position::VehiclePosition, vehicle::Vehicle};
use utility::id::Id;

#[derive(Debug, Default)]
pub struct LocationStore {
    positions: HashMap<Id<Vehicle>, VehiclePosition>,
}

impl Actor for LocationStore {
    fn name(&self) -> &'static str {
        "location-store"
    }

    // keep the positions collected so far
    fn on_fail(&mut self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }
}

pub struct Upsert(pub VehiclePosition);

impl Message for Upsert {
    type Response = VehiclePosition;
}

pub struct Get(pub Id<Vehicle>);

impl Message for Get {
    type Response = Option<VehiclePosition>;
}

pub struct Snapshot;

impl Message for Snapshot {
    type Response = Vec<VehiclePosition>;
}

#[async_trait]
impl Handler<Upsert> for LocationStore {
    async fn handle(&mut self, Upsert(position): Upsert) -> VehiclePosition {
        self.positions
            .insert(position.vehicle_id.clone(), position.clone());
        position
    }
}

#[async_trait]
impl Handler<Get> for LocationStore {
    async fn handle(&mut self, Get(id): Get) -> Option<VehiclePosition> {
        self.positions.get(&id).cloned()
    }
}

#[async_trait]
impl Handler<Snapshot> for LocationStore {
    async fn handle(&mut self, _: Snapshot) -> Vec<VehiclePosition> {
        self.positions
            .values()
            .cloned()
            .sorted_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id))
            .collect()
    }
}

#[async_trait]
pub trait LocationStoreRef {
    /// Replaces the current position of the vehicle and returns what was stored.
    async fn upsert(&self, position: VehiclePosition) -> Result<VehiclePosition, ActorError>;

    async fn get(&self, id: Id<Vehicle>) -> Result<Option<VehiclePosition>, ActorError>;

    /// Every current position, ordered by vehicle id.
    async fn all(&self) -> Result<Vec<VehiclePosition>, ActorError>;
}

#[async_trait]
impl LocationStoreRef for ActorRef<LocationStore> {
    async fn upsert(&self, position: VehiclePosition) -> Result<VehiclePosition, ActorError> {
        self.ask(Upsert(position)).await
    }

    async fn get(&self, id: Id<Vehicle>) -> Result<Option<VehiclePosition>, ActorError> {
        self.ask(Get(id)).await
    }

    async fn all(&self) -> Result<Vec<VehiclePosition>, ActorError> {
        self.ask(Snapshot).await
    }
}
