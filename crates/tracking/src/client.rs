use actors::actor_ref::ActorRef;
use chrono::Utc;
use model::{
    position::{LocationUpdate, PositionReport, VehiclePosition},
    topic::Topic,
    vehicle::Vehicle,
    WithId,
};
use serde_json::Value;
use utility::id::Id;

use crate::{
    broadcast::Broadcaster,
    config::UnknownVehiclePolicy,
    database::{Database, DatabaseTransaction, VehicleRepo},
    ingest::{self, ValidationError},
    registry::{RegistryStats, Session, Stats, SubscriberRegistry},
    store::{LocationStore, LocationStoreRef},
    RequestError, RequestResult,
};

/// Entry point for one consumer of the tracker (a web server, a test, ...).
#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    id: String,
    pub database: D,
    store: ActorRef<LocationStore>,
    registry: ActorRef<SubscriberRegistry>,
    unknown_vehicles: UnknownVehiclePolicy,
}

impl<D> Client<D>
where
    D: Database,
{
    pub(crate) fn new<S>(
        id: S,
        database: D,
        store: ActorRef<LocationStore>,
        registry: ActorRef<SubscriberRegistry>,
        unknown_vehicles: UnknownVehiclePolicy,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            id: id.into(),
            database,
            store,
            registry,
            unknown_vehicles,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn broadcaster(&self) -> Broadcaster {
        Broadcaster::new(self.registry.clone())
    }
}

/// Location tracking.
impl<D> Client<D>
where
    D: Database,
{
    /// Validates a raw report and ingests it.
    pub async fn report_position(&self, body: &Value) -> RequestResult<VehiclePosition> {
        let report = ingest::validate(body)?;
        self.ingest(report).await
    }

    /// Stores the report as the vehicle's current position and publishes it.
    ///
    /// Returns after the update was handed to every subscriber's buffer. A
    /// broadcast failure is logged and does not fail the report.
    pub async fn ingest(&self, report: PositionReport) -> RequestResult<VehiclePosition> {
        for (field, value) in [("latitude", report.latitude), ("longitude", report.longitude)] {
            if !value.is_finite() {
                return Err(ValidationError::Invalid {
                    field,
                    expected: "must be a finite number",
                }
                .into());
            }
        }
        if self.unknown_vehicles == UnknownVehiclePolicy::Reject
            && !self
                .database
                .auto()
                .vehicle_exists(&report.vehicle_id)
                .await?
        {
            return Err(RequestError::not_found(format!(
                "Vehicle `{}` does not exist.",
                report.vehicle_id
            )));
        }

        let stored = self.store.upsert(report.into_position(Utc::now())).await?;
        let topic = Topic::vehicle(stored.vehicle_id.clone());
        match self
            .broadcaster()
            .publish(topic, LocationUpdate::from(stored.clone()))
            .await
        {
            Ok(delivery) => log::debug!(
                "[{}] position of {} delivered to {} subscribers ({} dropped)",
                self.id,
                stored.vehicle_id,
                delivery.delivered,
                delivery.dropped
            ),
            Err(why) => log::error!(
                "[{}] failed to broadcast position of {}: {}",
                self.id,
                stored.vehicle_id,
                why
            ),
        }
        Ok(stored)
    }

    pub async fn get_position(&self, id: Id<Vehicle>) -> RequestResult<VehiclePosition> {
        self.store.get(id.clone()).await?.ok_or_else(|| {
            RequestError::not_found(format!("No location reported for vehicle `{}`.", id))
        })
    }

    pub async fn get_positions(&self) -> RequestResult<Vec<VehiclePosition>> {
        Ok(self.store.all().await?)
    }

    /// Opens a subscriber connection with no subscriptions.
    pub async fn connect(&self) -> RequestResult<Session> {
        Ok(Session::open(&self.registry).await?)
    }

    pub async fn registry_stats(&self) -> RequestResult<RegistryStats> {
        Ok(self.registry.ask(Stats).await?)
    }
}

/// Fleet records.
impl<D> Client<D>
where
    D: Database,
{
    pub async fn get_vehicles(&self) -> RequestResult<Vec<WithId<Vehicle>>> {
        Ok(self.database.auto().get_vehicles().await?)
    }

    pub async fn get_vehicle(&self, id: &Id<Vehicle>) -> RequestResult<WithId<Vehicle>> {
        self.database
            .auto()
            .get_vehicle(id)
            .await
            .map_err(|why| match RequestError::from(why) {
                RequestError::NotFound(_) => {
                    RequestError::not_found(format!("Vehicle `{}` does not exist.", id))
                }
                other => other,
            })
    }

    /// Registers a new bus. Fails with `Conflict` if the bus number is taken.
    ///
    /// A given id is trimmed the same way reported vehicle ids are, so the bus
    /// can be reported under it afterwards.
    pub async fn create_vehicle(
        &self,
        id: Option<Id<Vehicle>>,
        mut vehicle: Vehicle,
    ) -> RequestResult<WithId<Vehicle>> {
        let id = match id {
            Some(id) => match id.as_str().trim() {
                "" => {
                    return Err(ValidationError::Invalid {
                        field: "id",
                        expected: "must be a non-empty string",
                    }
                    .into())
                }
                trimmed => Some(Id::new(trimmed.to_owned())),
            },
            None => None,
        };
        vehicle.bus_number = vehicle.bus_number.trim().to_owned();
        if vehicle.bus_number.is_empty() {
            return Err(ValidationError::Missing("busNumber").into());
        }
        if vehicle.capacity < 1 {
            return Err(ValidationError::Invalid {
                field: "capacity",
                expected: "must be at least 1",
            }
            .into());
        }

        let mut tx = self.database.transaction().await?;
        if tx.vehicle_by_bus_number(&vehicle.bus_number).await?.is_some() {
            return Err(RequestError::Conflict(format!(
                "Bus number `{}` already exists.",
                vehicle.bus_number
            )));
        }
        let created = tx.insert_vehicle(id, vehicle).await?;
        tx.commit().await?;
        log::info!(
            "[{}] registered bus {} as {}",
            self.id,
            created.content.bus_number,
            created.id
        );
        Ok(created)
    }
}
