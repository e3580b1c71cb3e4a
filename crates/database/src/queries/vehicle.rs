use model::{vehicle::Vehicle, WithId};
use sqlx::{Executor, Postgres};
use tracking::database::Result;
use utility::id::Id;

use crate::data_model::{with_id, with_ids, vehicle::VehicleRow};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Vehicle>) -> Result<WithId<Vehicle>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM vehicles WHERE id = $1;")
        .bind(id.as_str())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(|row: VehicleRow| with_id(row))
}

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<Vehicle>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<VehicleRow> =
        sqlx::query_as("SELECT * FROM vehicles ORDER BY bus_number ASC;")
            .fetch_all(executor)
            .await
            .map_err(convert_error)?;
    Ok(with_ids(rows))
}

pub async fn exists<'c, E>(executor: E, id: &Id<Vehicle>) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM vehicles WHERE id = $1);")
        .bind(id.as_str())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
}

pub async fn by_bus_number<'c, E>(
    executor: E,
    bus_number: &str,
) -> Result<Option<WithId<Vehicle>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM vehicles WHERE bus_number = $1;")
        .bind(bus_number)
        .fetch_optional(executor)
        .await
        .map_err(convert_error)
        .map(|row: Option<VehicleRow>| row.map(with_id))
}

/// Inserts a vehicle, letting the database generate the id if none is given.
pub async fn insert<'c, E>(
    executor: E,
    id: Option<Id<Vehicle>>,
    vehicle: Vehicle,
) -> Result<WithId<Vehicle>>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = match id {
        Some(id) => sqlx::query_as::<Postgres, VehicleRow>(
            "
            INSERT INTO vehicles(
                id,
                bus_number,
                capacity,
                driver,
                route,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
            ",
        )
        .bind(id.into_inner()),
        None => sqlx::query_as::<Postgres, VehicleRow>(
            "
            INSERT INTO vehicles(
                bus_number,
                capacity,
                driver,
                route,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
            ",
        ),
    };
    query
        .bind(vehicle.bus_number)
        .bind(vehicle.capacity)
        .bind(vehicle.driver)
        .bind(vehicle.route)
        .bind(vehicle.is_active)
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(|row: VehicleRow| with_id(row))
}
