use std::{env, error::Error};

use async_trait::async_trait;
use model::{vehicle::Vehicle, WithId};
use queries::convert_error;
use sqlx::Transaction;
use tracking::database::{
    Database, DatabaseAutocommit, DatabaseTransaction, Result, VehicleRepo,
};
use utility::id::Id;

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl DatabaseAutocommit for PgDatabaseAutocommit {}

impl PgDatabase {
    /// Connects and runs the embedded migrations.
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> core::result::Result<Self, Box<dyn Error>> {
        log::info!(
            "connecting to postgres at {}:{}/{}",
            database_connection_info.hostname,
            database_connection_info.port,
            database_connection_info.database
        );
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx: Transaction<'_, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction { tx })
    }
}

#[async_trait]
impl VehicleRepo for PgDatabaseAutocommit {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        queries::vehicle::get(&self.pool, id).await
    }

    async fn get_vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>> {
        queries::vehicle::get_all(&self.pool).await
    }

    async fn vehicle_exists(&mut self, id: &Id<Vehicle>) -> Result<bool> {
        queries::vehicle::exists(&self.pool, id).await
    }

    async fn vehicle_by_bus_number(
        &mut self,
        bus_number: &str,
    ) -> Result<Option<WithId<Vehicle>>> {
        queries::vehicle::by_bus_number(&self.pool, bus_number).await
    }

    async fn insert_vehicle(
        &mut self,
        id: Option<Id<Vehicle>>,
        vehicle: Vehicle,
    ) -> Result<WithId<Vehicle>> {
        queries::vehicle::insert(&self.pool, id, vehicle).await
    }
}

#[async_trait]
impl<'a> VehicleRepo for PgDatabaseTransaction<'a> {
    async fn get_vehicle(&mut self, id: &Id<Vehicle>) -> Result<WithId<Vehicle>> {
        queries::vehicle::get(&mut *self.tx, id).await
    }

    async fn get_vehicles(&mut self) -> Result<Vec<WithId<Vehicle>>> {
        queries::vehicle::get_all(&mut *self.tx).await
    }

    async fn vehicle_exists(&mut self, id: &Id<Vehicle>) -> Result<bool> {
        queries::vehicle::exists(&mut *self.tx, id).await
    }

    async fn vehicle_by_bus_number(
        &mut self,
        bus_number: &str,
    ) -> Result<Option<WithId<Vehicle>>> {
        queries::vehicle::by_bus_number(&mut *self.tx, bus_number).await
    }

    async fn insert_vehicle(
        &mut self,
        id: Option<Id<Vehicle>>,
        vehicle: Vehicle,
    ) -> Result<WithId<Vehicle>> {
        queries::vehicle::insert(&mut *self.tx, id, vehicle).await
    }
}
