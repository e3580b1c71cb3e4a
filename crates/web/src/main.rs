use std::error::Error;

use database::{DatabaseConnectionInfo, PgDatabase};
use itertools::Itertools;
use tracking::{
    config::TrackerConfig,
    database::Database,
    memory::{MemoryDatabase, DEMO_FLEET},
    server::Server,
};
use web::{config::WebConfig, start_web_server, WebState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if let Err(why) = dotenvy::dotenv() {
        if !why.not_found() {
            return Err(why.into());
        }
    }
    env_logger::init();

    let tracker_config = TrackerConfig::from_env()?;
    let web_config = WebConfig::from_env()?;

    // database
    match DatabaseConnectionInfo::from_env() {
        Some(database_connection_info) => {
            let database = PgDatabase::connect(database_connection_info).await?;
            serve(database, tracker_config, web_config).await?;
        }
        None => {
            log::warn!(
                "no database configured, bus records are kept in memory only \
                 (seeded demo buses {})",
                DEMO_FLEET.iter().map(|(id, _, _)| id).join(", ")
            );
            serve(MemoryDatabase::demo(), tracker_config, web_config).await?;
        }
    }
    Ok(())
}

async fn serve<D: Database>(
    database: D,
    tracker_config: TrackerConfig,
    web_config: WebConfig,
) -> std::io::Result<()> {
    // server
    let server = Server::new(database, tracker_config);

    // web server
    start_web_server(
        WebState {
            tracking_client: server.client("REST API"),
        },
        web_config,
    )
    .await
}
