use chrono::Utc;
use config::SimulatorConfig;
use futures::future::join_all;
use model::position::PositionReport;
use rand::Rng;
use route::{RouteWalker, CHENNAI};
use sender::ReportSender;
use thiserror::Error;
use tokio::time;
use utility::id::Id;

mod config;
mod route;
mod sender;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("invalid value `{value}` for `{key}`")]
    Config { key: &'static str, value: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("rejected with {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error(transparent)]
    Env(#[from] dotenvy::Error),
}

impl SimulatorError {
    pub fn config<S: Into<String>>(key: &'static str, value: S) -> Self {
        Self::Config {
            key,
            value: value.into(),
        }
    }
}

struct Bus {
    id: String,
    walker: RouteWalker<'static>,
}

impl Bus {
    fn next_report<R: Rng + ?Sized>(&mut self, rng: &mut R) -> PositionReport {
        let (latitude, longitude) = self.walker.step(rng);
        PositionReport {
            vehicle_id: Id::new(self.id.clone()),
            latitude,
            longitude,
            observed_at: Some(Utc::now()),
        }
    }
}

/// Failures are logged, the simulation keeps going.
async fn send(sender: &ReportSender, report: &PositionReport) {
    match sender.send(report).await {
        Ok(()) => log::info!(
            "updated location for bus {}: {:.4}, {:.4}",
            report.vehicle_id,
            report.latitude,
            report.longitude
        ),
        Err(why) => log::error!(
            "could not send location for bus {}: {}",
            report.vehicle_id,
            why
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), SimulatorError> {
    if let Err(why) = dotenvy::dotenv() {
        if !why.not_found() {
            return Err(why.into());
        }
    }
    env_logger::init();

    let config = SimulatorConfig::from_env()?;
    let sender = ReportSender::new(&config.api_url);
    let mut buses = config
        .vehicles
        .iter()
        .enumerate()
        .filter_map(|(i, id)| {
            // spread buses over the route
            RouteWalker::new(&CHENNAI, i).map(|walker| Bus {
                id: id.clone(),
                walker,
            })
        })
        .collect::<Vec<_>>();
    log::info!(
        "simulating buses {} (set SIMULATOR_VEHICLES to change), posting to {} every {:?}",
        config.vehicles.join(", "),
        sender.endpoint(),
        config.interval
    );

    let mut ticks = time::interval(config.interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let reports = {
                    let mut rng = rand::rng();
                    buses
                        .iter_mut()
                        .map(|bus| bus.next_report(&mut rng))
                        .collect::<Vec<_>>()
                };
                join_all(reports.iter().map(|report| send(&sender, report))).await;
            }
            _ = &mut shutdown => {
                log::info!("stopping gps simulation");
                break;
            }
        }
    }
    Ok(())
}
