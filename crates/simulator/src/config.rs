use std::{env, time::Duration};

use crate::SimulatorError;

const API_URL: &str = "API_URL";
const VEHICLES: &str = "SIMULATOR_VEHICLES";
const INTERVAL: &str = "SIMULATOR_INTERVAL_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Base url of the versioned api, e.g. `http://localhost:8080/api/v1`.
    pub api_url: String,
    pub vehicles: Vec<String>,
    pub interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api/v1".to_owned(),
            vehicles: vec!["B1".to_owned(), "B2".to_owned(), "B3".to_owned()],
            interval: Duration::from_secs(3),
        }
    }
}

impl SimulatorConfig {
    pub fn from_env() -> Result<Self, SimulatorError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, SimulatorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL) {
            config.api_url = url.trim().trim_end_matches('/').to_owned();
        }
        if let Some(vehicles) = lookup(VEHICLES) {
            config.vehicles = vehicles
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
                .collect();
            if config.vehicles.is_empty() {
                return Err(SimulatorError::config(VEHICLES, vehicles));
            }
        }
        if let Some(interval) = lookup(INTERVAL) {
            match interval.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.interval = Duration::from_secs(secs),
                _ => return Err(SimulatorError::config(INTERVAL, interval)),
            }
        }
        Ok(config)
    }
}
