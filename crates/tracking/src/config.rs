use std::{env, str::FromStr};

use thiserror::Error;

/// What to do with a position report for a vehicle the fleet store does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownVehiclePolicy {
    /// Answer with `NotFound` and drop the report.
    #[default]
    Reject,
    /// Store and broadcast the report anyway.
    Accept,
}

impl FromStr for UnknownVehiclePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "accept" => Ok(Self::Accept),
            _ => Err(ConfigError::invalid(UNKNOWN_VEHICLES, s)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for `{key}`")]
    Invalid { key: &'static str, value: String },
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(key: &'static str, value: S) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
        }
    }
}

const UNKNOWN_VEHICLES: &str = "TRACKING_UNKNOWN_VEHICLES";
const SUBSCRIBER_BUFFER: &str = "TRACKING_SUBSCRIBER_BUFFER";
const MAILBOX_CAPACITY: &str = "TRACKING_MAILBOX_CAPACITY";

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub unknown_vehicles: UnknownVehiclePolicy,
    /// Number of undelivered updates buffered per subscriber before further
    /// updates for that subscriber are dropped.
    pub subscriber_buffer: usize,
    /// Mailbox size of the store and registry actors.
    pub mailbox_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            unknown_vehicles: UnknownVehiclePolicy::default(),
            subscriber_buffer: 64,
            mailbox_capacity: actors::DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl TrackerConfig {
    /// Reads overrides from the environment, falling back to the defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(value) = env::var(UNKNOWN_VEHICLES) {
            config.unknown_vehicles = value.parse()?;
        }
        if let Some(buffer) = positive_from_env(SUBSCRIBER_BUFFER)? {
            config.subscriber_buffer = buffer;
        }
        if let Some(capacity) = positive_from_env(MAILBOX_CAPACITY)? {
            config.mailbox_capacity = capacity;
        }
        Ok(config)
    }
}

fn positive_from_env(key: &'static str) -> Result<Option<usize>, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
            _ => Err(ConfigError::invalid(key, value)),
        },
        Err(_) => Ok(None),
    }
}
