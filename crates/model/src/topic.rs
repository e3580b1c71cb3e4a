use std::fmt;

use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::vehicle::Vehicle;

/// A channel subscribers join to scope delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    /// Every update, regardless of vehicle.
    All,
    Vehicle(Id<Vehicle>),
}

impl Topic {
    pub fn vehicle<I: Into<Id<Vehicle>>>(id: I) -> Self {
        Self::Vehicle(id.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Vehicle(id) => write!(f, "bus_{}", id),
        }
    }
}
