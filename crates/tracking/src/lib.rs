use actors::actor::ActorError;
use thiserror::Error;

pub mod broadcast;
pub mod client;
pub mod config;
pub mod database;
pub mod ingest;
pub mod memory;
pub mod registry;
pub mod server;
pub mod store;

pub use ingest::ValidationError;

#[derive(Debug, Error)]
pub enum RequestError {
    /// Malformed or missing input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    /// The request collides with existing data, e.g. a duplicate bus number.
    #[error("{0}")]
    Conflict(String),
    #[error("database failure: {0}")]
    Database(database::DatabaseError),
    /// A store or registry actor is gone.
    #[error("actor failure: {0}")]
    Actor(#[from] ActorError),
}

impl RequestError {
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => {
                Self::NotFound("The requested item does not exist.".to_owned())
            }
            database::DatabaseError::Duplicate(what) => Self::Conflict(what),
            other => Self::Database(other),
        }
    }
}

impl From<registry::SubscriptionError> for RequestError {
    fn from(value: registry::SubscriptionError) -> Self {
        Self::NotFound(value.to_string())
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

pub fn not_found_to_none<O>(result: RequestResult<O>) -> RequestResult<Option<O>> {
    match result {
        Err(RequestError::NotFound(_)) => Ok(None),
        other => other.map(Some),
    }
}
