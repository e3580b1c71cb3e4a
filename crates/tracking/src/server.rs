use actors::actor_ref::ActorRef;

use crate::{
    client::Client,
    config::TrackerConfig,
    database::Database,
    registry::SubscriberRegistry,
    store::LocationStore,
};

/// Owns the fleet database and the store and registry actors. Every client
/// handed out shares them.
pub struct Server<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    database: D,
    config: TrackerConfig,
    store: ActorRef<LocationStore>,
    registry: ActorRef<SubscriberRegistry>,
}

impl<D> Server<D>
where
    D: Database,
{
    /// Spawns the actors, so this must be called from within a tokio runtime.
    pub fn new(database: D, config: TrackerConfig) -> Self {
        let store = actors::run_with_capacity(config.mailbox_capacity, LocationStore::default);
        let buffer = config.subscriber_buffer;
        let registry = actors::run_with_capacity(config.mailbox_capacity, move || {
            SubscriberRegistry::new(buffer)
        });
        log::info!(
            "tracker started (unknown vehicles: {:?}, subscriber buffer: {})",
            config.unknown_vehicles,
            config.subscriber_buffer
        );
        Self {
            database,
            config,
            store,
            registry,
        }
    }

    pub fn client<S: Into<String>>(&self, id: S) -> Client<D> {
        Client::new(
            id,
            self.database.clone(),
            self.store.clone(),
            self.registry.clone(),
            self.config.unknown_vehicles,
        )
    }
}
