//! Which connection listens to which topic.
//!
//! The registry actor is the only owner of subscription entries. A connection
//! moves through `Connected -> Subscribed(topic)* -> Disconnected`; once
//! disconnected its id is never reused and further subscription requests fail.

use std::{
    any::Any,
    collections::{HashMap, HashSet},
};

use actors::{
    actor::{Actor, ActorError, SupervisionStrategy},
    actor_ref::ActorRef,
    handler::{Handler, Message},
};
use async_trait::async_trait;
use model::{position::LocationUpdate, topic::Topic};
use thiserror::Error;
use tokio::sync::mpsc;
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::RequestResult;

/// A live client connection.
pub struct Connection;

impl HasId for Connection {
    type IdType = Uuid;
}

pub type ConnectionId = Id<Connection>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("connection {0} is not connected")]
    UnknownConnection(ConnectionId),
}

pub(crate) struct Subscriber {
    pub(crate) sender: mpsc::Sender<LocationUpdate>,
    pub(crate) topics: HashSet<Topic>,
}

pub struct SubscriberRegistry {
    pub(crate) subscribers: HashMap<ConnectionId, Subscriber>,
    pub(crate) rooms: HashMap<Topic, HashSet<ConnectionId>>,
    buffer: usize,
}

impl SubscriberRegistry {
    /// `buffer` is the number of undelivered updates kept per connection.
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            rooms: HashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Connections that should receive a publish to `topic`, each listed once.
    pub(crate) fn recipients(&self, topic: &Topic) -> HashSet<ConnectionId> {
        let mut recipients = HashSet::new();
        for room in [Some(topic), (!topic.is_all()).then_some(&Topic::All)]
            .into_iter()
            .flatten()
        {
            if let Some(members) = self.rooms.get(room) {
                recipients.extend(members.iter().copied());
            }
        }
        recipients
    }

    pub(crate) fn remove(&mut self, id: &ConnectionId) -> bool {
        let Some(subscriber) = self.subscribers.remove(id) else {
            return false;
        };
        for topic in subscriber.topics {
            self.leave_room(&topic, id);
        }
        true
    }

    fn leave_room(&mut self, topic: &Topic, id: &ConnectionId) {
        if let Some(members) = self.rooms.get_mut(topic) {
            members.remove(id);
            if members.is_empty() {
                self.rooms.remove(topic);
            }
        }
    }
}

impl Actor for SubscriberRegistry {
    fn name(&self) -> &'static str {
        "subscriber-registry"
    }

    // restarting would orphan every open connection
    fn on_fail(&mut self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }
}

pub struct Connect;

impl Message for Connect {
    type Response = (ConnectionId, mpsc::Receiver<LocationUpdate>);
}

pub struct Subscribe {
    pub connection: ConnectionId,
    pub topic: Topic,
}

impl Message for Subscribe {
    /// `true` if the subscription is new.
    type Response = Result<bool, SubscriptionError>;
}

pub struct Unsubscribe {
    pub connection: ConnectionId,
    pub topic: Topic,
}

impl Message for Unsubscribe {
    /// `true` if a subscription was removed.
    type Response = Result<bool, SubscriptionError>;
}

pub struct Disconnect(pub ConnectionId);

impl Message for Disconnect {
    /// `true` if the connection was still registered.
    type Response = bool;
}

pub struct Subscriptions(pub ConnectionId);

impl Message for Subscriptions {
    type Response = Result<Vec<Topic>, SubscriptionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub connections: usize,
    pub topics: usize,
}

pub struct Stats;

impl Message for Stats {
    type Response = RegistryStats;
}

#[async_trait]
impl Handler<Connect> for SubscriberRegistry {
    async fn handle(&mut self, _: Connect) -> (ConnectionId, mpsc::Receiver<LocationUpdate>) {
        let id = Id::new(Uuid::new_v4());
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.subscribers.insert(
            id,
            Subscriber {
                sender,
                topics: HashSet::new(),
            },
        );
        log::info!("connection {} connected", id);
        (id, receiver)
    }
}

#[async_trait]
impl Handler<Subscribe> for SubscriberRegistry {
    async fn handle(&mut self, message: Subscribe) -> Result<bool, SubscriptionError> {
        let Subscribe { connection, topic } = message;
        let subscriber = self
            .subscribers
            .get_mut(&connection)
            .ok_or(SubscriptionError::UnknownConnection(connection))?;
        let added = subscriber.topics.insert(topic.clone());
        if added {
            log::debug!("connection {} joined {}", connection, topic);
            self.rooms.entry(topic).or_default().insert(connection);
        }
        Ok(added)
    }
}

#[async_trait]
impl Handler<Unsubscribe> for SubscriberRegistry {
    async fn handle(&mut self, message: Unsubscribe) -> Result<bool, SubscriptionError> {
        let Unsubscribe { connection, topic } = message;
        let subscriber = self
            .subscribers
            .get_mut(&connection)
            .ok_or(SubscriptionError::UnknownConnection(connection))?;
        let removed = subscriber.topics.remove(&topic);
        if removed {
            log::debug!("connection {} left {}", connection, topic);
            self.leave_room(&topic, &connection);
        }
        Ok(removed)
    }
}

#[async_trait]
impl Handler<Disconnect> for SubscriberRegistry {
    async fn handle(&mut self, Disconnect(id): Disconnect) -> bool {
        let removed = self.remove(&id);
        if removed {
            log::info!("connection {} disconnected", id);
        }
        removed
    }
}

#[async_trait]
impl Handler<Subscriptions> for SubscriberRegistry {
    async fn handle(
        &mut self,
        Subscriptions(id): Subscriptions,
    ) -> Result<Vec<Topic>, SubscriptionError> {
        self.subscribers
            .get(&id)
            .map(|subscriber| subscriber.topics.iter().cloned().collect())
            .ok_or(SubscriptionError::UnknownConnection(id))
    }
}

#[async_trait]
impl Handler<Stats> for SubscriberRegistry {
    async fn handle(&mut self, _: Stats) -> RegistryStats {
        RegistryStats {
            connections: self.subscribers.len(),
            topics: self.rooms.len(),
        }
    }
}

/// A registered connection together with the updates addressed to it.
///
/// Dropping a session disconnects it.
pub struct Session {
    id: ConnectionId,
    updates: mpsc::Receiver<LocationUpdate>,
    registry: Option<ActorRef<SubscriberRegistry>>,
}

impl Session {
    pub async fn open(registry: &ActorRef<SubscriberRegistry>) -> Result<Self, ActorError> {
        let (id, updates) = registry.ask(Connect).await?;
        Ok(Self {
            id,
            updates,
            registry: Some(registry.clone()),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    fn registry(&self) -> Result<&ActorRef<SubscriberRegistry>, ActorError> {
        self.registry.as_ref().ok_or(ActorError::Stopped)
    }

    /// Fails with `NotFound` once the connection was removed from the
    /// registry.
    pub async fn subscribe(&self, topic: Topic) -> RequestResult<bool> {
        let registry = self.registry()?;
        Ok(registry
            .ask(Subscribe {
                connection: self.id,
                topic,
            })
            .await??)
    }

    pub async fn unsubscribe(&self, topic: Topic) -> RequestResult<bool> {
        let registry = self.registry()?;
        Ok(registry
            .ask(Unsubscribe {
                connection: self.id,
                topic,
            })
            .await??)
    }

    pub async fn topics(&self) -> RequestResult<Vec<Topic>> {
        let registry = self.registry()?;
        Ok(registry.ask(Subscriptions(self.id)).await??)
    }

    /// Waits for the next update. `None` once the connection was removed from
    /// the registry.
    pub async fn recv(&mut self) -> Option<LocationUpdate> {
        self.updates.recv().await
    }

    /// Number of updates received but not yet read.
    pub fn pending(&self) -> usize {
        self.updates.len()
    }

    pub async fn close(mut self) {
        if let Some(registry) = self.registry.take() {
            let _ = registry.ask(Disconnect(self.id)).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(registry) = self.registry.take() else {
            return;
        };
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = registry.tell(Disconnect(id)).await;
                });
            }
            Err(_) => log::warn!("connection {} dropped outside of a runtime", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use model::topic::Topic;

    use super::{Connect, Disconnect, Stats, Subscribe, SubscriberRegistry, SubscriptionError};
    use crate::RequestError;

    #[tokio::test]
    async fn subscribing_twice_is_idempotent() {
        let registry = actors::run(|| SubscriberRegistry::new(8));
        let (id, _updates) = registry.ask(Connect).await.unwrap();
        let topic = Topic::vehicle("B1");

        let first = registry
            .ask(Subscribe { connection: id, topic: topic.clone() })
            .await
            .unwrap();
        let second = registry
            .ask(Subscribe { connection: id, topic })
            .await
            .unwrap();
        assert_eq!((first, second), (Ok(true), Ok(false)));
    }

    #[tokio::test]
    async fn disconnect_is_terminal() {
        let registry = actors::run(|| SubscriberRegistry::new(8));
        let (id, _updates) = registry.ask(Connect).await.unwrap();
        registry
            .ask(Subscribe { connection: id, topic: Topic::All })
            .await
            .unwrap()
            .unwrap();

        assert!(registry.ask(Disconnect(id)).await.unwrap());
        assert!(!registry.ask(Disconnect(id)).await.unwrap());
        assert_eq!(
            registry
                .ask(Subscribe { connection: id, topic: Topic::All })
                .await
                .unwrap(),
            Err(SubscriptionError::UnknownConnection(id))
        );
        let stats = registry.ask(Stats).await.unwrap();
        assert_eq!((stats.connections, stats.topics), (0, 0));
    }

    #[tokio::test]
    async fn dropping_a_session_disconnects_it() {
        let registry = actors::run(|| SubscriberRegistry::new(8));
        let session = super::Session::open(&registry).await.unwrap();
        session.subscribe(Topic::vehicle("B1")).await.unwrap();
        assert_eq!(registry.ask(Stats).await.unwrap().connections, 1);

        drop(session);
        // the disconnect is sent from a spawned task
        for _ in 0..100 {
            if registry.ask(Stats).await.unwrap().connections == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.ask(Stats).await.unwrap().connections, 0);
    }

    #[tokio::test]
    async fn sessions_list_their_topics() {
        let registry = actors::run(|| SubscriberRegistry::new(8));
        let session = super::Session::open(&registry).await.unwrap();
        assert!(session.topics().await.unwrap().is_empty());

        session.subscribe(Topic::All).await.unwrap();
        session.subscribe(Topic::vehicle("B1")).await.unwrap();
        assert!(session.unsubscribe(Topic::All).await.unwrap());
        assert!(!session.unsubscribe(Topic::All).await.unwrap());
        assert_eq!(session.topics().await.unwrap(), vec![Topic::vehicle("B1")]);
        session.close().await;
    }

    #[tokio::test]
    async fn sessions_fail_after_their_connection_is_removed() {
        let registry = actors::run(|| SubscriberRegistry::new(8));
        let mut session = super::Session::open(&registry).await.unwrap();
        assert!(registry.ask(Disconnect(session.id())).await.unwrap());

        assert!(matches!(
            session.subscribe(Topic::All).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            session.unsubscribe(Topic::All).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(session.topics().await, Err(RequestError::NotFound(_))));
        assert_eq!(session.recv().await, None);
    }
}
