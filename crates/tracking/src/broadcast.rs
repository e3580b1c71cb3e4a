//! Fan-out of location updates.
//!
//! A publish reaches every connection subscribed to the topic at the time the
//! registry handles it, plus every connection subscribed to [`Topic::All`].
//! Delivery is best effort and at most once per connection: an update is put
//! into the connection's buffer without waiting, and dropped for that
//! connection if the buffer is full. Nothing is replayed to late subscribers.
//!
//! Publishes are handled one at a time by the registry actor, so updates from
//! one publisher reach each subscriber in the order they were published.

use actors::{
    actor::ActorError,
    actor_ref::ActorRef,
    handler::{Handler, Message},
};
use async_trait::async_trait;
use model::{position::LocationUpdate, topic::Topic};
use tokio::sync::mpsc::error::TrySendError;

use crate::registry::SubscriberRegistry;

pub struct Publish {
    pub topic: Topic,
    pub update: LocationUpdate,
}

impl Message for Publish {
    type Response = Delivery;
}

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Connections the update was handed to.
    pub delivered: usize,
    /// Connections whose buffer was full.
    pub dropped: usize,
    /// Connections found closed and removed from the registry.
    pub closed: usize,
}

#[async_trait]
impl Handler<Publish> for SubscriberRegistry {
    async fn handle(&mut self, Publish { topic, update }: Publish) -> Delivery {
        let mut delivery = Delivery::default();
        let mut gone = vec![];
        for id in self.recipients(&topic) {
            let Some(subscriber) = self.subscribers.get(&id) else {
                continue;
            };
            match subscriber.sender.try_send(update.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!("connection {} is lagging, dropped update for {}", id, topic);
                    delivery.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    gone.push(id);
                    delivery.closed += 1;
                }
            }
        }
        for id in gone {
            log::debug!("connection {} went away without disconnecting", id);
            self.remove(&id);
        }
        delivery
    }
}

/// Publishing side of the registry.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: ActorRef<SubscriberRegistry>,
}

impl Broadcaster {
    pub fn new(registry: ActorRef<SubscriberRegistry>) -> Self {
        Self { registry }
    }

    /// Returns once the update has been handed to every recipient's buffer.
    /// Does not wait for clients to read it.
    pub async fn publish(
        &self,
        topic: Topic,
        update: LocationUpdate,
    ) -> Result<Delivery, ActorError> {
        self.registry.ask(Publish { topic, update }).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use model::{position::LocationUpdate, topic::Topic};
    use utility::id::Id;

    use super::{Broadcaster, Delivery};
    use crate::registry::{Session, SubscriberRegistry};

    fn update(id: &str, latitude: f64) -> LocationUpdate {
        LocationUpdate {
            vehicle_id: Id::from(id),
            latitude,
            longitude: 80.27,
            observed_at: Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap(),
        }
    }

    fn setup(buffer: usize) -> (actors::actor_ref::ActorRef<SubscriberRegistry>, Broadcaster) {
        let registry = actors::run(move || SubscriberRegistry::new(buffer));
        let broadcaster = Broadcaster::new(registry.clone());
        (registry, broadcaster)
    }

    async fn publish(broadcaster: &Broadcaster, id: &str, latitude: f64) -> Delivery {
        broadcaster
            .publish(Topic::vehicle(id), update(id, latitude))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn scoped_delivery() {
        let (registry, broadcaster) = setup(8);
        let mut first = Session::open(&registry).await.unwrap();
        let mut second = Session::open(&registry).await.unwrap();
        let mut other = Session::open(&registry).await.unwrap();
        first.subscribe(Topic::vehicle("B1")).await.unwrap();
        second.subscribe(Topic::vehicle("B1")).await.unwrap();
        other.subscribe(Topic::vehicle("B2")).await.unwrap();

        let delivery = publish(&broadcaster, "B1", 13.08).await;
        assert_eq!(delivery.delivered, 2);

        assert_eq!(first.recv().await, Some(update("B1", 13.08)));
        assert_eq!(second.recv().await, Some(update("B1", 13.08)));
        assert_eq!(other.pending(), 0);
    }

    #[tokio::test]
    async fn global_subscribers_receive_everything_once() {
        let (registry, broadcaster) = setup(8);
        let mut session = Session::open(&registry).await.unwrap();
        session.subscribe(Topic::All).await.unwrap();
        session.subscribe(Topic::vehicle("B1")).await.unwrap();

        publish(&broadcaster, "B1", 1.0).await;
        publish(&broadcaster, "B2", 2.0).await;

        assert_eq!(session.recv().await, Some(update("B1", 1.0)));
        assert_eq!(session.recv().await, Some(update("B2", 2.0)));
        assert_eq!(session.pending(), 0);
    }

    #[tokio::test]
    async fn preserves_publish_order() {
        let (registry, broadcaster) = setup(64);
        let mut session = Session::open(&registry).await.unwrap();
        session.subscribe(Topic::vehicle("B1")).await.unwrap();

        for i in 0..20 {
            publish(&broadcaster, "B1", i as f64).await;
        }
        for i in 0..20 {
            assert_eq!(session.recv().await, Some(update("B1", i as f64)));
        }
    }

    #[tokio::test]
    async fn unsubscribed_connections_receive_nothing_more() {
        let (registry, broadcaster) = setup(8);
        let mut session = Session::open(&registry).await.unwrap();
        session.subscribe(Topic::vehicle("B1")).await.unwrap();
        publish(&broadcaster, "B1", 1.0).await;
        session.unsubscribe(Topic::vehicle("B1")).await.unwrap();
        let delivery = publish(&broadcaster, "B1", 2.0).await;

        assert_eq!(delivery.delivered, 0);
        assert_eq!(session.recv().await, Some(update("B1", 1.0)));
        assert_eq!(session.pending(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_block_others() {
        let (registry, broadcaster) = setup(1);
        let slow = Session::open(&registry).await.unwrap();
        let mut fast = Session::open(&registry).await.unwrap();
        slow.subscribe(Topic::vehicle("B1")).await.unwrap();
        fast.subscribe(Topic::vehicle("B1")).await.unwrap();

        assert_eq!(publish(&broadcaster, "B1", 1.0).await.delivered, 2);
        assert_eq!(fast.recv().await, Some(update("B1", 1.0)));

        let delivery = publish(&broadcaster, "B1", 2.0).await;
        assert_eq!((delivery.delivered, delivery.dropped), (1, 1));
        assert_eq!(fast.recv().await, Some(update("B1", 2.0)));
    }

    #[tokio::test]
    async fn late_subscribers_get_no_replay() {
        let (registry, broadcaster) = setup(8);
        publish(&broadcaster, "B1", 1.0).await;
        let mut session = Session::open(&registry).await.unwrap();
        session.subscribe(Topic::vehicle("B1")).await.unwrap();
        assert_eq!(session.pending(), 0);
        publish(&broadcaster, "B1", 2.0).await;
        assert_eq!(session.recv().await, Some(update("B1", 2.0)));
    }
}
