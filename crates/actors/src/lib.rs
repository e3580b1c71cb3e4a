use std::panic::AssertUnwindSafe;

use actor::{Actor, SupervisionStrategy};
use actor_ref::ActorRef;
use futures::FutureExt;

pub mod actor;
pub mod actor_ref;
pub mod handler;
mod mailbox;

pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Creates and runs an actor. If the actor panics, it is either restared, resumed
/// or stoped acording to the behavior specified by `Actor::on_fail()`.
pub fn run<A, F>(actor_factory: F) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    run_with_capacity(DEFAULT_MAILBOX_CAPACITY, actor_factory)
}

/// Like [`run`], with a mailbox of `capacity` pending messages.
pub fn run_with_capacity<A, F>(capacity: usize, actor_factory: F) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    let (tx, mut rx) = mailbox::bounded(capacity);
    let mut actor = actor_factory();
    let actor_ref = ActorRef::new(tx);

    tokio::spawn(async move {
        log::debug!("{} started", actor.name());
        while let Some(letter) = rx.recv().await {
            let result = AssertUnwindSafe(letter.deliver(&mut actor))
                .catch_unwind()
                .await;
            if let Err(why) = result {
                log::error!("{} paniced: {:?}", actor.name(), why);
                match actor.on_fail(why) {
                    SupervisionStrategy::Restart => {
                        actor = actor_factory();
                    }
                    SupervisionStrategy::Resume => {}
                    SupervisionStrategy::Stop => {
                        break;
                    }
                };
            }
        }
        log::debug!("{} stopped", actor.name());
    });

    actor_ref
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use async_trait::async_trait;

    use crate::{
        actor::{Actor, ActorError, SupervisionStrategy},
        handler::{Handler, Message},
        run, run_with_capacity,
    };

    struct Increment(i64);

    impl Message for Increment {
        type Response = ();
    }

    struct GetValue;

    impl Message for GetValue {
        type Response = i64;
    }

    struct Explode;

    impl Message for Explode {
        type Response = ();
    }

    struct Counter {
        count: i64,
        strategy: SupervisionStrategy,
    }

    impl Actor for Counter {
        fn on_fail(&mut self, _: Box<dyn Any + Send>) -> SupervisionStrategy {
            self.strategy
        }
    }

    #[async_trait]
    impl Handler<Increment> for Counter {
        async fn handle(&mut self, message: Increment) {
            self.count += message.0;
        }
    }

    #[async_trait]
    impl Handler<GetValue> for Counter {
        async fn handle(&mut self, _: GetValue) -> i64 {
            self.count
        }
    }

    #[async_trait]
    impl Handler<Explode> for Counter {
        async fn handle(&mut self, _: Explode) {
            panic!("boom");
        }
    }

    fn counter(strategy: SupervisionStrategy) -> impl Fn() -> Counter {
        move || Counter { count: 0, strategy }
    }

    #[tokio::test]
    async fn messages_are_handled_in_order() {
        let actor = run(counter(SupervisionStrategy::Resume));
        actor.tell(Increment(1)).await.unwrap();
        actor.tell(Increment(5)).await.unwrap();
        actor.tell(Increment(-2)).await.unwrap();
        assert_eq!(actor.ask(GetValue).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn resume_keeps_state_after_panic() {
        let actor = run_with_capacity(4, counter(SupervisionStrategy::Resume));
        actor.tell(Increment(3)).await.unwrap();
        assert!(matches!(actor.ask(Explode).await, Err(ActorError::NoAnswer)));
        assert_eq!(actor.ask(GetValue).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn restart_resets_state_after_panic() {
        let actor = run(counter(SupervisionStrategy::Restart));
        actor.tell(Increment(3)).await.unwrap();
        let _ = actor.ask(Explode).await;
        assert_eq!(actor.ask(GetValue).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stop_closes_the_mailbox() {
        let actor = run(counter(SupervisionStrategy::Stop));
        let _ = actor.ask(Explode).await;
        assert!(matches!(
            actor.ask(GetValue).await,
            Err(ActorError::Stopped) | Err(ActorError::NoAnswer)
        ));
    }
}
