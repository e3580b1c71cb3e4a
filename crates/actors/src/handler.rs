use std::marker::PhantomData;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::Actor;

#[async_trait]
pub trait Handler<M>: Actor
where
    M: Message,
{
    async fn handle(&mut self, message: M) -> M::Response;
}

pub trait Message: Send + 'static {
    type Response: Send + 'static;
}

/// A type erased message, boxed into the mailbox.
#[async_trait]
pub trait Envelope<A: Actor>: Send {
    async fn deliver(self: Box<Self>, actor: &mut A);
}

pub(crate) struct ActorMessage<M, A>
where
    M: Message,
    A: Actor,
{
    message: M,
    respond_to: Option<oneshot::Sender<M::Response>>,
    _phantom_actor: PhantomData<fn(A)>,
}

impl<M, A> ActorMessage<M, A>
where
    M: Message,
    A: Actor,
{
    pub(crate) fn new(
        message: M,
        respond_to: Option<oneshot::Sender<M::Response>>,
    ) -> Self {
        Self {
            message,
            respond_to,
            _phantom_actor: PhantomData,
        }
    }
}

#[async_trait]
impl<M, A> Envelope<A> for ActorMessage<M, A>
where
    M: Message,
    A: Handler<M>,
{
    async fn deliver(self: Box<Self>, actor: &mut A) {
        let Self {
            message,
            respond_to,
            ..
        } = *self;
        let result = actor.handle(message).await;

        if let Some(respond_to) = respond_to {
            // the asking side may have given up waiting
            if respond_to.send(result).is_err() {
                log::debug!("{}: answer dropped, receiver is gone", actor.name());
            }
        }
    }
}
