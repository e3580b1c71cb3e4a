use tokio::sync::oneshot;

use crate::{
    actor::{Actor, ActorError},
    handler::{ActorMessage, Handler, Message},
    mailbox::Mailbox,
};

/// Handle to a running actor. Cloning it is cheap; the actor stops once every
/// handle is dropped.
pub struct ActorRef<A: Actor> {
    mailbox: Mailbox<A>,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<A: Actor> std::fmt::Debug for ActorRef<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("actor", &std::any::type_name::<A>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<A: Actor> ActorRef<A> {
    pub(crate) fn new(mailbox: Mailbox<A>) -> Self {
        Self { mailbox }
    }

    /// Enqueues a message without waiting for it to be handled.
    pub async fn tell<M>(&self, msg: M) -> Result<(), ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let letter = Box::new(ActorMessage::<M, A>::new(msg, None));
        self.mailbox
            .send(letter)
            .await
            .map_err(|_| ActorError::Stopped)
    }

    /// Enqueues a message and waits for the handler's answer.
    pub async fn ask<M>(&self, msg: M) -> Result<M::Response, ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let (response_tx, response_rx) = oneshot::channel();
        let letter = Box::new(ActorMessage::<M, A>::new(msg, Some(response_tx)));
        self.mailbox
            .send(letter)
            .await
            .map_err(|_| ActorError::Stopped)?;
        response_rx.await.map_err(|_| ActorError::NoAnswer)
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}
