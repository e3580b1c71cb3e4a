use tokio::sync::mpsc;

use crate::{handler::Envelope, Actor};

pub(crate) type Letter<A> = Box<dyn Envelope<A>>;

pub(crate) struct Mailbox<A: Actor>(mpsc::Sender<Letter<A>>);

impl<A: Actor> Clone for Mailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Mailbox<A> {
    pub(crate) async fn send(&self, letter: Letter<A>) -> Result<(), Letter<A>> {
        self.0.send(letter).await.map_err(|why| why.0)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub(crate) struct MailboxReceiver<A: Actor>(mpsc::Receiver<Letter<A>>);

impl<A: Actor> MailboxReceiver<A> {
    pub(crate) async fn recv(&mut self) -> Option<Letter<A>> {
        self.0.recv().await
    }
}

/// Mailbox with room for `capacity` pending messages. Senders wait while it is full.
pub(crate) fn bounded<A: Actor>(capacity: usize) -> (Mailbox<A>, MailboxReceiver<A>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Mailbox(tx), MailboxReceiver(rx))
}
