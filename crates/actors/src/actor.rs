use std::any::Any;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionStrategy {
    /// Replace the actor with a fresh instance from its factory.
    Restart,
    /// Keep the current instance and continue with the next message.
    Resume,
    /// Stop processing. Pending and future messages fail with `ActorError::Stopped`.
    Stop,
}

pub trait Actor: Send + Sync + 'static {
    /// Used in log output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called when a handler on the actor panics. The return value represents the
    /// supervision strategy used to handle the panic.
    /// NOTE: If this method panics, the actor can not recover from the panic.
    #[allow(unused_variables)]
    fn on_fail(&mut self, error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

#[derive(Debug, Error)]
pub enum ActorError {
    /// The mailbox is closed because the actor stopped.
    #[error("actor has stopped")]
    Stopped,
    /// The actor dropped the message without answering, e.g. because the
    /// handler paniced.
    #[error("actor did not answer")]
    NoAnswer,
}
