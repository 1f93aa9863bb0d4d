//! Deferred results: a future outcome with exactly two terminal states.
//!
//! A [`Deferred`] is created together with its [`Settler`]. The settler is
//! consumed by [`Settler::fulfill`] or [`Settler::reject`], so settlement
//! happens at most once by construction. A settler dropped without settling
//! surfaces as [`ModuleError::Abandoned`] on the observing side.
//!
//! Observation is explicit registration of a fulfillment handler and a
//! rejection handler; exactly one of them runs, exactly once.

use tokio::sync::oneshot;

use super::types::ModuleError;

/// The branch a deferred settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Settlement {
    Fulfilled,
    Rejected,
}

/// The settling half of a deferred. Consumed on use.
pub struct Settler<T> {
    sender: oneshot::Sender<Result<T, ModuleError>>,
}

impl<T> Settler<T> {
    /// Settles the deferred with a value. A vanished observer is not an
    /// error for the settling side.
    pub fn fulfill(self, value: T) {
        let _ = self.sender.send(Ok(value));
    }

    pub fn reject(self, error: ModuleError) {
        let _ = self.sender.send(Err(error));
    }
}

/// The observing half of a deferred.
pub struct Deferred<T> {
    receiver: oneshot::Receiver<Result<T, ModuleError>>,
}

impl<T> Deferred<T> {
    /// Creates an unsettled deferred and its settler.
    pub fn pending() -> (Settler<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (Settler { sender: tx }, Self { receiver: rx })
    }

    /// A deferred already settled with a value.
    pub fn fulfilled(value: T) -> Self {
        let (settler, deferred) = Self::pending();
        settler.fulfill(value);
        deferred
    }

    /// A deferred already settled with an error.
    pub fn rejected(error: ModuleError) -> Self {
        let (settler, deferred) = Self::pending();
        settler.reject(error);
        deferred
    }

    /// Waits for the terminal state.
    pub async fn settled(self) -> Result<T, ModuleError> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ModuleError::Abandoned),
        }
    }

    /// Registers both continuation handlers and waits for settlement.
    /// Exactly one handler runs, exactly once.
    pub async fn observe<F, R>(self, on_fulfilled: F, on_rejected: R) -> Settlement
    where
        F: FnOnce(T),
        R: FnOnce(ModuleError),
    {
        match self.settled().await {
            Ok(value) => {
                on_fulfilled(value);
                Settlement::Fulfilled
            }
            Err(error) => {
                on_rejected(error);
                Settlement::Rejected
            }
        }
    }
}
