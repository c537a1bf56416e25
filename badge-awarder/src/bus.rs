//! In-process notification bus
//!
//! A bounded channel with a non-blocking, fire-and-forget publisher. The
//! contract with the request path: publishing never blocks and never fails
//! the caller. A full or closed channel drops the event with a warning, and
//! the committed operation stands either way.

use crate::types::EconomyEvent;
use tokio::sync::mpsc;

/// Receiving end of the bus, consumed by the badge awarder task
pub type EventStream = mpsc::Receiver<EconomyEvent>;

/// Create a bounded bus with the given capacity
pub fn channel(capacity: usize) -> (EventPublisher, EventStream) {
    let (sender, receiver) = mpsc::channel(capacity);
    (EventPublisher { sender }, receiver)
}

/// Fire-and-forget publisher handle
#[derive(Clone)]
pub struct EventPublisher {
    sender: mpsc::Sender<EconomyEvent>,
}

impl EventPublisher {
    /// Publish an event without blocking.
    ///
    /// Dropped events are logged; the caller's operation is already
    /// committed and must not be affected.
    pub fn publish(&self, event: EconomyEvent) {
        if let Err(err) = self.sender.try_send(event) {
            match err {
                mpsc::error::TrySendError::Full(event) => {
                    tracing::warn!(account = %event.account(), "Notification bus full, event dropped");
                }
                mpsc::error::TrySendError::Closed(event) => {
                    tracing::warn!(account = %event.account(), "Notification bus closed, event dropped");
                }
            }
        }
    }
}
