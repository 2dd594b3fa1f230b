//! Bounded queue between the input-capture task and the navigation loop

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::gesture::GestureEvent;

/// Queue length used by the touch controller firmware
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Create the single-producer, single-consumer input queue
pub fn input_channel(capacity: usize) -> (InputSender, InputReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (InputSender { tx }, InputReceiver { rx })
}

/// Producer half, owned by the input-capture task
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: mpsc::Sender<GestureEvent>,
}

impl InputSender {
    /// Wait for room in the queue. Returns false once the receiver is gone.
    pub async fn send(&self, event: GestureEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Blocking variant of [`send`](Self::send) for capture threads running
    /// outside the async runtime. Panics if called from within it.
    pub fn blocking_send(&self, event: GestureEvent) -> bool {
        self.tx.blocking_send(event).is_ok()
    }

    /// Enqueue without waiting; a full queue drops the report
    pub fn try_send(&self, event: GestureEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Input queue full, dropping contact report");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Event(GestureEvent),
    Timeout,
    /// Every sender has been dropped
    Closed,
}

/// Consumer half, owned by the navigation loop
#[derive(Debug)]
pub struct InputReceiver {
    rx: mpsc::Receiver<GestureEvent>,
}

impl InputReceiver {
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Received {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => Received::Event(event),
            Ok(None) => Received::Closed,
            Err(_) => Received::Timeout,
        }
    }
}
