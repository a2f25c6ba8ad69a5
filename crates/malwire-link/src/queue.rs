use std::sync::mpsc::{self, Receiver, SyncSender, Sender};

use malwire_transport::InboundMessage;

/// Listener side of the hand-off queue.
#[derive(Debug)]
pub(crate) enum QueueSender {
    Bounded(SyncSender<InboundMessage>),
    Unbounded(Sender<InboundMessage>),
}

impl QueueSender {
    /// Enqueue a message, blocking while a bounded queue is full.
    ///
    /// Returns false once the consumer side is gone.
    pub(crate) fn push(&self, message: InboundMessage) -> bool {
        match self {
            Self::Bounded(tx) => tx.send(message).is_ok(),
            Self::Unbounded(tx) => tx.send(message).is_ok(),
        }
    }
}

/// Create a hand-off queue; `None` is unbounded.
pub(crate) fn hand_off(capacity: Option<usize>) -> (QueueSender, Receiver<InboundMessage>) {
    match capacity {
        Some(bound) => {
            let (tx, rx) = mpsc::sync_channel(bound);
            (QueueSender::Bounded(tx), rx)
        }
        None => {
            let (tx, rx) = mpsc::channel();
            (QueueSender::Unbounded(tx), rx)
        }
    }
}
