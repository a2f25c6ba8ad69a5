//! CFP link over a CAN bus.
//!
//! Each message is fragmented into one CFP transaction addressed to the
//! configured peer node. The frames of the most recent transactions are
//! kept so a peer's retransmission request can be answered.
//!
//! A bus failure on either the send or the receive path shuts the link down.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use malwire_cfp::{CanBus, CanFrame, CfpError, Fragmenter, ReassemblyEvent, Reassembler};
use malwire_transport::{InboundMessage, InteractionType, QosLevel, Transport, TransportError};
use tracing::{debug, info, info_span, warn, Span};

use crate::address::can_address;
use crate::config::CanLinkConfig;
use crate::error::{LinkError, Result};
use crate::queue::{hand_off, QueueSender};

pub const PROPERTY_SRC_NODE: &str = "src_node";
pub const PROPERTY_DST_NODE: &str = "dst_node";
pub const PROPERTY_TRANSACTION_ID: &str = "transaction_id";

#[derive(Debug)]
struct SentTransaction {
    transaction_id: u32,
    dst: u32,
    frames: Vec<CanFrame>,
}

/// Frames of the last `depth` transactions sent.
#[derive(Debug)]
struct SentCache {
    depth: usize,
    entries: VecDeque<SentTransaction>,
}

impl SentCache {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            entries: VecDeque::with_capacity(depth),
        }
    }

    fn insert(&mut self, transaction_id: u32, dst: u32, frames: Vec<CanFrame>) {
        if self.depth == 0 {
            return;
        }
        // Transaction ids wrap, so an older entry may share this id.
        self.entries
            .retain(|sent| !(sent.transaction_id == transaction_id && sent.dst == dst));
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back(SentTransaction {
            transaction_id,
            dst,
            frames,
        });
    }

    fn find(&self, transaction_id: u32, dst: u32) -> Option<Vec<CanFrame>> {
        self.entries
            .iter()
            .find(|sent| sent.transaction_id == transaction_id && sent.dst == dst)
            .map(|sent| sent.frames.clone())
    }
}

/// A [`Transport`] carrying messages as CFP transactions on a CAN bus.
pub struct CanTransport {
    address: String,
    config: CanLinkConfig,
    bus: Arc<dyn CanBus>,
    fragmenter: Fragmenter,
    sent: Arc<Mutex<SentCache>>,
    inbound: Mutex<Receiver<InboundMessage>>,
    closed: Arc<AtomicBool>,
    span: Span,
}

impl std::fmt::Debug for CanTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanTransport")
            .field("address", &self.address)
            .field("peer_node", &self.config.peer_node)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl CanTransport {
    /// Start a link on `bus` as `config.local_node`.
    pub fn open(bus: Arc<dyn CanBus>, config: CanLinkConfig) -> Result<Self> {
        config.validate()?;
        let address = can_address(config.local_node);
        let span = info_span!("can_link", address = %address);

        let fragmenter = Fragmenter::new(config.cfp)?;
        let sent = Arc::new(Mutex::new(SentCache::new(config.resend_cache)));
        let (queue, inbound) = hand_off(config.queue_capacity);
        let closed = Arc::new(AtomicBool::new(false));

        let listener = Listener {
            bus: Arc::clone(&bus),
            reassembler: Reassembler::new(config.cfp)?.with_local_node(config.local_node),
            fragmenter: Fragmenter::new(config.cfp)?,
            config: config.clone(),
            sent: Arc::clone(&sent),
            queue,
            closed: Arc::clone(&closed),
        };
        let listener_span = span.clone();
        thread::Builder::new()
            .name(format!("malcan-{}", config.local_node))
            .spawn(move || {
                let _entered = listener_span.enter();
                listener.run();
            })
            .map_err(LinkError::Spawn)?;

        span.in_scope(|| {
            info!(
                local_node = config.local_node,
                peer_node = config.peer_node,
                "CAN link up"
            )
        });
        Ok(Self {
            address,
            config,
            bus,
            fragmenter,
            sent,
            inbound: Mutex::new(inbound),
            closed,
            span,
        })
    }

    pub fn config(&self) -> &CanLinkConfig {
        &self.config
    }

    fn send(&self, bytes: &[u8]) -> Result<()> {
        let layout = self.config.cfp.layout;
        let frames = self
            .fragmenter
            .fragment(self.config.local_node, self.config.peer_node, bytes.to_vec())?;
        let transaction_id = frames
            .first()
            .map(|frame| frame.identifier.transaction_id)
            .unwrap_or_default();
        let frames = frames
            .iter()
            .map(|frame| frame.to_can(&layout))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Cached before sending so an early retransmission request finds it.
        lock(&self.sent).insert(transaction_id, self.config.peer_node, frames.clone());
        for frame in &frames {
            if let Err(err) = self.bus.send_frame(frame) {
                // A close racing the write is not a send failure.
                if self.closed.swap(true, Ordering::AcqRel) {
                    return Ok(());
                }
                warn!(
                    parent: &self.span,
                    error = %err,
                    transaction_id,
                    "bus write failed, closing link"
                );
                let _ = self.bus.shutdown();
                return Err(err.into());
            }
        }
        debug!(
            parent: &self.span,
            transaction_id,
            frames = frames.len(),
            bytes = bytes.len(),
            "message sent"
        );
        Ok(())
    }
}

impl Transport for CanTransport {
    fn create_transport_address(&self) -> String {
        self.address.clone()
    }

    fn send_encoded_message(&self, bytes: &[u8]) -> malwire_transport::Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.send(bytes).map_err(Into::into)
    }

    fn receive(&self) -> malwire_transport::Result<InboundMessage> {
        lock(&self.inbound)
            .recv()
            .map_err(|_| TransportError::Shutdown)
    }

    fn is_supported_interaction_type(&self, interaction: InteractionType) -> bool {
        interaction != InteractionType::PubSub
    }

    fn is_supported_qos_level(&self, _level: QosLevel) -> bool {
        true
    }

    fn close(&self) -> malwire_transport::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(parent: &self.span, "closing CAN link");
        self.bus
            .shutdown()
            .map_err(|err| LinkError::from(err).into())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for CanTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct Listener {
    bus: Arc<dyn CanBus>,
    reassembler: Reassembler,
    fragmenter: Fragmenter,
    config: CanLinkConfig,
    sent: Arc<Mutex<SentCache>>,
    queue: QueueSender,
    closed: Arc<AtomicBool>,
}

impl Listener {
    fn run(mut self) {
        loop {
            let frame = match self.bus.recv_frame() {
                Ok(frame) => frame,
                Err(CfpError::BusClosed) => {
                    info!("bus closed");
                    self.shut_down();
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "bus read failed, listener stopping");
                    self.shut_down();
                    break;
                }
            };

            match self.reassembler.accept_can(&frame) {
                Ok(ReassemblyEvent::Delivered(message)) => {
                    let inbound = InboundMessage::new(can_address(message.src), message.payload)
                        .with_property(PROPERTY_SRC_NODE, message.src)
                        .with_property(PROPERTY_DST_NODE, message.dst)
                        .with_property(PROPERTY_TRANSACTION_ID, message.transaction_id);
                    if !self.queue.push(inbound) {
                        debug!("receiver gone, listener stopping");
                        break;
                    }
                }
                Ok(ReassemblyEvent::RetransmissionRequested {
                    requester,
                    transaction_id,
                    ..
                }) => self.resend(requester, transaction_id),
                Ok(ReassemblyEvent::Pending | ReassemblyEvent::Ignored) => {}
                Err(CfpError::SequenceAnomaly {
                    src,
                    transaction_id,
                    ..
                }) if self.config.request_retransmission => {
                    self.request_retransmission(src, transaction_id)
                }
                Err(err) => debug!(error = %err, id = frame.id, "frame rejected"),
            }
        }
    }

    fn shut_down(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("CAN link shut down by listener");
            let _ = self.bus.shutdown();
        }
    }

    fn resend(&self, requester: u32, transaction_id: u32) {
        let Some(frames) = lock(&self.sent).find(transaction_id, requester) else {
            warn!(requester, transaction_id, "retransmission requested for uncached transaction");
            return;
        };
        info!(requester, transaction_id, frames = frames.len(), "retransmitting");
        for frame in &frames {
            if let Err(err) = self.bus.send_frame(frame) {
                warn!(error = %err, transaction_id, "retransmission failed");
                return;
            }
        }
    }

    fn request_retransmission(&self, src: u32, transaction_id: u32) {
        let request =
            self.fragmenter
                .retransmission_request(self.config.local_node, src, transaction_id);
        let sent = request
            .to_can(&self.config.cfp.layout)
            .and_then(|frame| self.bus.send_frame(&frame));
        match sent {
            Ok(()) => info!(src, transaction_id, "retransmission requested"),
            Err(err) => warn!(error = %err, src, transaction_id, "retransmission request failed"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
