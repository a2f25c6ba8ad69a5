//! Space Packet link over a byte stream.
//!
//! Outbound messages are segmented, framed and written under a lock by the
//! calling thread. A listener thread reads packets, checks their CRC,
//! rebuilds segmented messages and hands them to [`SppTransport::receive`].
//!
//! A read or write failure shuts the link down. A failed write may leave a
//! partial packet on the stream, so nothing more is written after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use malwire_spp::{Desegmenter, PacketReader, PacketWriter, Segmenter, SppError};
use malwire_transport::{
    InboundMessage, InteractionType, LinkStream, QosLevel, TcpLink, Transport, TransportError,
};
use tracing::{debug, info, info_span, warn, Span};

use crate::address::SppAddress;
use crate::config::SppConfig;
use crate::error::{LinkError, Result};
use crate::queue::{hand_off, QueueSender};

/// Property key for the APID of a received message.
pub const PROPERTY_APID: &str = "apid";
/// Property key for the APID qualifier of a received message.
pub const PROPERTY_APID_QUALIFIER: &str = "apid_qualifier";

/// A [`Transport`] carrying messages as CCSDS Space Packets.
pub struct SppTransport {
    address: String,
    config: SppConfig,
    segmenter: Segmenter,
    writer: Mutex<PacketWriter<LinkStream>>,
    control: LinkStream,
    inbound: Mutex<Receiver<InboundMessage>>,
    closed: Arc<AtomicBool>,
    span: Span,
}

impl std::fmt::Debug for SppTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SppTransport")
            .field("address", &self.address)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SppTransport {
    /// Connect to `address` (`malspp://host:port/apid` or `host:port`).
    ///
    /// An APID in the address overrides `config.apid`.
    pub fn connect(address: &str, mut config: SppConfig) -> Result<Self> {
        let address: SppAddress = address.parse()?;
        if let Some(apid) = address.apid {
            config.apid = apid;
        }
        let stream = TcpLink::connect(address.authority.as_str())?;
        Self::from_stream(stream, config)
    }

    /// Run the link over an already-connected stream.
    pub fn from_stream(stream: LinkStream, config: SppConfig) -> Result<Self> {
        config.validate()?;
        stream.set_write_timeout(config.write_timeout())?;

        let address = format!("malspp://{}/{}", stream.local_label(), config.apid);
        let peer = stream.peer_label();
        let span = info_span!("spp_link", address = %address);

        let segmenter = Segmenter::new(config.header_template(), config.effective_packet_body())?
            .with_qualifier(config.apid_qualifier);
        let reader = PacketReader::with_config(stream.try_clone()?, config.framing.clone());
        let control = stream.try_clone()?;
        let writer = PacketWriter::with_config(stream, config.framing.clone());
        let (queue, inbound) = hand_off(config.queue_capacity);
        let closed = Arc::new(AtomicBool::new(false));

        let listener = Listener {
            reader,
            desegmenter: Desegmenter::new(config.max_message_size),
            peer: peer.clone(),
            queue,
            closed: Arc::clone(&closed),
        };
        let listener_span = span.clone();
        thread::Builder::new()
            .name(format!("malspp-{}", config.apid))
            .spawn(move || {
                let _entered = listener_span.enter();
                listener.run();
            })
            .map_err(LinkError::Spawn)?;

        span.in_scope(|| info!(peer = %peer, apid = config.apid, "space packet link up"));
        Ok(Self {
            address,
            config,
            segmenter,
            writer: Mutex::new(writer),
            control,
            inbound: Mutex::new(inbound),
            closed,
            span,
        })
    }

    pub fn config(&self) -> &SppConfig {
        &self.config
    }

    fn send(&self, bytes: &[u8]) -> Result<()> {
        let packets = self.segmenter.segment(bytes.to_vec());
        let mut writer = lock(&self.writer);
        if let Err(err) = writer.write_all_packets(&packets) {
            // A close racing the write is not a send failure.
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            warn!(parent: &self.span, error = %err, "link write failed, closing link");
            let _ = self.control.shutdown();
            return Err(err.into());
        }
        debug!(parent: &self.span, packets = packets.len(), bytes = bytes.len(), "message sent");
        Ok(())
    }
}

impl Transport for SppTransport {
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

    fn is_supported_interaction_type(&self, _interaction: InteractionType) -> bool {
        true
    }

    fn is_supported_qos_level(&self, _level: QosLevel) -> bool {
        true
    }

    fn close(&self) -> malwire_transport::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(parent: &self.span, "closing space packet link");
        self.control.shutdown()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for SppTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct Listener {
    reader: PacketReader<LinkStream>,
    desegmenter: Desegmenter,
    peer: String,
    queue: QueueSender,
    closed: Arc<AtomicBool>,
}

impl Listener {
    fn run(mut self) {
        loop {
            let packet = match self.reader.read_packet() {
                Ok(packet) => packet,
                Err(SppError::CrcMismatch { expected, received }) => {
                    warn!(expected, received, "packet failed CRC check, dropped");
                    continue;
                }
                Err(SppError::ConnectionClosed) => {
                    info!("link closed");
                    self.shut_down();
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "link read failed, listener stopping");
                    self.shut_down();
                    break;
                }
            };
            debug!(
                apid = packet.header.apid,
                count = packet.header.sequence_count,
                bytes = packet.body.len(),
                "packet received"
            );

            let message = match self.desegmenter.accept(packet) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(err) => {
                    debug!(error = %err, "partial message discarded");
                    continue;
                }
            };
            let source = SppAddress::new(self.peer.as_str(), message.header.apid).to_string();
            let inbound = InboundMessage::new(source, message.body)
                .with_property(PROPERTY_APID, message.header.apid)
                .with_property(PROPERTY_APID_QUALIFIER, message.apid_qualifier);
            if !self.queue.push(inbound) {
                debug!("receiver gone, listener stopping");
                break;
            }
        }
    }

    fn shut_down(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("space packet link shut down by listener");
            let _ = self.reader.get_ref().shutdown();
        }
    }
}

/// Accepts inbound Space Packet links on a TCP port.
#[derive(Debug)]
pub struct SppListener {
    link: TcpLink,
    config: SppConfig,
}

impl SppListener {
    /// Bind to `address` (`malspp://host:port/apid` or `host:port`).
    pub fn bind(address: &str, mut config: SppConfig) -> Result<Self> {
        let address: SppAddress = address.parse()?;
        if let Some(apid) = address.apid {
            config.apid = apid;
        }
        config.validate()?;
        let link = TcpLink::bind(address.authority.as_str())?;
        info!(addr = %link.local_addr(), apid = config.apid, "space packet listener bound");
        Ok(Self { link, config })
    }

    /// Wait for the next peer and start a link to it.
    pub fn accept(&self) -> Result<SppTransport> {
        let stream = self.link.accept()?;
        SppTransport::from_stream(stream, self.config.clone())
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.link.local_addr()
    }

    /// `malspp://` address of the bound port.
    pub fn address(&self) -> String {
        SppAddress::new(self.local_addr().to_string(), self.config.apid).to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
