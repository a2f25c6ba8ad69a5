use std::io::{ErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};
use malwire_transport::QosProperties;
use tracing::trace;

use crate::config::PacketConfig;
use crate::crc::CRC_SIZE;
use crate::error::{Result, SppError};
use crate::header::{SpacePacketHeader, HEADER_SIZE};

/// Largest packet data field the 16-bit length field can describe.
pub const MAX_BODY_SIZE: usize = 65536;

/// Size of the optional APID qualifier prefix.
pub const QUALIFIER_SIZE: usize = 2;

/// A parsed or to-be-built Space Packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacePacket {
    pub header: SpacePacketHeader,
    /// On the wire only in qualifier-in-message mode.
    pub apid_qualifier: u16,
    /// Packet data field without any CRC trailer.
    pub body: Bytes,
    /// Filled in by the receiving link (remote address and the like).
    pub properties: QosProperties,
}

impl SpacePacket {
    pub fn new(header: SpacePacketHeader, body: impl Into<Bytes>) -> Self {
        Self {
            header,
            apid_qualifier: 0,
            body: body.into(),
            properties: QosProperties::new(),
        }
    }

    pub fn with_qualifier(mut self, apid_qualifier: u16) -> Self {
        self.apid_qualifier = apid_qualifier;
        self
    }

    /// Bytes this packet occupies on the wire under `config`.
    pub fn wire_size(&self, config: &PacketConfig) -> usize {
        let qualifier = if config.qualifier_in_message {
            QUALIFIER_SIZE
        } else {
            0
        };
        qualifier + HEADER_SIZE + self.body.len() + config.crc_len()
    }
}

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┬──────────────────┬──────────────┐
/// │ qualifier    │ primary header   │ body             │ CRC-16       │
/// │ (2B, opt.)   │ (6B)             │ (0..=65536B)     │ (2B, opt.)   │
/// └──────────────┴──────────────────┴──────────────────┴──────────────┘
/// ```
///
/// The length field carries `body + crc - 1`; the CRC covers header and body.
pub fn encode_packet(packet: &SpacePacket, config: &PacketConfig, dst: &mut BytesMut) -> Result<()> {
    let body_len = packet.body.len();
    let crc_len = config.crc_len();
    let max = config.effective_max_body();
    if body_len > max {
        return Err(SppError::BodyTooLarge {
            size: body_len,
            max,
        });
    }
    let data_len = body_len + crc_len;
    if data_len == 0 || data_len > MAX_BODY_SIZE {
        return Err(SppError::BodyUnrepresentable {
            len: body_len,
            crc_len,
        });
    }

    // data_len is in 1..=65536 here, so the length field fits 16 bits.
    let header = packet.header.to_bytes((data_len - 1) as u16);

    dst.reserve(packet.wire_size(config));
    if config.qualifier_in_message {
        dst.put_u16(packet.apid_qualifier);
    }
    dst.put_slice(&header);
    dst.put_slice(&packet.body);
    if let Some(algorithm) = config.crc {
        dst.put_u16(algorithm.checksum(&header, &packet.body));
    }
    trace!(
        apid = packet.header.apid,
        sequence_count = packet.header.sequence_count,
        body = body_len,
        "encoded space packet"
    );
    Ok(())
}

/// Read exactly one packet from a blocking stream.
///
/// Partial reads and `Interrupted` are retried until each section is
/// complete. A declared body beyond the configured maximum is rejected
/// before any body byte is read.
pub fn read_packet<R: Read>(src: &mut R, config: &PacketConfig) -> Result<SpacePacket> {
    let mut progress = Progress::default();

    let apid_qualifier = if config.qualifier_in_message {
        let mut raw = [0u8; QUALIFIER_SIZE];
        progress.read_section(src, &mut raw)?;
        u16::from_be_bytes(raw)
    } else {
        config.default_qualifier
    };

    let mut raw_header = [0u8; HEADER_SIZE];
    progress.read_section(src, &mut raw_header)?;
    let (header, length_field) = SpacePacketHeader::from_bytes(&raw_header);

    let data_len = usize::from(length_field) + 1;
    let crc_len = config.crc_len();
    if crc_len > data_len {
        return Err(SppError::Malformed(format!(
            "data field of {data_len} bytes cannot hold a {crc_len}-byte CRC"
        )));
    }
    let body_len = data_len - crc_len;
    let max = config.effective_max_body();
    if body_len > max {
        return Err(SppError::BodyTooLarge {
            size: body_len,
            max,
        });
    }

    progress.expect(data_len);
    let mut body = vec![0u8; body_len];
    progress.read_section(src, &mut body)?;

    if let Some(algorithm) = config.crc {
        let mut raw = [0u8; CRC_SIZE];
        progress.read_section(src, &mut raw)?;
        let received = u16::from_be_bytes(raw);
        let expected = algorithm.checksum(&raw_header, &body);
        if expected != received {
            return Err(SppError::CrcMismatch { expected, received });
        }
    }

    trace!(
        apid = header.apid,
        sequence_count = header.sequence_count,
        body = body_len,
        "decoded space packet"
    );
    Ok(SpacePacket {
        header,
        apid_qualifier,
        body: Bytes::from(body),
        properties: QosProperties::new(),
    })
}

/// Parse one packet from a buffer holding exactly that packet.
pub fn decode_packet(mut bytes: &[u8], config: &PacketConfig) -> Result<SpacePacket> {
    let packet = read_packet(&mut bytes, config)?;
    if !bytes.is_empty() {
        return Err(SppError::Malformed(format!(
            "{} bytes after the end of the packet",
            bytes.len()
        )));
    }
    Ok(packet)
}

/// Byte accounting for one packet, used to tell a clean close from a cut.
#[derive(Debug, Default)]
struct Progress {
    received: usize,
    expected: usize,
}

impl Progress {
    fn expect(&mut self, more: usize) {
        self.expected = self.received + more;
    }

    fn read_section<R: Read>(&mut self, src: &mut R, buf: &mut [u8]) -> Result<()> {
        self.expected = self.expected.max(self.received + buf.len());
        let filled = fill(src, buf)?;
        self.received += filled;
        if filled == buf.len() {
            return Ok(());
        }
        if self.received == 0 {
            return Err(SppError::ConnectionClosed);
        }
        Err(SppError::Truncated {
            expected: self.expected,
            received: self.received,
        })
    }
}

/// Read until `buf` is full or the stream reports EOF.
fn fill<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(SppError::Io(err)),
        }
    }
    Ok(filled)
}
