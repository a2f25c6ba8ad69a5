/// Errors that can occur while building, parsing, or reassembling packets.
#[derive(Debug, thiserror::Error)]
pub enum SppError {
    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly before the first byte of a packet.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended inside a packet.
    #[error("truncated packet ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },

    /// The declared body length exceeds the configured maximum.
    #[error("packet body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The header is inconsistent with the configured framing.
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// The CRC trailer does not match the packet contents.
    #[error("CRC mismatch (computed {expected:#06x}, received {received:#06x})")]
    CrcMismatch { expected: u16, received: u16 },

    /// The body length cannot be expressed in the data length field.
    #[error("body of {len} bytes cannot be framed (CRC {crc_len} bytes)")]
    BodyUnrepresentable { len: usize, crc_len: usize },

    /// A segment arrived out of order or without a first segment.
    #[error("segment sequence anomaly on apid {apid}: expected {expected:?}, found {found}")]
    SequenceAnomaly {
        apid: u16,
        expected: Option<u16>,
        found: u16,
    },

    /// A reassembled message grew beyond its configured bound.
    #[error("segmented message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A transport primitive failed.
    #[error(transparent)]
    Transport(#[from] malwire_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, SppError>;
