/// Errors raised by CFP fragmentation, reassembly and CAN bus access.
#[derive(Debug, thiserror::Error)]
pub enum CfpError {
    /// The identifier layout violates the field width rules.
    #[error("invalid identifier layout: {0}")]
    InvalidLayout(String),

    /// A field value does not fit its configured width.
    #[error("{field} value {value} does not fit in {width} bits")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        width: u32,
    },

    /// The per-frame data capacity is outside 1..=64 bytes.
    #[error("invalid frame data capacity {0} (must be 1..=64)")]
    InvalidFrameCapacity(usize),

    /// A frame carries more data than the bus allows.
    #[error("frame data too large ({len} bytes, max {max})")]
    FrameDataTooLarge { len: usize, max: usize },

    /// The payload needs more frames than the remain field can count.
    #[error("payload too large ({size} bytes needs {frames} frames, max {max_frames})")]
    PayloadTooLarge {
        size: usize,
        frames: usize,
        max_frames: u64,
    },

    /// A frame's remain counter did not match the open transaction.
    #[error(
        "sequence anomaly in transaction {transaction_id} ({src}->{dst}): \
         expected remain {expected}, found {found}"
    )]
    SequenceAnomaly {
        src: u32,
        dst: u32,
        transaction_id: u32,
        expected: u32,
        found: u32,
    },

    /// A CONTINUE or END frame arrived with no open transaction.
    #[error("no open transaction {transaction_id} ({src}->{dst})")]
    UnknownTransaction {
        src: u32,
        dst: u32,
        transaction_id: u32,
    },

    /// The bus port has been shut down.
    #[error("CAN bus closed")]
    BusClosed,

    /// A transport primitive failed.
    #[error(transparent)]
    Transport(#[from] malwire_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, CfpError>;
