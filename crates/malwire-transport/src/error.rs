use std::net::SocketAddr;

/// Errors that can occur in link transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A counter was configured with a zero wrap modulus.
    #[error("invalid wrap modulus {0} (must be >= 1)")]
    InvalidWrap(u64),

    /// A value does not fit the bit-field it is written to.
    #[error("value {value} does not fit in {width} bits")]
    FieldOverflow { value: u64, width: u32 },

    /// The peer address could not be resolved.
    #[error("no usable address for {0}")]
    Unresolved(String),

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,

    /// A link binding failed below the transport contract (framing,
    /// fragmentation, bus access).
    #[error("{link} link error: {source}")]
    Link {
        link: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TransportError {
    pub(crate) fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
