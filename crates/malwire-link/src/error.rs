use malwire_transport::TransportError;

/// Errors that can occur while running a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Space Packet framing error.
    #[error("space packet error: {0}")]
    Spp(#[from] malwire_spp::SppError),

    /// CAN fragmentation error.
    #[error("CFP error: {0}")]
    Cfp(#[from] malwire_cfp::CfpError),

    /// Element encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] malwire_codec::CodecError),

    /// A transport address could not be parsed.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The link configuration is unusable.
    #[error("invalid link configuration: {0}")]
    Config(String),

    /// Failed to read a configuration file.
    #[error("failed to read {path}: {source}")]
    ConfigFile {
        path: String,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The listener thread could not be started.
    #[error("failed to spawn listener thread: {0}")]
    Spawn(std::io::Error),
}

impl From<LinkError> for TransportError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Transport(inner) => inner,
            LinkError::Spp(malwire_spp::SppError::Transport(inner)) => inner,
            LinkError::Cfp(malwire_cfp::CfpError::Transport(inner)) => inner,
            LinkError::Spp(inner) => TransportError::Link {
                link: "spp",
                source: Box::new(inner),
            },
            LinkError::Cfp(inner) => TransportError::Link {
                link: "can",
                source: Box::new(inner),
            },
            other => TransportError::Link {
                link: "malwire",
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
