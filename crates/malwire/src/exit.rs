use std::fmt;
use std::io;

use malwire_cfp::CfpError;
use malwire_link::LinkError;
use malwire_spp::SppError;
use malwire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Shutdown => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn spp_error(context: &str, err: SppError) -> CliError {
    match err {
        SppError::Io(source) => io_error(context, source),
        SppError::Transport(err) => transport_error(context, err),
        SppError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn cfp_error(context: &str, err: CfpError) -> CliError {
    match err {
        CfpError::Transport(err) => transport_error(context, err),
        CfpError::InvalidLayout(_)
        | CfpError::InvalidFrameCapacity(_)
        | CfpError::FieldOverflow { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        CfpError::BusClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Spp(err) => spp_error(context, err),
        LinkError::Cfp(err) => cfp_error(context, err),
        LinkError::ConfigFile { path, source } => {
            io_error(&format!("{context}: failed to read {path}"), source)
        }
        LinkError::InvalidAddress { .. } | LinkError::Config(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        LinkError::Codec(_) | LinkError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        LinkError::Spawn(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
