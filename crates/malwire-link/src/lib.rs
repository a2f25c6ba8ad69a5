//! Link bindings for malwire.
//!
//! Two [`Transport`](malwire_transport::Transport) implementations:
//! - [`SppTransport`]: CCSDS Space Packets over a TCP stream
//! - [`CanTransport`]: CFP transactions over any [`CanBus`](malwire_cfp::CanBus)
//!
//! Each link owns one listener thread that reassembles inbound messages and
//! hands them off through a channel. [`MessageEndpoint`] adds element
//! encoding on top of either link.

pub mod address;
pub mod can;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod spp;

mod queue;

pub use address::{can_address, SppAddress, CAN_SCHEME, SPP_SCHEME};
pub use can::{CanTransport, PROPERTY_DST_NODE, PROPERTY_SRC_NODE, PROPERTY_TRANSACTION_ID};
pub use config::{CanLinkConfig, SppConfig, DEFAULT_RESEND_CACHE};
pub use endpoint::{MessageEndpoint, ReceivedElements};
pub use error::{LinkError, Result};
pub use spp::{SppListener, SppTransport, PROPERTY_APID, PROPERTY_APID_QUALIFIER};
