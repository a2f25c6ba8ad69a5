//! Transport shell and shared primitives for malwire links.
//!
//! This is the lowest layer of malwire. It provides:
//! - the [`Transport`] contract every physical-link binding implements,
//! - [`SequenceCounter`], the wrap-around allocator for transaction ids and
//!   packet sequence counts,
//! - [`bits`], mask/shift helpers for packed identifiers,
//! - [`LinkStream`] and [`TcpLink`] for stream-oriented links.

pub mod bits;
pub mod counter;
pub mod error;
pub mod shell;
pub mod stream;
pub mod tcp;

pub use bits::BitField;
pub use counter::{CounterValues, SequenceCounter};
pub use error::{Result, TransportError};
pub use shell::{
    InboundMessage, InteractionType, QosLevel, QosProperties, Transport, PROPERTY_SOURCE,
};
pub use stream::LinkStream;
pub use tcp::TcpLink;
