//! Spacecraft message transport core.
//!
//! malwire moves MAL message bodies between spacecraft components over
//! physical links: CCSDS Space Packets on TCP, and the CAN Fragmentation
//! Protocol on a CAN bus.
//!
//! # Crate Structure
//!
//! - [`transport`]: the transport contract, sequence counters, bit fields
//! - [`codec`]: plain and split binary element codecs
//! - [`spp`]: Space Packet framing, CRC and segmentation
//! - [`cfp`]: CAN identifier layout, fragmentation and reassembly
//! - [`link`]: threaded SPP and CAN transports (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use malwire_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use malwire_codec::*;
}

/// Re-export Space Packet types.
pub mod spp {
    pub use malwire_spp::*;
}

/// Re-export CAN fragmentation types.
pub mod cfp {
    pub use malwire_cfp::*;
}

/// Re-export link bindings (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use malwire_link::*;
}
