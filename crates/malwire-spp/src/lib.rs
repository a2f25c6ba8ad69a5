//! CCSDS Space Packet framing for malwire links.
//!
//! Every packet on the wire is:
//! - an optional 2-byte APID qualifier,
//! - the 6-byte primary header (APID, sequence flags and count, length),
//! - the body, followed by an optional CRC-16 over header and body.
//!
//! Bodies larger than one packet are split by [`Segmenter`] and rebuilt by
//! [`Desegmenter`].

pub mod config;
pub mod crc;
pub mod error;
pub mod header;
pub mod packet;
pub mod reader;
pub mod segment;
pub mod writer;

pub use config::PacketConfig;
pub use crc::{CrcAlgorithm, CRC_SIZE};
pub use error::{Result, SppError};
pub use header::{
    PacketType, SequenceFlags, SpacePacketHeader, HEADER_SIZE, MAX_APID, MAX_SEQUENCE_COUNT,
    SEQUENCE_COUNT_WRAP,
};
pub use packet::{
    decode_packet, encode_packet, read_packet, SpacePacket, MAX_BODY_SIZE, QUALIFIER_SIZE,
};
pub use reader::PacketReader;
pub use segment::{Desegmenter, Segmenter, DEFAULT_MAX_MESSAGE_SIZE};
pub use writer::PacketWriter;
