use serde::{Deserialize, Serialize};

use crate::crc::{CrcAlgorithm, CRC_SIZE};
use crate::packet::MAX_BODY_SIZE;

/// Framing options shared by both ends of a packet stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketConfig {
    /// Carry a 2-byte APID qualifier ahead of each primary header.
    pub qualifier_in_message: bool,
    /// Qualifier reported for inbound packets when it is not on the wire.
    pub default_qualifier: u16,
    /// CRC trailer algorithm; `None` disables the trailer.
    pub crc: Option<CrcAlgorithm>,
    /// Largest accepted body in bytes, excluding any CRC. Capped at 65536.
    pub max_body_size: usize,
}

impl PacketConfig {
    /// Trailer size implied by the CRC setting.
    pub fn crc_len(&self) -> usize {
        if self.crc.is_some() {
            CRC_SIZE
        } else {
            0
        }
    }

    /// The configured body limit clamped to what the length field can carry.
    pub fn effective_max_body(&self) -> usize {
        self.max_body_size.min(MAX_BODY_SIZE)
    }
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            qualifier_in_message: false,
            default_qualifier: 0,
            crc: None,
            max_body_size: MAX_BODY_SIZE,
        }
    }
}
