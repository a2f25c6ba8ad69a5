use malwire_transport::BitField;
use serde::{Deserialize, Serialize};

/// Primary header size in bytes.
pub const HEADER_SIZE: usize = 6;

pub const MAX_VERSION: u8 = 0b111;
pub const MAX_APID: u16 = (1 << 11) - 1;
pub const MAX_SEQUENCE_COUNT: u16 = (1 << 14) - 1;
/// Sequence counts wrap at this value.
pub const SEQUENCE_COUNT_WRAP: u64 = 1 << 14;

// Packet identification word (bytes 0..2).
const VERSION: BitField = BitField::new(13, 3);
const PACKET_TYPE: BitField = BitField::new(12, 1);
const SEC_HEADER_FLAG: BitField = BitField::new(11, 1);
const APID: BitField = BitField::new(0, 11);

// Packet sequence control word (bytes 2..4).
const SEQUENCE_FLAGS: BitField = BitField::new(14, 2);
const SEQUENCE_COUNT: BitField = BitField::new(0, 14);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    Telemetry = 0,
    Telecommand = 1,
}

impl PacketType {
    fn from_bit(bit: u64) -> Self {
        if bit == 0 {
            Self::Telemetry
        } else {
            Self::Telecommand
        }
    }
}

/// Segmentation state carried in the two sequence-flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceFlags {
    Continuation = 0b00,
    First = 0b01,
    Last = 0b10,
    Unsegmented = 0b11,
}

impl SequenceFlags {
    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0b00 => Self::Continuation,
            0b01 => Self::First,
            0b10 => Self::Last,
            _ => Self::Unsegmented,
        }
    }
}

/// The CCSDS Space Packet primary header, minus the length field.
///
/// The data length is a property of the body and is computed when the
/// packet is built.
///
/// Wire format:
/// ```text
/// ┌─────────┬──────┬─────┬────────┬──────────┬───────────┬──────────────┐
/// │ version │ type │ sec │ apid   │ seq flags│ seq count │ data length  │
/// │ 3b      │ 1b   │ 1b  │ 11b    │ 2b       │ 14b       │ 16b (len-1)  │
/// └─────────┴──────┴─────┴────────┴──────────┴───────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpacePacketHeader {
    pub version: u8,
    pub packet_type: PacketType,
    pub secondary_header_flag: bool,
    pub apid: u16,
    pub sequence_flags: SequenceFlags,
    pub sequence_count: u16,
}

impl SpacePacketHeader {
    /// An unsegmented version-0 telemetry header.
    pub const fn telemetry(apid: u16, sequence_count: u16) -> Self {
        Self {
            version: 0,
            packet_type: PacketType::Telemetry,
            secondary_header_flag: false,
            apid,
            sequence_flags: SequenceFlags::Unsegmented,
            sequence_count,
        }
    }

    /// An unsegmented version-0 telecommand header.
    pub const fn telecommand(apid: u16, sequence_count: u16) -> Self {
        Self {
            packet_type: PacketType::Telecommand,
            ..Self::telemetry(apid, sequence_count)
        }
    }

    /// True if every field fits its bit width.
    pub const fn is_valid(&self) -> bool {
        self.version <= MAX_VERSION
            && self.apid <= MAX_APID
            && self.sequence_count <= MAX_SEQUENCE_COUNT
    }

    /// Serialise the header with the given raw data length field.
    ///
    /// Fields wider than their slot are truncated to it.
    pub fn to_bytes(&self, data_length_field: u16) -> [u8; HEADER_SIZE] {
        let mut ident = VERSION.insert_truncated(0, u64::from(self.version));
        ident = PACKET_TYPE.insert_truncated(ident, self.packet_type as u64);
        ident = SEC_HEADER_FLAG.insert_truncated(ident, u64::from(self.secondary_header_flag));
        ident = APID.insert_truncated(ident, u64::from(self.apid));

        let mut control = SEQUENCE_FLAGS.insert_truncated(0, self.sequence_flags as u64);
        control = SEQUENCE_COUNT.insert_truncated(control, u64::from(self.sequence_count));

        let ident = (ident as u16).to_be_bytes();
        let control = (control as u16).to_be_bytes();
        let length = data_length_field.to_be_bytes();
        [
            ident[0], ident[1], control[0], control[1], length[0], length[1],
        ]
    }

    /// Parse a header, returning it with the raw data length field.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> (Self, u16) {
        let ident = u64::from(u16::from_be_bytes([bytes[0], bytes[1]]));
        let control = u64::from(u16::from_be_bytes([bytes[2], bytes[3]]));
        let data_length_field = u16::from_be_bytes([bytes[4], bytes[5]]);

        // Extracted fields are masked to at most 14 bits, so the narrowing
        // casts below are lossless.
        let header = Self {
            version: VERSION.extract(ident) as u8,
            packet_type: PacketType::from_bit(PACKET_TYPE.extract(ident)),
            secondary_header_flag: SEC_HEADER_FLAG.extract(ident) == 1,
            apid: APID.extract(ident) as u16,
            sequence_flags: SequenceFlags::from_bits(SEQUENCE_FLAGS.extract(control)),
            sequence_count: SEQUENCE_COUNT.extract(control) as u16,
        };
        (header, data_length_field)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn flags_strategy() -> impl Strategy<Value = SequenceFlags> {
        (0u64..4).prop_map(SequenceFlags::from_bits)
    }

    proptest! {
        #[test]
        fn header_roundtrip(
            version in 0u8..=MAX_VERSION,
            telecommand in any::<bool>(),
            secondary_header_flag in any::<bool>(),
            apid in 0u16..=MAX_APID,
            sequence_flags in flags_strategy(),
            sequence_count in 0u16..=MAX_SEQUENCE_COUNT,
            length in any::<u16>(),
        ) {
            let header = SpacePacketHeader {
                version,
                packet_type: if telecommand { PacketType::Telecommand } else { PacketType::Telemetry },
                secondary_header_flag,
                apid,
                sequence_flags,
                sequence_count,
            };
            let (parsed, parsed_length) = SpacePacketHeader::from_bytes(&header.to_bytes(length));
            prop_assert_eq!(parsed, header);
            prop_assert_eq!(parsed_length, length);
        }
    }

    #[test]
    fn boundary_values_roundtrip() {
        let header = SpacePacketHeader {
            version: 7,
            packet_type: PacketType::Telecommand,
            secondary_header_flag: true,
            apid: 2047,
            sequence_flags: SequenceFlags::Unsegmented,
            sequence_count: 16383,
        };
        let bytes = header.to_bytes(0xFFFF);
        assert_eq!(bytes, [0xFF; 6]);
        assert_eq!(SpacePacketHeader::from_bytes(&bytes), (header, 0xFFFF));
    }

    #[test]
    fn known_layout() {
        let header = SpacePacketHeader {
            version: 0,
            packet_type: PacketType::Telecommand,
            secondary_header_flag: true,
            apid: 0x123,
            sequence_flags: SequenceFlags::First,
            sequence_count: 0x2A,
        };
        assert_eq!(header.to_bytes(9), [0x19, 0x23, 0x40, 0x2A, 0x00, 0x09]);
    }

    #[test]
    fn oversized_fields_are_truncated_not_widened() {
        let header = SpacePacketHeader {
            version: 0xFF,
            apid: 0xFFFF,
            sequence_count: 0xFFFF,
            ..SpacePacketHeader::telemetry(0, 0)
        };
        assert!(!header.is_valid());
        let (parsed, _) = SpacePacketHeader::from_bytes(&header.to_bytes(0));
        assert_eq!(parsed.version, 7);
        assert_eq!(parsed.apid, MAX_APID);
        assert_eq!(parsed.sequence_count, MAX_SEQUENCE_COUNT);
        assert_eq!(parsed.packet_type, PacketType::Telemetry);
        assert!(!parsed.secondary_header_flag);
    }

    #[test]
    fn telecommand_constructor() {
        let header = SpacePacketHeader::telecommand(5, 6);
        assert_eq!(header.packet_type, PacketType::Telecommand);
        assert_eq!(header.sequence_flags, SequenceFlags::Unsegmented);
        assert!(header.is_valid());
    }
}
