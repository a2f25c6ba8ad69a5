//! Packing CFP fields into a CAN arbitration identifier.
//!
//! Fields are laid out least-significant first: transaction id in the low
//! bits, then remain, frame type, destination, and the source node in the
//! high bits. Lower source addresses therefore win bus arbitration.

use std::fmt;

use malwire_transport::bits::{fits, BitField};
use serde::{Deserialize, Serialize};

use crate::error::{CfpError, Result};

/// Width of an extended (CAN 2.0B) identifier.
pub const EXTENDED_ID_BITS: u32 = 29;

/// Role of a frame within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Receiver asks the sender to repeat a transaction.
    RetransmitRequest,
    /// First frame of a transaction (and the only one if `remain == 0`).
    Start,
    /// Final frame of a multi-frame transaction.
    End,
    Continue,
    /// A type value this protocol revision does not use.
    Reserved(u32),
}

impl FrameType {
    pub const fn to_bits(self) -> u32 {
        match self {
            Self::RetransmitRequest => 0,
            Self::Start => 1,
            Self::End => 2,
            Self::Continue => 3,
            Self::Reserved(value) => value,
        }
    }

    pub const fn from_bits(value: u32) -> Self {
        match value {
            0 => Self::RetransmitRequest,
            1 => Self::Start,
            2 => Self::End,
            3 => Self::Continue,
            other => Self::Reserved(other),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetransmitRequest => f.write_str("RETRANSMIT"),
            Self::Start => f.write_str("START"),
            Self::End => f.write_str("END"),
            Self::Continue => f.write_str("CONTINUE"),
            Self::Reserved(value) => write!(f, "RESERVED({value})"),
        }
    }
}

/// The unpacked fields of one CFP arbitration identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CfpIdentifier {
    pub src: u32,
    pub dst: u32,
    pub frame_type: FrameType,
    /// Frames still to follow in this transaction.
    pub remain: u32,
    pub transaction_id: u32,
}

/// Bit widths of the identifier fields.
///
/// Both ends of a bus must use the same layout. There is no `Default`;
/// use [`IdentifierLayout::extended_default`] or spell the widths out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierLayout {
    pub src_bits: u32,
    pub dst_bits: u32,
    pub type_bits: u32,
    pub remain_bits: u32,
    pub transaction_bits: u32,
}

struct Fields {
    transaction: BitField,
    remain: BitField,
    frame_type: BitField,
    dst: BitField,
    src: BitField,
}

impl IdentifierLayout {
    /// Build and validate a layout.
    pub fn new(
        src_bits: u32,
        dst_bits: u32,
        type_bits: u32,
        remain_bits: u32,
        transaction_bits: u32,
    ) -> Result<Self> {
        let layout = Self {
            src_bits,
            dst_bits,
            type_bits,
            remain_bits,
            transaction_bits,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// A 29-bit layout: 7-bit nodes, 2-bit type, 8-bit remain, 5-bit
    /// transaction id.
    pub const fn extended_default() -> Self {
        Self {
            src_bits: 7,
            dst_bits: 7,
            type_bits: 2,
            remain_bits: 8,
            transaction_bits: 5,
        }
    }

    /// Check width rules: every field at least one bit, the type field at
    /// least two, everything within an extended identifier.
    pub fn validate(&self) -> Result<()> {
        let widths = [
            ("src", self.src_bits),
            ("dst", self.dst_bits),
            ("type", self.type_bits),
            ("remain", self.remain_bits),
            ("transaction", self.transaction_bits),
        ];
        if let Some((name, _)) = widths.iter().find(|(_, width)| *width == 0) {
            return Err(CfpError::InvalidLayout(format!("{name} field has zero width")));
        }
        if self.type_bits < 2 {
            return Err(CfpError::InvalidLayout(format!(
                "type field needs at least 2 bits, got {}",
                self.type_bits
            )));
        }
        let total = widths
            .iter()
            .fold(0u64, |sum, (_, width)| sum + u64::from(*width));
        if total > u64::from(EXTENDED_ID_BITS) {
            return Err(CfpError::InvalidLayout(format!(
                "fields total {total} bits, max {EXTENDED_ID_BITS}"
            )));
        }
        Ok(())
    }

    /// Sum of all field widths.
    pub fn total_bits(&self) -> u32 {
        [
            self.src_bits,
            self.dst_bits,
            self.type_bits,
            self.remain_bits,
            self.transaction_bits,
        ]
        .into_iter()
        .fold(0u32, u32::saturating_add)
    }

    /// Most frames one transaction can span (`remain` counts down to 0).
    pub fn max_frames(&self) -> u64 {
        1u64 << self.remain_bits
    }

    /// Modulus of the transaction id counter.
    pub fn transaction_wrap(&self) -> u64 {
        1u64 << self.transaction_bits
    }

    /// Largest node address the layout can carry as source.
    pub fn max_node(&self) -> u32 {
        (1u32 << self.src_bits.min(self.dst_bits)) - 1
    }

    fn fields(&self) -> Result<Fields> {
        self.validate()?;
        let transaction = BitField::new(0, self.transaction_bits);
        let remain = transaction.next(self.remain_bits);
        let frame_type = remain.next(self.type_bits);
        let dst = frame_type.next(self.dst_bits);
        let src = dst.next(self.src_bits);
        Ok(Fields {
            transaction,
            remain,
            frame_type,
            dst,
            src,
        })
    }

    /// Pack `id` into a raw identifier, rejecting values wider than their
    /// field.
    pub fn pack(&self, id: &CfpIdentifier) -> Result<u32> {
        let fields = self.fields()?;
        let mut word = 0u64;
        for (name, field, value) in [
            ("transaction_id", fields.transaction, id.transaction_id),
            ("remain", fields.remain, id.remain),
            ("frame_type", fields.frame_type, id.frame_type.to_bits()),
            ("dst", fields.dst, id.dst),
            ("src", fields.src, id.src),
        ] {
            let value = u64::from(value);
            if !fits(value, field.width()) {
                return Err(CfpError::FieldOverflow {
                    field: name,
                    value,
                    width: field.width(),
                });
            }
            word = field.insert_truncated(word, value);
        }
        // The layout is at most 29 bits wide.
        Ok(word as u32)
    }

    /// Unpack a raw identifier; each field is masked to its width.
    pub fn unpack(&self, raw: u32) -> Result<CfpIdentifier> {
        let fields = self.fields()?;
        let word = u64::from(raw);
        // Each extracted field is narrower than 29 bits.
        Ok(CfpIdentifier {
            src: fields.src.extract(word) as u32,
            dst: fields.dst.extract(word) as u32,
            frame_type: FrameType::from_bits(fields.frame_type.extract(word) as u32),
            remain: fields.remain.extract(word) as u32,
            transaction_id: fields.transaction.extract(word) as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn layout_strategy() -> impl Strategy<Value = IdentifierLayout> {
        (1u32..=6, 1u32..=6, 2u32..=3, 1u32..=8, 1u32..=6)
            .prop_map(|(s, d, t, r, x)| IdentifierLayout::new(s, d, t, r, x).unwrap())
    }

    fn identifier_strategy() -> impl Strategy<Value = (IdentifierLayout, CfpIdentifier)> {
        layout_strategy().prop_flat_map(|layout| {
            (
                0..1u32 << layout.src_bits,
                0..1u32 << layout.dst_bits,
                0..1u32 << layout.type_bits,
                0..1u32 << layout.remain_bits,
                0..1u32 << layout.transaction_bits,
            )
                .prop_map(move |(src, dst, ty, remain, transaction_id)| {
                    (
                        layout,
                        CfpIdentifier {
                            src,
                            dst,
                            frame_type: FrameType::from_bits(ty),
                            remain,
                            transaction_id,
                        },
                    )
                })
        })
    }

    proptest! {
        #[test]
        fn pack_unpack_roundtrip((layout, id) in identifier_strategy()) {
            let raw = layout.pack(&id).unwrap();
            prop_assert!(raw < 1 << layout.total_bits());
            prop_assert_eq!(layout.unpack(raw).unwrap(), id);
        }
    }

    #[test]
    fn known_packing() {
        let layout = IdentifierLayout::extended_default();
        let id = CfpIdentifier {
            src: 1,
            dst: 2,
            frame_type: FrameType::Continue,
            remain: 4,
            transaction_id: 5,
        };
        // src | dst | type | remain | tx = 1 | 2 | 3 | 4 | 5
        let expected = (1 << 22) | (2 << 15) | (3 << 13) | (4 << 5) | 5;
        assert_eq!(layout.pack(&id).unwrap(), expected);
    }

    #[test]
    fn oversized_field_rejected() {
        let layout = IdentifierLayout::extended_default();
        let id = CfpIdentifier {
            src: 128,
            dst: 0,
            frame_type: FrameType::Start,
            remain: 0,
            transaction_id: 0,
        };
        let err = layout.pack(&id).unwrap_err();
        assert!(matches!(
            err,
            CfpError::FieldOverflow {
                field: "src",
                value: 128,
                width: 7
            }
        ));
    }

    #[test]
    fn unpack_masks_bits_above_layout() {
        let layout = IdentifierLayout::new(2, 2, 2, 2, 2).unwrap();
        let id = layout.unpack(u32::MAX).unwrap();
        assert_eq!(id.src, 3);
        assert_eq!(id.transaction_id, 3);
        assert_eq!(id.frame_type, FrameType::Continue);
    }

    #[test]
    fn layout_validation() {
        assert!(IdentifierLayout::extended_default().validate().is_ok());
        assert_eq!(IdentifierLayout::extended_default().total_bits(), 29);
        assert!(matches!(
            IdentifierLayout::new(0, 7, 2, 8, 5),
            Err(CfpError::InvalidLayout(_))
        ));
        assert!(matches!(
            IdentifierLayout::new(7, 7, 1, 8, 5),
            Err(CfpError::InvalidLayout(_))
        ));
        assert!(matches!(
            IdentifierLayout::new(8, 8, 2, 8, 5),
            Err(CfpError::InvalidLayout(_))
        ));
    }

    #[test]
    fn unvalidated_layout_is_caught_on_use() {
        let layout = IdentifierLayout {
            src_bits: 20,
            dst_bits: 20,
            type_bits: 2,
            remain_bits: 8,
            transaction_bits: 5,
        };
        assert!(layout.unpack(0).is_err());
    }

    #[test]
    fn wider_type_field_exposes_reserved_values() {
        let layout = IdentifierLayout::new(4, 4, 3, 4, 4).unwrap();
        let id = CfpIdentifier {
            src: 1,
            dst: 2,
            frame_type: FrameType::Reserved(6),
            remain: 0,
            transaction_id: 0,
        };
        let raw = layout.pack(&id).unwrap();
        assert_eq!(layout.unpack(raw).unwrap().frame_type, FrameType::Reserved(6));
    }

    #[test]
    fn capacity_helpers() {
        let layout = IdentifierLayout::extended_default();
        assert_eq!(layout.max_frames(), 256);
        assert_eq!(layout.transaction_wrap(), 32);
        assert_eq!(layout.max_node(), 127);
    }
}
