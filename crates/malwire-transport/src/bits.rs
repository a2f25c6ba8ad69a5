//! Mask/shift helpers for packed bit-field identifiers.
//!
//! Both the Space Packet primary header and the CFP arbitration identifier
//! pack several narrow fields into one integer. [`BitField`] describes one
//! such field by its shift (distance of the least significant bit from bit 0)
//! and width.

use crate::error::{Result, TransportError};

/// All-ones mask of `width` bits. `width` is clamped to 64.
pub const fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// True if `value` is representable in `width` bits.
pub const fn fits(value: u64, width: u32) -> bool {
    value & !mask(width) == 0
}

/// A field of `width` bits located `shift` bits above bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    shift: u32,
    width: u32,
}

impl BitField {
    /// Describe a field. `shift + width` must not exceed 64.
    pub const fn new(shift: u32, width: u32) -> Self {
        assert!(width >= 1 && shift + width <= 64, "bit field out of range");
        Self { shift, width }
    }

    pub const fn shift(&self) -> u32 {
        self.shift
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Largest value this field can hold.
    pub const fn max_value(&self) -> u64 {
        mask(self.width)
    }

    /// Read the field out of `word`.
    pub const fn extract(&self, word: u64) -> u64 {
        (word >> self.shift) & mask(self.width)
    }

    /// Write `value` into `word`, replacing the previous field content.
    ///
    /// Fails instead of truncating when `value` is wider than the field.
    pub fn insert(&self, word: u64, value: u64) -> Result<u64> {
        if !fits(value, self.width) {
            return Err(TransportError::FieldOverflow {
                value,
                width: self.width,
            });
        }
        Ok(self.insert_truncated(word, value))
    }

    /// Write the low `width` bits of `value` into `word`.
    pub const fn insert_truncated(&self, word: u64, value: u64) -> u64 {
        let field_mask = mask(self.width) << self.shift;
        (word & !field_mask) | ((value << self.shift) & field_mask)
    }

    /// The field immediately above this one with the given width.
    pub const fn next(&self, width: u32) -> Self {
        Self::new(self.shift + self.width, width)
    }
}
