use crate::error::{CodecError, Result};

/// Accumulates flag bits LSB-first within each byte.
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    pub(crate) fn push(&mut self, bit: bool) {
        let offset = self.bits % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << offset;
            }
        }
        self.bits += 1;
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads flag bits in the order [`BitWriter`] wrote them.
#[derive(Debug)]
pub(crate) struct BitReader<'a> {
    bytes: &'a [u8],
    bits: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, bits: 0 }
    }

    pub(crate) fn next_bit(&mut self) -> Result<bool> {
        let byte = self
            .bytes
            .get(self.bits / 8)
            .ok_or(CodecError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            })?;
        let bit = byte & (1 << (self.bits % 8)) != 0;
        self.bits += 1;
        Ok(bit)
    }

    /// Bytes occupied by the bits read so far.
    pub(crate) fn consumed_bytes(&self) -> usize {
        self.bits.div_ceil(8)
    }
}
