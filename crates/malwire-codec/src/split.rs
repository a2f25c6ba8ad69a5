use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::bitset::{BitReader, BitWriter};
use crate::codec::{CodecStrategy, ElementCodec};
use crate::element::{Element, ElementKind, Value};
use crate::error::{CodecError, Result};
use crate::plain::open_stream;
use crate::primitive::{read_value, write_value, Cursor};

/// Size-optimised encoding that front-loads null and boolean flags.
///
/// Wire format:
/// ```text
/// ┌──────────┬───────────────────────────────────┬──────────────────────┐
/// │ 0xB2     │ bitset, ceil(bits / 8) bytes       │ non-null, non-boolean│
/// │ marker   │ n null bits, then one value bit   │ values in order      │
/// │          │ per non-null boolean              │ (untagged)           │
/// └──────────┴───────────────────────────────────┴──────────────────────┘
/// ```
///
/// Bit `i` (LSB-first within each byte) is set when element `i` is null.
/// Nulls and booleans therefore cost one or two bits instead of a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitBinaryCodec;

impl ElementCodec for SplitBinaryCodec {
    fn strategy(&self) -> CodecStrategy {
        CodecStrategy::Split
    }

    fn encode(&self, elements: &[Element]) -> Result<Bytes> {
        let mut flags = BitWriter::default();
        for element in elements {
            flags.push(element.is_none());
        }
        for element in elements {
            if let Some(Value::Boolean(v)) = element {
                flags.push(*v);
            }
        }
        let flags = flags.into_bytes();

        let mut dst = BytesMut::with_capacity(1 + flags.len() + elements.len() * 4);
        dst.put_u8(CodecStrategy::Split.marker());
        dst.put_slice(&flags);
        for value in elements.iter().flatten() {
            if !matches!(value, Value::Boolean(_)) {
                write_value(value, &mut dst)?;
            }
        }
        trace!(
            elements = elements.len(),
            bitset = flags.len(),
            bytes = dst.len(),
            "split encode"
        );
        Ok(dst.freeze())
    }

    fn decode(&self, bytes: &[u8], kinds: &[ElementKind]) -> Result<Vec<Element>> {
        let body = open_stream(bytes, CodecStrategy::Split)?.rest();

        let mut flags = BitReader::new(body);
        let mut present = Vec::with_capacity(kinds.len());
        for _ in kinds {
            present.push(!flags.next_bit()?);
        }
        let mut booleans = Vec::new();
        for (kind, present) in kinds.iter().zip(&present) {
            if *present && *kind == ElementKind::Boolean {
                booleans.push(flags.next_bit()?);
            }
        }

        let mut values = Cursor::new(&body[flags.consumed_bytes()..]);
        let mut booleans = booleans.into_iter();
        let mut out = Vec::with_capacity(kinds.len());
        for (index, (kind, present)) in kinds.iter().copied().zip(present).enumerate() {
            if !present {
                out.push(None);
            } else if kind == ElementKind::Boolean {
                out.push(booleans.next().map(Value::Boolean));
            } else {
                out.push(Some(read_value(kind, index, &mut values)?));
            }
        }
        if !values.is_empty() {
            return Err(CodecError::TrailingBytes(values.remaining()));
        }
        Ok(out)
    }
}
