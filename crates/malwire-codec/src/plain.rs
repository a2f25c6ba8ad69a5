use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::codec::{CodecStrategy, ElementCodec};
use crate::element::{Element, ElementKind, NULL_TAG};
use crate::error::{CodecError, Result};
use crate::primitive::{read_value, write_value, Cursor};

/// Tag-per-element binary encoding.
///
/// Wire format:
/// ```text
/// ┌──────────┬───────────┬─────────────┬───────────┬─────────────┬─────
/// │ 0xB1     │ tag (1B)  │ value       │ tag (1B)  │ value       │ ...
/// │ marker   │ 0 = null  │ (if tag≠0)  │           │             │
/// └──────────┴───────────┴─────────────┴───────────┴─────────────┴─────
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainBinaryCodec;

impl PlainBinaryCodec {
    /// Decode a stream using its own type tags, without a kind context.
    pub fn decode_untyped(&self, bytes: &[u8]) -> Result<Vec<Element>> {
        let mut src = open_stream(bytes, CodecStrategy::Plain)?;
        let mut out = Vec::new();
        while !src.is_empty() {
            let index = out.len();
            let tag = src.u8()?;
            if tag == NULL_TAG {
                out.push(None);
                continue;
            }
            let kind = ElementKind::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;
            out.push(Some(read_value(kind, index, &mut src)?));
        }
        Ok(out)
    }
}

impl ElementCodec for PlainBinaryCodec {
    fn strategy(&self) -> CodecStrategy {
        CodecStrategy::Plain
    }

    fn encode(&self, elements: &[Element]) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(1 + elements.len() * 5);
        dst.put_u8(CodecStrategy::Plain.marker());
        for element in elements {
            match element {
                None => dst.put_u8(NULL_TAG),
                Some(value) => {
                    dst.put_u8(value.kind().tag());
                    write_value(value, &mut dst)?;
                }
            }
        }
        trace!(elements = elements.len(), bytes = dst.len(), "plain encode");
        Ok(dst.freeze())
    }

    fn decode(&self, bytes: &[u8], kinds: &[ElementKind]) -> Result<Vec<Element>> {
        let mut src = open_stream(bytes, CodecStrategy::Plain)?;
        let mut out = Vec::with_capacity(kinds.len());
        for (index, expected) in kinds.iter().copied().enumerate() {
            let tag = src.u8()?;
            if tag == NULL_TAG {
                out.push(None);
                continue;
            }
            let found = ElementKind::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;
            if found != expected {
                return Err(CodecError::TypeMismatch {
                    index,
                    expected,
                    found,
                });
            }
            out.push(Some(read_value(found, index, &mut src)?));
        }
        if !src.is_empty() {
            return Err(CodecError::TrailingBytes(src.remaining()));
        }
        Ok(out)
    }
}

/// Check the strategy marker and return a cursor positioned after it.
pub(crate) fn open_stream(bytes: &[u8], expected: CodecStrategy) -> Result<Cursor<'_>> {
    let mut src = Cursor::new(bytes);
    let marker = src.u8().map_err(|_| CodecError::EmptyStream)?;
    if marker != expected.marker() {
        return Err(CodecError::StrategyMismatch {
            expected,
            found: marker,
        });
    }
    Ok(src)
}
