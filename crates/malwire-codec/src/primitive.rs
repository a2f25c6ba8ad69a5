//! Value encodings shared by both strategies.
//!
//! Numerics are fixed-width big-endian. Text and blobs carry a 4-byte
//! big-endian length prefix.

use bytes::{BufMut, Bytes, BytesMut};

use crate::element::{ElementKind, Value};
use crate::error::{CodecError, Result};

/// Bounds-checked reader over an encoded stream.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The unread part of the stream.
    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn length_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.u32()? as usize;
        self.take(len)
    }
}

/// Append the untagged value form of `value`.
pub(crate) fn write_value(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Boolean(v) => dst.put_u8(u8::from(*v)),
        Value::Octet(v) => dst.put_i8(*v),
        Value::UOctet(v) => dst.put_u8(*v),
        Value::Short(v) => dst.put_i16(*v),
        Value::UShort(v) => dst.put_u16(*v),
        Value::Integer(v) => dst.put_i32(*v),
        Value::UInteger(v) => dst.put_u32(*v),
        Value::Long(v) => dst.put_i64(*v),
        Value::ULong(v) => dst.put_u64(*v),
        Value::Float(v) => dst.put_f32(*v),
        Value::Double(v) => dst.put_f64(*v),
        Value::String(v) | Value::Identifier(v) | Value::Uri(v) => {
            write_length_prefixed(v.as_bytes(), dst)?
        }
        Value::Blob(v) => write_length_prefixed(v, dst)?,
        Value::Time(v) | Value::FineTime(v) => dst.put_u64(*v),
        Value::Duration(v) => dst.put_f64(*v),
    }
    Ok(())
}

fn write_length_prefixed(data: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| CodecError::TooLong { len: data.len() })?;
    dst.reserve(4 + data.len());
    dst.put_u32(len);
    dst.put_slice(data);
    Ok(())
}

/// Read the untagged value form of an element of `kind`.
///
/// `index` is the element position, used for diagnostics only.
pub(crate) fn read_value(kind: ElementKind, index: usize, src: &mut Cursor<'_>) -> Result<Value> {
    let value = match kind {
        ElementKind::Boolean => match src.u8()? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            byte => return Err(CodecError::InvalidBoolean { index, byte }),
        },
        ElementKind::Octet => Value::Octet(i8::from_be_bytes(src.array()?)),
        ElementKind::UOctet => Value::UOctet(src.u8()?),
        ElementKind::Short => Value::Short(i16::from_be_bytes(src.array()?)),
        ElementKind::UShort => Value::UShort(src.u16()?),
        ElementKind::Integer => Value::Integer(i32::from_be_bytes(src.array()?)),
        ElementKind::UInteger => Value::UInteger(src.u32()?),
        ElementKind::Long => Value::Long(i64::from_be_bytes(src.array()?)),
        ElementKind::ULong => Value::ULong(src.u64()?),
        ElementKind::Float => Value::Float(f32::from_be_bytes(src.array()?)),
        ElementKind::Double => Value::Double(f64::from_be_bytes(src.array()?)),
        ElementKind::String => Value::String(read_text(index, src)?),
        ElementKind::Identifier => Value::Identifier(read_text(index, src)?),
        ElementKind::Uri => Value::Uri(read_text(index, src)?),
        ElementKind::Blob => Value::Blob(Bytes::copy_from_slice(src.length_prefixed()?)),
        ElementKind::Time => Value::Time(src.u64()?),
        ElementKind::FineTime => Value::FineTime(src.u64()?),
        ElementKind::Duration => Value::Duration(f64::from_be_bytes(src.array()?)),
    };
    Ok(value)
}

fn read_text(index: usize, src: &mut Cursor<'_>) -> Result<String> {
    let raw = src.length_prefixed()?;
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8 { index })
}
