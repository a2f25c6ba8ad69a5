//! Binary element codecs for malwire message bodies.
//!
//! A message body is an ordered sequence of typed, nullable elements. Two
//! interchangeable strategies turn it into bytes:
//! - [`PlainBinaryCodec`]: one type tag per element, self-describing
//! - [`SplitBinaryCodec`]: a leading bitset carries every null flag and
//!   boolean value, then the remaining values follow untagged
//!
//! Each stream starts with a strategy marker, so a peer configured with the
//! other strategy fails on the first message instead of misreading it.

pub mod codec;
pub mod element;
pub mod error;
pub mod plain;
pub mod split;

mod bitset;
mod primitive;

pub use codec::{CodecStrategy, ElementCodec, WireCodec};
pub use element::{Element, ElementKind, Value, NULL_TAG};
pub use error::{CodecError, Result};
pub use plain::PlainBinaryCodec;
pub use split::SplitBinaryCodec;
