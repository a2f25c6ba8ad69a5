use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind};
use crate::error::Result;
use crate::plain::PlainBinaryCodec;
use crate::split::SplitBinaryCodec;

/// Encodes and decodes ordered element sequences.
///
/// Encoding is context-free. Decoding takes the expected kind of every slot,
/// which is how a receiver knows where boolean flags live in the split form.
pub trait ElementCodec {
    /// The strategy this codec implements.
    fn strategy(&self) -> CodecStrategy;

    /// Encode `elements` into a self-contained byte stream.
    fn encode(&self, elements: &[Element]) -> Result<Bytes>;

    /// Decode exactly `kinds.len()` elements; the stream must be fully
    /// consumed.
    fn decode(&self, bytes: &[u8], kinds: &[ElementKind]) -> Result<Vec<Element>>;
}

/// Selects the wire codec. Both peers of a link must agree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecStrategy {
    /// Tag-per-element binary.
    #[default]
    Plain,
    /// Leading null/boolean bitset, then untagged values.
    Split,
}

impl CodecStrategy {
    /// First byte of every stream written with this strategy.
    pub const fn marker(self) -> u8 {
        match self {
            Self::Plain => 0xB1,
            Self::Split => 0xB2,
        }
    }

    /// Build the codec for this strategy.
    pub const fn codec(self) -> WireCodec {
        match self {
            Self::Plain => WireCodec::Plain(PlainBinaryCodec),
            Self::Split => WireCodec::Split(SplitBinaryCodec),
        }
    }
}

impl fmt::Display for CodecStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain binary"),
            Self::Split => f.write_str("split binary"),
        }
    }
}

/// The closed set of codecs, selected through [`CodecStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCodec {
    Plain(PlainBinaryCodec),
    Split(SplitBinaryCodec),
}

impl Default for WireCodec {
    fn default() -> Self {
        CodecStrategy::default().codec()
    }
}

impl From<CodecStrategy> for WireCodec {
    fn from(strategy: CodecStrategy) -> Self {
        strategy.codec()
    }
}

impl ElementCodec for WireCodec {
    fn strategy(&self) -> CodecStrategy {
        match self {
            Self::Plain(codec) => codec.strategy(),
            Self::Split(codec) => codec.strategy(),
        }
    }

    fn encode(&self, elements: &[Element]) -> Result<Bytes> {
        match self {
            Self::Plain(codec) => codec.encode(elements),
            Self::Split(codec) => codec.encode(elements),
        }
    }

    fn decode(&self, bytes: &[u8], kinds: &[ElementKind]) -> Result<Vec<Element>> {
        match self {
            Self::Plain(codec) => codec.decode(bytes, kinds),
            Self::Split(codec) => codec.decode(bytes, kinds),
        }
    }
}
