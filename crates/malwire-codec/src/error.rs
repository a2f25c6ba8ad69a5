use crate::codec::CodecStrategy;
use crate::element::ElementKind;

/// Errors that can occur while encoding or decoding element streams.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The stream ended before the current element was complete.
    #[error("unexpected end of stream (needed {needed} bytes, {remaining} left)")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// The stream has no strategy marker.
    #[error("empty stream")]
    EmptyStream,

    /// The stream was produced by a different codec strategy.
    #[error("stream marker 0x{found:02x} does not match {expected} codec")]
    StrategyMismatch { expected: CodecStrategy, found: u8 },

    /// A plain-binary type tag is not known.
    #[error("unknown type tag 0x{0:02x}")]
    UnknownTag(u8),

    /// The element at `index` does not have the kind the context expects.
    #[error("element {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: ElementKind,
        found: ElementKind,
    },

    /// A boolean byte is neither 0 nor 1.
    #[error("element {index}: invalid boolean byte 0x{byte:02x}")]
    InvalidBoolean { index: usize, byte: u8 },

    /// A text element is not valid UTF-8.
    #[error("element {index}: text is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    /// A variable-length element exceeds the 32-bit length prefix.
    #[error("element of {len} bytes exceeds the length prefix")]
    TooLong { len: usize },

    /// Bytes were left over after the last element.
    #[error("{0} trailing bytes after last element")]
    TrailingBytes(usize),
}

pub type Result<T> = std::result::Result<T, CodecError>;
