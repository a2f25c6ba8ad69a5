use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The type of one element slot in a message body.
///
/// The numeric value doubles as the plain-binary type tag; `0` is reserved
/// for null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ElementKind {
    Boolean = 1,
    Octet = 2,
    UOctet = 3,
    Short = 4,
    UShort = 5,
    Integer = 6,
    UInteger = 7,
    Long = 8,
    ULong = 9,
    Float = 10,
    Double = 11,
    String = 12,
    Identifier = 13,
    Uri = 14,
    Blob = 15,
    Time = 16,
    FineTime = 17,
    Duration = 18,
}

/// Tag written in place of a type tag for a null element.
pub const NULL_TAG: u8 = 0;

impl ElementKind {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            1 => Self::Boolean,
            2 => Self::Octet,
            3 => Self::UOctet,
            4 => Self::Short,
            5 => Self::UShort,
            6 => Self::Integer,
            7 => Self::UInteger,
            8 => Self::Long,
            9 => Self::ULong,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::String,
            13 => Self::Identifier,
            14 => Self::Uri,
            15 => Self::Blob,
            16 => Self::Time,
            17 => Self::FineTime,
            18 => Self::Duration,
            _ => return None,
        };
        Some(kind)
    }

    /// Encoded width of the value for fixed-size kinds; `None` for
    /// length-prefixed kinds.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Octet | Self::UOctet => Some(1),
            Self::Short | Self::UShort => Some(2),
            Self::Integer | Self::UInteger | Self::Float => Some(4),
            Self::Long | Self::ULong | Self::Double => Some(8),
            Self::Time | Self::FineTime | Self::Duration => Some(8),
            Self::String | Self::Identifier | Self::Uri | Self::Blob => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Octet(i8),
    UOctet(u8),
    Short(i16),
    UShort(u16),
    Integer(i32),
    UInteger(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Identifier(String),
    Uri(String),
    Blob(Bytes),
    /// Milliseconds since the Unix epoch.
    Time(u64),
    /// Nanoseconds since the Unix epoch.
    FineTime(u64),
    /// Seconds.
    Duration(f64),
}

impl Value {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Boolean(_) => ElementKind::Boolean,
            Self::Octet(_) => ElementKind::Octet,
            Self::UOctet(_) => ElementKind::UOctet,
            Self::Short(_) => ElementKind::Short,
            Self::UShort(_) => ElementKind::UShort,
            Self::Integer(_) => ElementKind::Integer,
            Self::UInteger(_) => ElementKind::UInteger,
            Self::Long(_) => ElementKind::Long,
            Self::ULong(_) => ElementKind::ULong,
            Self::Float(_) => ElementKind::Float,
            Self::Double(_) => ElementKind::Double,
            Self::String(_) => ElementKind::String,
            Self::Identifier(_) => ElementKind::Identifier,
            Self::Uri(_) => ElementKind::Uri,
            Self::Blob(_) => ElementKind::Blob,
            Self::Time(_) => ElementKind::Time,
            Self::FineTime(_) => ElementKind::FineTime,
            Self::Duration(_) => ElementKind::Duration,
        }
    }
}

/// One slot of a message body. `None` is a null element.
pub type Element = Option<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for tag in 1..=18u8 {
            let kind = ElementKind::from_tag(tag).expect("tag should be known");
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(ElementKind::from_tag(NULL_TAG), None);
        assert_eq!(ElementKind::from_tag(19), None);
    }

    #[test]
    fn value_reports_kind() {
        assert_eq!(Value::Boolean(true).kind(), ElementKind::Boolean);
        assert_eq!(
            Value::Blob(Bytes::from_static(b"x")).kind(),
            ElementKind::Blob
        );
        assert_eq!(Value::Duration(1.5).kind(), ElementKind::Duration);
    }

    #[test]
    fn fixed_widths() {
        assert_eq!(ElementKind::UShort.fixed_width(), Some(2));
        assert_eq!(ElementKind::Time.fixed_width(), Some(8));
        assert_eq!(ElementKind::String.fixed_width(), None);
    }
}
