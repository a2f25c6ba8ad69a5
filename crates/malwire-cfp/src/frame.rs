use bytes::Bytes;

use crate::error::{CfpError, Result};
use crate::identifier::{CfpIdentifier, FrameType, IdentifierLayout};

/// Data capacity of a classic CAN frame.
pub const CLASSIC_FRAME_DATA: usize = 8;
/// Data capacity of a CAN FD frame.
pub const FD_FRAME_DATA: usize = 64;

/// A raw extended-identifier CAN frame as seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u32,
    pub data: Bytes,
}

impl CanFrame {
    pub fn new(id: u32, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

/// A CAN frame with its identifier unpacked under a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfpFrame {
    pub identifier: CfpIdentifier,
    pub data: Bytes,
}

impl CfpFrame {
    pub fn new(identifier: CfpIdentifier, data: impl Into<Bytes>) -> Self {
        Self {
            identifier,
            data: data.into(),
        }
    }

    pub fn frame_type(&self) -> FrameType {
        self.identifier.frame_type
    }

    pub fn to_can(&self, layout: &IdentifierLayout) -> Result<CanFrame> {
        if self.data.len() > FD_FRAME_DATA {
            return Err(CfpError::FrameDataTooLarge {
                len: self.data.len(),
                max: FD_FRAME_DATA,
            });
        }
        Ok(CanFrame {
            id: layout.pack(&self.identifier)?,
            data: self.data.clone(),
        })
    }

    pub fn from_can(layout: &IdentifierLayout, frame: &CanFrame) -> Result<Self> {
        Ok(Self {
            identifier: layout.unpack(frame.id)?,
            data: frame.data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_conversion_roundtrip() {
        let layout = IdentifierLayout::extended_default();
        let frame = CfpFrame::new(
            CfpIdentifier {
                src: 3,
                dst: 9,
                frame_type: FrameType::End,
                remain: 0,
                transaction_id: 17,
            },
            &b"tail"[..],
        );
        let can = frame.to_can(&layout).unwrap();
        assert_eq!(CfpFrame::from_can(&layout, &can).unwrap(), frame);
    }

    #[test]
    fn oversized_data_rejected() {
        let layout = IdentifierLayout::extended_default();
        let frame = CfpFrame::new(
            CfpIdentifier {
                src: 0,
                dst: 0,
                frame_type: FrameType::Start,
                remain: 0,
                transaction_id: 0,
            },
            vec![0u8; FD_FRAME_DATA + 1],
        );
        assert!(matches!(
            frame.to_can(&layout),
            Err(CfpError::FrameDataTooLarge { len: 65, max: 64 })
        ));
    }
}
