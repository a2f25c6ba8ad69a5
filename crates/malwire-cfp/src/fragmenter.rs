use bytes::Bytes;
use malwire_transport::SequenceCounter;
use tracing::debug;

use crate::config::CfpConfig;
use crate::error::{CfpError, Result};
use crate::frame::CfpFrame;
use crate::identifier::{CfpIdentifier, FrameType};

/// Splits payloads into CFP transactions.
///
/// Each call to [`fragment`](Self::fragment) draws a fresh transaction id
/// from a counter wrapping at `2^transaction_bits`.
#[derive(Debug)]
pub struct Fragmenter {
    config: CfpConfig,
    transactions: SequenceCounter,
}

impl Fragmenter {
    pub fn new(config: CfpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transactions: SequenceCounter::new(config.layout.transaction_wrap())?,
            config,
        })
    }

    pub fn config(&self) -> &CfpConfig {
        &self.config
    }

    /// The transaction id counter.
    pub fn transactions(&self) -> &SequenceCounter {
        &self.transactions
    }

    /// Frames needed for a payload of `len` bytes.
    pub fn frames_for(&self, len: usize) -> usize {
        len.div_ceil(self.config.max_frame_data).max(1)
    }

    /// Fragment `payload` from `src` to `dst` under a new transaction id.
    ///
    /// The first frame is START and the last END; frames in between are
    /// CONTINUE. `remain` counts the frames still to follow, so a payload
    /// that fits one frame is a lone START with `remain == 0`.
    pub fn fragment(&self, src: u32, dst: u32, payload: impl Into<Bytes>) -> Result<Vec<CfpFrame>> {
        let payload = payload.into();
        let frames = self.frames_for(payload.len());
        let max_frames = self.config.layout.max_frames();
        if frames as u64 > max_frames {
            return Err(CfpError::PayloadTooLarge {
                size: payload.len(),
                frames,
                max_frames,
            });
        }

        let mut start = CfpIdentifier {
            src,
            dst,
            frame_type: FrameType::Start,
            remain: (frames - 1) as u32,
            transaction_id: 0,
        };
        // Reject node ids that do not fit before consuming a transaction id.
        self.config.layout.pack(&start)?;
        // Transaction ids wrap below 2^29.
        let transaction_id = self.transactions.next_value() as u32;
        start.transaction_id = transaction_id;

        let chunk = self.config.max_frame_data;
        let out: Vec<CfpFrame> = (0..frames)
            .map(|index| {
                let begin = index * chunk;
                let end = (begin + chunk).min(payload.len());
                let frame_type = match index {
                    0 => FrameType::Start,
                    i if i + 1 == frames => FrameType::End,
                    _ => FrameType::Continue,
                };
                let identifier = CfpIdentifier {
                    frame_type,
                    remain: (frames - 1 - index) as u32,
                    ..start
                };
                CfpFrame::new(identifier, payload.slice(begin..end))
            })
            .collect();
        debug!(
            src,
            dst,
            transaction_id,
            frames,
            bytes = payload.len(),
            "fragmented payload"
        );
        Ok(out)
    }

    /// A request for `dst` to repeat transaction `transaction_id`.
    pub fn retransmission_request(&self, src: u32, dst: u32, transaction_id: u32) -> CfpFrame {
        CfpFrame::new(
            CfpIdentifier {
                src,
                dst,
                frame_type: FrameType::RetransmitRequest,
                remain: 0,
                transaction_id,
            },
            Bytes::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IdentifierLayout;

    fn fragmenter(frame_data: usize) -> Fragmenter {
        let config =
            CfpConfig::classic(IdentifierLayout::extended_default()).with_frame_data(frame_data);
        Fragmenter::new(config).unwrap()
    }

    #[test]
    fn thirty_seven_bytes_in_eight_byte_frames() {
        let payload: Vec<u8> = (0..37).collect();
        let frames = fragmenter(8).fragment(1, 2, payload).unwrap();

        assert_eq!(frames.len(), 5);
        let types: Vec<_> = frames.iter().map(CfpFrame::frame_type).collect();
        assert_eq!(
            types,
            [
                FrameType::Start,
                FrameType::Continue,
                FrameType::Continue,
                FrameType::Continue,
                FrameType::End
            ]
        );
        let remains: Vec<_> = frames.iter().map(|f| f.identifier.remain).collect();
        assert_eq!(remains, [4, 3, 2, 1, 0]);
        assert_eq!(frames[4].data.len(), 5);
        assert!(frames.iter().all(|f| f.identifier.transaction_id == 0));
    }

    #[test]
    fn single_frame_payload_is_lone_start() {
        let frames = fragmenter(8).fragment(1, 2, &b"12345678"[..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_type(), FrameType::Start);
        assert_eq!(frames[0].identifier.remain, 0);
    }

    #[test]
    fn empty_payload_is_lone_start() {
        let frames = fragmenter(8).fragment(1, 2, Bytes::new()).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].data.is_empty());
    }

    #[test]
    fn two_frames_have_no_continue() {
        let frames = fragmenter(8).fragment(1, 2, vec![0u8; 9]).unwrap();
        let types: Vec<_> = frames.iter().map(CfpFrame::frame_type).collect();
        assert_eq!(types, [FrameType::Start, FrameType::End]);
    }

    #[test]
    fn transaction_ids_advance_and_wrap() {
        let fragmenter = fragmenter(8);
        let ids: Vec<u32> = (0..34)
            .map(|_| fragmenter.fragment(1, 2, &b"x"[..]).unwrap()[0].identifier.transaction_id)
            .collect();
        assert_eq!(&ids[..3], &[0, 1, 2]);
        assert_eq!(&ids[31..], &[31, 0, 1]);
    }

    #[test]
    fn payload_beyond_remain_capacity_rejected() {
        let layout = IdentifierLayout::new(7, 7, 2, 2, 5).unwrap();
        let fragmenter = Fragmenter::new(CfpConfig::classic(layout)).unwrap();
        // 2 remain bits allow 4 frames of 8 bytes.
        assert_eq!(fragmenter.fragment(1, 2, vec![0u8; 32]).unwrap().len(), 4);
        let err = fragmenter.fragment(1, 2, vec![0u8; 33]).unwrap_err();
        assert!(matches!(
            err,
            CfpError::PayloadTooLarge {
                size: 33,
                frames: 5,
                max_frames: 4
            }
        ));
    }

    #[test]
    fn node_out_of_range_rejected() {
        let err = fragmenter(8).fragment(200, 2, &b"x"[..]).unwrap_err();
        assert!(matches!(err, CfpError::FieldOverflow { field: "src", .. }));
    }

    #[test]
    fn fd_frames_carry_more_data() {
        let frames = fragmenter(64).fragment(1, 2, vec![0u8; 100]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data.len(), 64);
    }

    #[test]
    fn retransmission_request_frame() {
        let frame = fragmenter(8).retransmission_request(2, 1, 7);
        assert_eq!(frame.frame_type(), FrameType::RetransmitRequest);
        assert_eq!(frame.identifier.transaction_id, 7);
        assert!(frame.data.is_empty());
    }
}
