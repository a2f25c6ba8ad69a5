use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::config::CfpConfig;
use crate::error::{CfpError, Result};
use crate::frame::{CanFrame, CfpFrame};
use crate::identifier::FrameType;

/// A reassembled CFP payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfpMessage {
    pub src: u32,
    pub dst: u32,
    pub transaction_id: u32,
    pub payload: Bytes,
}

/// Outcome of feeding one frame to a [`Reassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyEvent {
    /// The frame was buffered; the transaction is still open.
    Pending,
    /// The frame completed a message.
    Delivered(CfpMessage),
    /// `requester` asked `target` to repeat a transaction.
    RetransmissionRequested {
        requester: u32,
        target: u32,
        transaction_id: u32,
    },
    /// Not addressed to this node, or a frame type this protocol ignores.
    Ignored,
}

type TransactionKey = (u32, u32, u32);

#[derive(Debug)]
struct Partial {
    data: BytesMut,
    expected_remain: u32,
}

/// Rebuilds payloads from CFP frames, one buffer per
/// `(src, dst, transaction_id)`.
#[derive(Debug)]
pub struct Reassembler {
    config: CfpConfig,
    local_node: Option<u32>,
    buffers: HashMap<TransactionKey, Partial>,
}

impl Reassembler {
    pub fn new(config: CfpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            local_node: None,
            buffers: HashMap::new(),
        })
    }

    /// Only accept frames whose destination is `node`.
    pub fn with_local_node(mut self, node: u32) -> Self {
        self.local_node = Some(node);
        self
    }

    /// Open transactions.
    pub fn pending(&self) -> usize {
        self.buffers.len()
    }

    /// Unpack a raw bus frame and feed it.
    pub fn accept_can(&mut self, frame: &CanFrame) -> Result<ReassemblyEvent> {
        let frame = CfpFrame::from_can(&self.config.layout, frame)?;
        self.accept(&frame)
    }

    /// Feed one frame.
    ///
    /// Sequencing errors discard the affected buffer and are returned as
    /// `SequenceAnomaly` or `UnknownTransaction`; the reassembler stays
    /// usable afterwards.
    pub fn accept(&mut self, frame: &CfpFrame) -> Result<ReassemblyEvent> {
        let id = frame.identifier;
        if self.local_node.is_some_and(|node| node != id.dst) {
            trace!(dst = id.dst, "frame for another node ignored");
            return Ok(ReassemblyEvent::Ignored);
        }
        if frame.data.len() > self.config.max_frame_data {
            return Err(CfpError::FrameDataTooLarge {
                len: frame.data.len(),
                max: self.config.max_frame_data,
            });
        }

        let key = (id.src, id.dst, id.transaction_id);
        match id.frame_type {
            FrameType::Start => {
                if self.buffers.remove(&key).is_some() {
                    debug!(
                        src = id.src,
                        dst = id.dst,
                        transaction_id = id.transaction_id,
                        "START reset an open transaction"
                    );
                }
                if id.remain == 0 {
                    return Ok(self.deliver(key, frame.data.clone()));
                }
                self.buffers.insert(
                    key,
                    Partial {
                        data: BytesMut::from(frame.data.as_ref()),
                        expected_remain: id.remain - 1,
                    },
                );
                Ok(ReassemblyEvent::Pending)
            }
            FrameType::Continue | FrameType::End => {
                let Some(mut partial) = self.buffers.remove(&key) else {
                    warn!(
                        src = id.src,
                        dst = id.dst,
                        transaction_id = id.transaction_id,
                        frame_type = %id.frame_type,
                        "frame for unknown transaction"
                    );
                    return Err(CfpError::UnknownTransaction {
                        src: id.src,
                        dst: id.dst,
                        transaction_id: id.transaction_id,
                    });
                };
                let is_end = id.frame_type == FrameType::End;
                if id.remain != partial.expected_remain || is_end != (id.remain == 0) {
                    warn!(
                        src = id.src,
                        dst = id.dst,
                        transaction_id = id.transaction_id,
                        expected = partial.expected_remain,
                        found = id.remain,
                        frame_type = %id.frame_type,
                        "sequence anomaly, transaction discarded"
                    );
                    return Err(CfpError::SequenceAnomaly {
                        src: id.src,
                        dst: id.dst,
                        transaction_id: id.transaction_id,
                        expected: partial.expected_remain,
                        found: id.remain,
                    });
                }
                partial.data.extend_from_slice(&frame.data);
                if is_end {
                    return Ok(self.deliver(key, partial.data.freeze()));
                }
                partial.expected_remain -= 1;
                self.buffers.insert(key, partial);
                Ok(ReassemblyEvent::Pending)
            }
            FrameType::RetransmitRequest => {
                // The request names the target's outbound transaction, so
                // the affected buffer is keyed target to requester.
                self.buffers.remove(&(id.dst, id.src, id.transaction_id));
                debug!(
                    requester = id.src,
                    target = id.dst,
                    transaction_id = id.transaction_id,
                    "retransmission requested"
                );
                Ok(ReassemblyEvent::RetransmissionRequested {
                    requester: id.src,
                    target: id.dst,
                    transaction_id: id.transaction_id,
                })
            }
            FrameType::Reserved(value) => {
                trace!(frame_type = value, "reserved frame type ignored");
                Ok(ReassemblyEvent::Ignored)
            }
        }
    }

    fn deliver(&self, key: TransactionKey, payload: Bytes) -> ReassemblyEvent {
        let (src, dst, transaction_id) = key;
        debug!(src, dst, transaction_id, bytes = payload.len(), "message reassembled");
        ReassemblyEvent::Delivered(CfpMessage {
            src,
            dst,
            transaction_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmenter::Fragmenter;
    use crate::identifier::{CfpIdentifier, IdentifierLayout};

    fn config() -> CfpConfig {
        CfpConfig::classic(IdentifierLayout::extended_default())
    }

    fn setup() -> (Fragmenter, Reassembler) {
        (
            Fragmenter::new(config()).unwrap(),
            Reassembler::new(config()).unwrap(),
        )
    }

    fn feed_all(reassembler: &mut Reassembler, frames: &[CfpFrame]) -> Vec<CfpMessage> {
        frames
            .iter()
            .filter_map(|frame| match reassembler.accept(frame) {
                Ok(ReassemblyEvent::Delivered(message)) => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn thirty_seven_bytes_reassemble() {
        let (fragmenter, mut reassembler) = setup();
        let payload: Vec<u8> = (0..37).collect();
        let frames = fragmenter.fragment(1, 2, payload.clone()).unwrap();

        for frame in &frames[..4] {
            assert_eq!(reassembler.accept(frame).unwrap(), ReassemblyEvent::Pending);
        }
        let ReassemblyEvent::Delivered(message) = reassembler.accept(&frames[4]).unwrap() else {
            panic!("END did not deliver");
        };
        assert_eq!(message.payload.as_ref(), payload.as_slice());
        assert_eq!((message.src, message.dst), (1, 2));
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn dropped_continue_is_never_delivered() {
        let (fragmenter, mut reassembler) = setup();
        let frames = fragmenter.fragment(1, 2, vec![0xAB; 37]).unwrap();

        reassembler.accept(&frames[0]).unwrap();
        reassembler.accept(&frames[1]).unwrap();
        // frames[2] lost on the bus
        let err = reassembler.accept(&frames[3]).unwrap_err();
        assert!(matches!(
            err,
            CfpError::SequenceAnomaly {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert_eq!(reassembler.pending(), 0);
        let err = reassembler.accept(&frames[4]).unwrap_err();
        assert!(matches!(err, CfpError::UnknownTransaction { .. }));
    }

    #[test]
    fn single_start_delivers_immediately() {
        let (fragmenter, mut reassembler) = setup();
        let frames = fragmenter.fragment(4, 5, &b"tiny"[..]).unwrap();
        let delivered = feed_all(&mut reassembler, &frames);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].payload.as_ref(), b"tiny");
    }

    #[test]
    fn empty_payload_delivers_empty_message() {
        let (fragmenter, mut reassembler) = setup();
        let frames = fragmenter.fragment(4, 5, Bytes::new()).unwrap();
        let delivered = feed_all(&mut reassembler, &frames);
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].payload.is_empty());
    }

    #[test]
    fn interleaved_transactions_are_independent() {
        let (fragmenter, mut reassembler) = setup();
        let a = fragmenter.fragment(1, 9, vec![1u8; 20]).unwrap();
        let b = fragmenter.fragment(2, 9, vec![2u8; 20]).unwrap();

        let mut delivered = Vec::new();
        for (fa, fb) in a.iter().zip(&b) {
            delivered.extend(feed_all(&mut reassembler, std::slice::from_ref(fa)));
            delivered.extend(feed_all(&mut reassembler, std::slice::from_ref(fb)));
        }
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].payload.as_ref(), &[1u8; 20]);
        assert_eq!(delivered[1].payload.as_ref(), &[2u8; 20]);
    }

    #[test]
    fn restarted_transaction_discards_old_data() {
        let (fragmenter, mut reassembler) = setup();
        let frames = fragmenter.fragment(1, 2, vec![7u8; 24]).unwrap();
        reassembler.accept(&frames[0]).unwrap();
        reassembler.accept(&frames[1]).unwrap();
        let delivered = feed_all(&mut reassembler, &frames);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].payload.len(), 24);
    }

    #[test]
    fn end_with_frames_outstanding_is_anomaly() {
        let (fragmenter, mut reassembler) = setup();
        let frames = fragmenter.fragment(1, 2, vec![0u8; 24]).unwrap();
        reassembler.accept(&frames[0]).unwrap();
        let mut early_end = frames[1].clone();
        early_end.identifier.frame_type = FrameType::End;
        let err = reassembler.accept(&early_end).unwrap_err();
        assert!(matches!(err, CfpError::SequenceAnomaly { .. }));
    }

    #[test]
    fn retransmission_request_surfaces() {
        let (fragmenter, mut reassembler) = setup();
        let request = fragmenter.retransmission_request(1, 2, 0);
        assert_eq!(
            reassembler.accept(&request).unwrap(),
            ReassemblyEvent::RetransmissionRequested {
                requester: 1,
                target: 2,
                transaction_id: 0
            }
        );
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn retransmission_request_resets_the_named_transaction() {
        // An observer holds node 2's partial tx 0 to node 1; node 1 then
        // asks node 2 to resend it.
        let (fragmenter, mut reassembler) = setup();
        let frames = fragmenter.fragment(2, 1, vec![3u8; 24]).unwrap();
        reassembler.accept(&frames[0]).unwrap();
        assert_eq!(reassembler.pending(), 1);

        let request = fragmenter.retransmission_request(1, 2, 0);
        reassembler.accept(&request).unwrap();
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn retransmission_request_leaves_inbound_transaction_alone() {
        // Node 1 is sending tx 0 to node 2 while also asking node 2 to
        // resend node 2's own tx 0.
        let (fragmenter, mut reassembler) = setup();
        let payload: Vec<u8> = (0..24).collect();
        let frames = fragmenter.fragment(1, 2, payload.clone()).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].identifier.transaction_id, 0);

        reassembler.accept(&frames[0]).unwrap();
        let request = fragmenter.retransmission_request(1, 2, 0);
        assert!(matches!(
            reassembler.accept(&request).unwrap(),
            ReassemblyEvent::RetransmissionRequested { .. }
        ));
        assert_eq!(reassembler.pending(), 1);

        let delivered = feed_all(&mut reassembler, &frames[1..]);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn destination_filter_ignores_other_nodes() {
        let fragmenter = Fragmenter::new(config()).unwrap();
        let mut reassembler = Reassembler::new(config()).unwrap().with_local_node(2);
        let other = fragmenter.fragment(1, 3, &b"not mine"[..]).unwrap();
        assert_eq!(reassembler.accept(&other[0]).unwrap(), ReassemblyEvent::Ignored);
        let mine = fragmenter.fragment(1, 2, &b"mine"[..]).unwrap();
        assert!(matches!(
            reassembler.accept(&mine[0]).unwrap(),
            ReassemblyEvent::Delivered(_)
        ));
    }

    #[test]
    fn accepts_raw_can_frames() {
        let (fragmenter, mut reassembler) = setup();
        let layout = IdentifierLayout::extended_default();
        let frames = fragmenter.fragment(1, 2, vec![5u8; 12]).unwrap();
        let mut last = ReassemblyEvent::Pending;
        for frame in &frames {
            last = reassembler.accept_can(&frame.to_can(&layout).unwrap()).unwrap();
        }
        assert!(matches!(last, ReassemblyEvent::Delivered(m) if m.payload.len() == 12));
    }

    #[test]
    fn oversized_frame_data_rejected() {
        let (_, mut reassembler) = setup();
        let frame = CfpFrame::new(
            CfpIdentifier {
                src: 1,
                dst: 2,
                frame_type: FrameType::Start,
                remain: 0,
                transaction_id: 0,
            },
            vec![0u8; 9],
        );
        assert!(matches!(
            reassembler.accept(&frame),
            Err(CfpError::FrameDataTooLarge { len: 9, max: 8 })
        ));
    }
}
