//! Splitting message bodies across packets and stitching them back.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use malwire_transport::SequenceCounter;
use tracing::{debug, warn};

use crate::error::{Result, SppError};
use crate::header::{SequenceFlags, SpacePacketHeader, SEQUENCE_COUNT_WRAP};
use crate::packet::{SpacePacket, MAX_BODY_SIZE};

/// Default bound on a reassembled message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Cuts outbound bodies into packets no larger than `max_segment_body`.
///
/// Every packet draws its sequence count from a shared 14-bit counter, so
/// segments of one message carry consecutive counts.
#[derive(Debug)]
pub struct Segmenter {
    template: SpacePacketHeader,
    apid_qualifier: u16,
    max_segment_body: usize,
    counter: SequenceCounter,
}

impl Segmenter {
    /// `template` supplies version, type, APID and secondary header flag;
    /// its sequence fields are overwritten per packet.
    pub fn new(template: SpacePacketHeader, max_segment_body: usize) -> Result<Self> {
        Ok(Self {
            template,
            apid_qualifier: 0,
            max_segment_body: max_segment_body.clamp(1, MAX_BODY_SIZE),
            counter: SequenceCounter::new(SEQUENCE_COUNT_WRAP)?,
        })
    }

    pub fn with_qualifier(mut self, apid_qualifier: u16) -> Self {
        self.apid_qualifier = apid_qualifier;
        self
    }

    pub fn max_segment_body(&self) -> usize {
        self.max_segment_body
    }

    pub fn counter(&self) -> &SequenceCounter {
        &self.counter
    }

    /// Split `body` into one or more packets in transmission order.
    pub fn segment(&self, body: impl Into<Bytes>) -> Vec<SpacePacket> {
        let body = body.into();
        let segments = body.len().div_ceil(self.max_segment_body).max(1);
        // Counts wrap at 2^14, so narrowing to u16 is lossless.
        let counts = self.counter.increment(segments as i64);

        let packets: Vec<SpacePacket> = counts
            .enumerate()
            .map(|(index, count)| {
                let start = index * self.max_segment_body;
                let end = (start + self.max_segment_body).min(body.len());
                let mut header = self.template;
                header.sequence_count = count as u16;
                header.sequence_flags = flags_for(index, segments);
                SpacePacket::new(header, body.slice(start..end)).with_qualifier(self.apid_qualifier)
            })
            .collect();
        if segments > 1 {
            debug!(
                apid = self.template.apid,
                segments,
                bytes = body.len(),
                "segmented message body"
            );
        }
        packets
    }
}

fn flags_for(index: usize, segments: usize) -> SequenceFlags {
    match (index, segments) {
        (_, 1) => SequenceFlags::Unsegmented,
        (0, _) => SequenceFlags::First,
        (i, n) if i + 1 == n => SequenceFlags::Last,
        _ => SequenceFlags::Continuation,
    }
}

#[derive(Debug)]
struct Partial {
    first: SpacePacket,
    body: BytesMut,
    last_count: u16,
}

/// Rebuilds segmented messages, one in-flight message per qualifier/APID.
#[derive(Debug)]
pub struct Desegmenter {
    partial: HashMap<(u16, u16), Partial>,
    max_message_size: usize,
}

impl Default for Desegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl Desegmenter {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            partial: HashMap::new(),
            max_message_size,
        }
    }

    /// Number of messages currently being reassembled.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    /// Feed one packet.
    ///
    /// Returns the complete message when `packet` finishes one, with the
    /// first segment's header marked unsegmented. A continuation or last
    /// segment that does not follow its predecessor discards the partial
    /// message and returns `SequenceAnomaly`.
    pub fn accept(&mut self, packet: SpacePacket) -> Result<Option<SpacePacket>> {
        let key = (packet.apid_qualifier, packet.header.apid);
        let count = packet.header.sequence_count;

        match packet.header.sequence_flags {
            SequenceFlags::Unsegmented => {
                if self.partial.remove(&key).is_some() {
                    warn!(apid = key.1, "unsegmented packet interrupted a segmented message");
                }
                self.check_size(packet.body.len())?;
                Ok(Some(packet))
            }
            SequenceFlags::First => {
                if self.partial.remove(&key).is_some() {
                    warn!(apid = key.1, "new first segment discarded an unfinished message");
                }
                self.check_size(packet.body.len())?;
                let body = BytesMut::from(packet.body.as_ref());
                self.partial.insert(
                    key,
                    Partial {
                        first: packet,
                        body,
                        last_count: count,
                    },
                );
                Ok(None)
            }
            flags @ (SequenceFlags::Continuation | SequenceFlags::Last) => {
                let Some(mut partial) = self.partial.remove(&key) else {
                    warn!(apid = key.1, count, "segment without a first segment");
                    return Err(SppError::SequenceAnomaly {
                        apid: key.1,
                        expected: None,
                        found: count,
                    });
                };
                let expected = next_count(partial.last_count);
                if count != expected {
                    warn!(apid = key.1, expected, count, "segment sequence gap, message discarded");
                    return Err(SppError::SequenceAnomaly {
                        apid: key.1,
                        expected: Some(expected),
                        found: count,
                    });
                }
                self.check_size(partial.body.len() + packet.body.len())?;
                partial.body.extend_from_slice(&packet.body);
                partial.last_count = count;

                if flags == SequenceFlags::Continuation {
                    self.partial.insert(key, partial);
                    return Ok(None);
                }
                let mut message = partial.first;
                message.header.sequence_flags = SequenceFlags::Unsegmented;
                message.body = partial.body.freeze();
                Ok(Some(message))
            }
        }
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            return Err(SppError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

fn next_count(count: u16) -> u16 {
    ((u64::from(count) + 1) % SEQUENCE_COUNT_WRAP) as u16
}
