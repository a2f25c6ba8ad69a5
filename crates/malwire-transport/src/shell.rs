//! The contract every physical-link binding implements.
//!
//! A transport moves already-encoded message bytes. It does not encode,
//! frame or fragment on behalf of its caller; bindings plug the Space Packet
//! framer or the CAN fragmentation protocol in behind this seam.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Interaction patterns a transport may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Send,
    Submit,
    Request,
    Invoke,
    Progress,
    PubSub,
}

impl InteractionType {
    pub const ALL: [InteractionType; 6] = [
        Self::Send,
        Self::Submit,
        Self::Request,
        Self::Invoke,
        Self::Progress,
        Self::PubSub,
    ];
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Send => "send",
            Self::Submit => "submit",
            Self::Request => "request",
            Self::Invoke => "invoke",
            Self::Progress => "progress",
            Self::PubSub => "pubsub",
        };
        f.write_str(name)
    }
}

/// Quality-of-service levels a transport may honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosLevel {
    BestEffort,
    Assured,
    Queued,
    Timely,
}

/// Free-form properties attached to a received message by its link.
pub type QosProperties = BTreeMap<String, String>;

/// Property key carrying the remote end's transport address.
pub const PROPERTY_SOURCE: &str = "source";

/// A complete message body handed up by a link's listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Transport address of the sender, as far as the link can tell.
    pub source: String,
    /// The reassembled, integrity-checked body.
    pub body: Bytes,
    /// Link-specific metadata (APID, qualifier, node ids...).
    pub properties: QosProperties,
}

impl InboundMessage {
    pub fn new(source: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let source = source.into();
        let mut properties = QosProperties::new();
        properties.insert(PROPERTY_SOURCE.to_string(), source.clone());
        Self {
            source,
            body: body.into(),
            properties,
        }
    }

    /// Attach one property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.properties.insert(key.into(), value.to_string());
        self
    }
}

/// A physical-link binding.
///
/// All methods take `&self`: bindings serialise their own writes, and
/// `close` may run concurrently with an in-flight send.
pub trait Transport: Send + Sync {
    /// Stable textual identity of this link instance.
    fn create_transport_address(&self) -> String;

    /// Deliver already-encoded bytes (blocking).
    ///
    /// Once the transport is closed this returns `Ok(())` without sending.
    fn send_encoded_message(&self, bytes: &[u8]) -> Result<()>;

    /// Dequeue the next complete inbound message (blocking).
    ///
    /// Returns [`TransportError::Shutdown`](crate::TransportError::Shutdown)
    /// once the link is closed and its queue is drained.
    fn receive(&self) -> Result<InboundMessage>;

    fn is_supported_interaction_type(&self, interaction: InteractionType) -> bool;

    fn is_supported_qos_level(&self, level: QosLevel) -> bool;

    /// Close the link. Idempotent.
    fn close(&self) -> Result<()>;

    /// True once `close` has been called.
    fn is_closed(&self) -> bool;
}
