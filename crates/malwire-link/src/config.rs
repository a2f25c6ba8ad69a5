use std::path::Path;
use std::time::Duration;

use malwire_cfp::CfpConfig;
use malwire_codec::CodecStrategy;
use malwire_spp::{
    PacketConfig, PacketType, SpacePacketHeader, DEFAULT_MAX_MESSAGE_SIZE, MAX_APID, MAX_BODY_SIZE,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Default number of sent CAN transactions kept for retransmission.
pub const DEFAULT_RESEND_CACHE: usize = 8;

/// Settings for a Space Packet link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SppConfig {
    /// APID stamped on outbound packets.
    pub apid: u16,
    pub packet_type: PacketType,
    pub secondary_header_flag: bool,
    /// Qualifier written on outbound packets in qualifier-in-message mode.
    pub apid_qualifier: u16,
    pub framing: PacketConfig,
    /// Largest body per packet before a message is segmented.
    pub max_packet_body: usize,
    /// Bound on a reassembled inbound message.
    pub max_message_size: usize,
    pub write_timeout_ms: Option<u64>,
    /// Hand-off queue bound; `None` is unbounded.
    pub queue_capacity: Option<usize>,
    /// Element codec used by message endpoints on this link.
    pub codec: CodecStrategy,
}

impl Default for SppConfig {
    fn default() -> Self {
        Self {
            apid: 0,
            packet_type: PacketType::Telemetry,
            secondary_header_flag: false,
            apid_qualifier: 0,
            framing: PacketConfig::default(),
            max_packet_body: MAX_BODY_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            write_timeout_ms: None,
            queue_capacity: None,
            codec: CodecStrategy::default(),
        }
    }
}

impl SppConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.apid > MAX_APID {
            return Err(LinkError::Config(format!(
                "apid {} exceeds {MAX_APID}",
                self.apid
            )));
        }
        if self.max_packet_body == 0 {
            return Err(LinkError::Config("max_packet_body must be at least 1".into()));
        }
        if self.queue_capacity == Some(0) {
            return Err(LinkError::Config("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Header template for outbound packets.
    pub fn header_template(&self) -> SpacePacketHeader {
        SpacePacketHeader {
            packet_type: self.packet_type,
            secondary_header_flag: self.secondary_header_flag,
            ..SpacePacketHeader::telemetry(self.apid, 0)
        }
    }

    /// Segment size that still fits the data field once a CRC is added.
    pub fn effective_packet_body(&self) -> usize {
        self.max_packet_body
            .min(self.framing.effective_max_body())
            .min(MAX_BODY_SIZE - self.framing.crc_len())
            .max(1)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for a CFP link over a CAN bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanLinkConfig {
    /// This node's address; frames for other nodes are ignored.
    pub local_node: u32,
    /// Destination of outbound messages.
    pub peer_node: u32,
    pub cfp: CfpConfig,
    /// Sent transactions kept to answer retransmission requests.
    #[serde(default = "default_resend_cache")]
    pub resend_cache: usize,
    /// Ask the sender to repeat a transaction after a sequencing anomaly.
    #[serde(default)]
    pub request_retransmission: bool,
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

fn default_resend_cache() -> usize {
    DEFAULT_RESEND_CACHE
}

impl CanLinkConfig {
    pub fn new(local_node: u32, peer_node: u32, cfp: CfpConfig) -> Self {
        Self {
            local_node,
            peer_node,
            cfp,
            resend_cache: DEFAULT_RESEND_CACHE,
            request_retransmission: false,
            queue_capacity: None,
        }
    }

    pub fn with_retransmission(mut self, enabled: bool) -> Self {
        self.request_retransmission = enabled;
        self
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        self.cfp.validate()?;
        let max_node = self.cfp.layout.max_node();
        for (name, node) in [("local_node", self.local_node), ("peer_node", self.peer_node)] {
            if node > max_node {
                return Err(LinkError::Config(format!(
                    "{name} {node} exceeds layout maximum {max_node}"
                )));
            }
        }
        if self.queue_capacity == Some(0) {
            return Err(LinkError::Config("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| LinkError::ConfigFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use malwire_cfp::IdentifierLayout;
    use malwire_spp::CrcAlgorithm;

    use super::*;

    #[test]
    fn spp_config_from_partial_json() {
        let config: SppConfig = serde_json::from_str(
            r#"{ "apid": 42, "framing": { "crc": "ccitt_false" }, "codec": "split" }"#,
        )
        .unwrap();
        assert_eq!(config.apid, 42);
        assert_eq!(config.framing.crc, Some(CrcAlgorithm::CcittFalse));
        assert!(!config.framing.qualifier_in_message);
        assert_eq!(config.codec, CodecStrategy::Split);
        assert_eq!(config.max_packet_body, MAX_BODY_SIZE);
    }

    #[test]
    fn spp_config_from_file() {
        let path = std::env::temp_dir().join(format!("malwire-spp-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "apid": 7, "queue_capacity": 4 }"#).unwrap();
        let config = SppConfig::from_json_file(&path).unwrap();
        assert_eq!(config.apid, 7);
        assert_eq!(config.queue_capacity, Some(4));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = SppConfig::from_json_file("/nonexistent/malwire.json").unwrap_err();
        assert!(matches!(err, LinkError::ConfigFile { .. }));
    }

    #[test]
    fn spp_validation() {
        assert!(SppConfig::default().validate().is_ok());
        let bad_apid = SppConfig {
            apid: 4096,
            ..SppConfig::default()
        };
        assert!(matches!(bad_apid.validate(), Err(LinkError::Config(_))));
        let bad_queue = SppConfig {
            queue_capacity: Some(0),
            ..SppConfig::default()
        };
        assert!(bad_queue.validate().is_err());
    }

    #[test]
    fn segment_size_leaves_room_for_crc() {
        let mut config = SppConfig::default();
        assert_eq!(config.effective_packet_body(), MAX_BODY_SIZE);
        config.framing.crc = Some(CrcAlgorithm::Xmodem);
        assert_eq!(config.effective_packet_body(), MAX_BODY_SIZE - 2);
        config.max_packet_body = 100;
        assert_eq!(config.effective_packet_body(), 100);
    }

    #[test]
    fn can_config_requires_layout() {
        let json = r#"{
            "local_node": 1,
            "peer_node": 2,
            "cfp": { "layout": { "src_bits": 7, "dst_bits": 7, "type_bits": 2,
                                 "remain_bits": 8, "transaction_bits": 5 } }
        }"#;
        let config: CanLinkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cfp.layout, IdentifierLayout::extended_default());
        assert_eq!(config.cfp.max_frame_data, 8);
        assert_eq!(config.resend_cache, DEFAULT_RESEND_CACHE);
        assert!(config.validate().is_ok());

        let missing: std::result::Result<CanLinkConfig, _> =
            serde_json::from_str(r#"{ "local_node": 1, "peer_node": 2 }"#);
        assert!(missing.is_err());
    }

    #[test]
    fn can_nodes_must_fit_layout() {
        let config = CanLinkConfig::new(
            1,
            500,
            CfpConfig::classic(IdentifierLayout::extended_default()),
        );
        assert!(matches!(config.validate(), Err(LinkError::Config(_))));
    }
}
