use std::io::Read;

use crate::config::PacketConfig;
use crate::error::Result;
use crate::packet::{read_packet, SpacePacket};

/// Reads complete Space Packets from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete packets.
pub struct PacketReader<T> {
    inner: T,
    config: PacketConfig,
}

impl<T: Read> PacketReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(SppError::ConnectionClosed)` when EOF falls between
    /// packets and `Err(SppError::Truncated)` when it falls inside one.
    pub fn read_packet(&mut self) -> Result<SpacePacket> {
        read_packet(&mut self.inner, &self.config)
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &PacketConfig {
        &self.config
    }
}
