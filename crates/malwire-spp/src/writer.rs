use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::config::PacketConfig;
use crate::error::{Result, SppError};
use crate::packet::{encode_packet, SpacePacket};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete Space Packets to any `Write` stream.
///
/// The stream is expected to block. `WouldBlock` and `TimedOut` mean an
/// elapsed write timeout and are returned as [`SppError::Io`]; the packet
/// may then be partially written.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    config: PacketConfig,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer with default framing.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new packet writer with explicit framing.
    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and write a complete packet (blocking), then flush.
    pub fn write_packet(&mut self, packet: &SpacePacket) -> Result<()> {
        self.buf.clear();
        encode_packet(packet, &self.config, &mut self.buf)?;
        self.write_buffered()
    }

    /// Write several packets back to back, flushing once at the end.
    pub fn write_all_packets<'a, I>(&mut self, packets: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a SpacePacket>,
    {
        self.buf.clear();
        for packet in packets {
            encode_packet(packet, &self.config, &mut self.buf)?;
        }
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(SppError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(SppError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(SppError::Io(err)),
            }
        }
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
