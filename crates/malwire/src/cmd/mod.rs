use clap::{Args, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use malwire_codec::{ElementCodec, ElementKind, Value, WireCodec};
use malwire_link::SppConfig;
use tracing::warn;

use crate::exit::{io_error, link_error, CliError, CliResult, DATA_INVALID};
use crate::output::OutputFormat;

pub mod fragment;
pub mod header;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one message over a Space Packet link.
    Send(SendArgs),
    /// Accept Space Packet links and print received messages.
    Listen(ListenArgs),
    /// Show how a payload splits into CFP frames.
    Fragment(FragmentArgs),
    /// Decode a 6-byte Space Packet primary header.
    Header(HeaderArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args),
        Command::Listen(args) => listen::run(args, format),
        Command::Fragment(args) => fragment::run(args, format),
        Command::Header(args) => header::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Peer address (`malspp://host:port/apid` or `host:port`).
    pub addr: String,
    /// JSON link configuration.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// APID for outbound packets.
    #[arg(long)]
    pub apid: Option<u16>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Send the payload bytes as-is instead of as an encoded blob element.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (`malspp://host:port/apid` or `host:port`).
    pub addr: String,
    /// JSON link configuration.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// APID for packets sent back on accepted links.
    #[arg(long)]
    pub apid: Option<u16>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print message bodies as received instead of decoding a blob element.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct FragmentArgs {
    /// Source node.
    #[arg(long, default_value = "1")]
    pub src: u32,
    /// Destination node.
    #[arg(long, default_value = "2")]
    pub dst: u32,
    /// Data bytes per frame (8 for classic CAN, up to 64 for CAN FD).
    #[arg(long, default_value = "8")]
    pub frame_data: usize,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HeaderArgs {
    /// Twelve hex digits, optionally `0x`-prefixed or space separated.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn load_config(path: Option<&Path>, apid: Option<u16>) -> CliResult<SppConfig> {
    let mut config = match path {
        Some(path) => {
            SppConfig::from_json_file(path).map_err(|err| link_error("invalid config", err))?
        }
        None => SppConfig::default(),
    };
    if let Some(apid) = apid {
        config.apid = apid;
    }
    Ok(config)
}

fn read_payload(data: Option<&str>, file: Option<&Path>) -> CliResult<Vec<u8>> {
    if let Some(data) = data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Wrap application bytes as a single blob element.
fn encode_payload(codec: &WireCodec, payload: Vec<u8>) -> CliResult<Vec<u8>> {
    codec
        .encode(&[Some(Value::Blob(payload.into()))])
        .map(|bytes| bytes.to_vec())
        .map_err(|err| CliError::new(DATA_INVALID, format!("encode failed: {err}")))
}

/// Unwrap a single blob element; bodies that are not one are shown as-is.
fn decode_payload(codec: &WireCodec, body: &[u8]) -> Vec<u8> {
    match codec.decode(body, &[ElementKind::Blob]) {
        Ok(elements) => match elements.as_slice() {
            [Some(Value::Blob(blob))] => blob.to_vec(),
            _ => Vec::new(),
        },
        Err(err) => {
            warn!(error = %err, "body is not a {} blob element", codec.strategy());
            body.to_vec()
        }
    }
}
