use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use malwire_transport::{InboundMessage, QosProperties};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    source: &'a str,
    payload_size: usize,
    payload: String,
    properties: &'a QosProperties,
    timestamp: String,
}

/// Print one received message. `payload` is the decoded application data.
pub fn print_message(message: &InboundMessage, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                source: &message.source,
                payload_size: payload.len(),
                payload: payload_preview(payload),
                properties: &message.properties,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOURCE", "SIZE", "PROPERTIES", "PAYLOAD"])
                .add_row(vec![
                    message.source.clone(),
                    payload.len().to_string(),
                    properties_line(&message.properties),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "source={} size={} {} payload={}",
                message.source,
                payload.len(),
                properties_line(&message.properties),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

/// One CFP frame as shown by `fragment`.
#[derive(Debug, Serialize)]
pub struct FrameRow {
    pub index: usize,
    pub frame_type: String,
    pub remain: u32,
    pub transaction_id: u32,
    pub can_id: String,
    pub data: String,
}

pub fn print_frames(frames: &[FrameRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&frames),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "REMAIN", "TX", "CAN ID", "DATA"]);
            for frame in frames {
                table.add_row(vec![
                    frame.index.to_string(),
                    frame.frame_type.clone(),
                    frame.remain.to_string(),
                    frame.transaction_id.to_string(),
                    frame.can_id.clone(),
                    frame.data.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for frame in frames {
                println!(
                    "{} {} {:<8} remain={} tx={} data={}",
                    frame.index,
                    frame.can_id,
                    frame.frame_type,
                    frame.remain,
                    frame.transaction_id,
                    frame.data
                );
            }
        }
    }
}

/// Decoded primary header fields.
#[derive(Debug, Serialize)]
pub struct HeaderView {
    pub version: u8,
    pub packet_type: malwire_spp::PacketType,
    pub secondary_header_flag: bool,
    pub apid: u16,
    pub sequence_flags: malwire_spp::SequenceFlags,
    pub sequence_count: u16,
    pub data_length: u32,
}

pub fn print_header(header: &HeaderView, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(header),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["version".to_string(), header.version.to_string()])
                .add_row(vec![
                    "packet_type".to_string(),
                    format!("{:?}", header.packet_type),
                ])
                .add_row(vec![
                    "secondary_header".to_string(),
                    header.secondary_header_flag.to_string(),
                ])
                .add_row(vec!["apid".to_string(), header.apid.to_string()])
                .add_row(vec![
                    "sequence_flags".to_string(),
                    format!("{:?}", header.sequence_flags),
                ])
                .add_row(vec![
                    "sequence_count".to_string(),
                    header.sequence_count.to_string(),
                ])
                .add_row(vec![
                    "data_length".to_string(),
                    header.data_length.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "version={} type={:?} sec_hdr={} apid={} flags={:?} count={} data_length={}",
                header.version,
                header.packet_type,
                header.secondary_header_flag,
                header.apid,
                header.sequence_flags,
                header.sequence_count,
                header.data_length
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lower-case hex without separators.
pub fn hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn properties_line(properties: &QosProperties) -> String {
    properties
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
