//! Space Packet echo server: accepts one link and echoes every message back.
//!
//! Run with:
//!   cargo run --example spp-echo
//!
//! In another terminal:
//!   cargo run --features cli -- send malspp://127.0.0.1:4700/42 --data hello

use malwire::link::{SppConfig, SppListener};
use malwire::spp::CrcAlgorithm;
use malwire::transport::Transport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = SppConfig::default();
    config.framing.crc = Some(CrcAlgorithm::CcittFalse);

    let listener = SppListener::bind("malspp://127.0.0.1:4700/42", config)?;
    eprintln!("Listening on {}", listener.address());

    let link = listener.accept()?;
    eprintln!("Link up: {}", link.create_transport_address());

    loop {
        match link.receive() {
            Ok(message) => {
                eprintln!(
                    "Received {} bytes from {}",
                    message.body.len(),
                    message.source
                );
                link.send_encoded_message(&message.body)?;
            }
            Err(e) => {
                eprintln!("Link closed: {e}");
                break;
            }
        }
    }

    Ok(())
}
