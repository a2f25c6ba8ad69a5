//! Two CAN nodes on an in-memory bus exchanging element messages.
//!
//! One frame of the first transaction is lost on the bus; node 2 asks for a
//! retransmission and still receives the full message.
//!
//! Run with:
//!   cargo run --example can-loopback

use std::sync::Arc;

use malwire::cfp::{CanFrame, CfpConfig, IdentifierLayout, LoopbackBus};
use malwire::codec::{CodecStrategy, ElementKind, Value};
use malwire::link::{CanLinkConfig, CanTransport, MessageEndpoint};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bus = LoopbackBus::new();
    let cfp = CfpConfig::classic(IdentifierLayout::extended_default());

    let node1 = MessageEndpoint::new(
        CanTransport::open(Arc::new(bus.open_port()), CanLinkConfig::new(1, 2, cfp))?,
        CodecStrategy::Split,
    );
    let node2 = MessageEndpoint::new(
        CanTransport::open(
            Arc::new(bus.open_port()),
            CanLinkConfig::new(2, 1, cfp).with_retransmission(true),
        )?,
        CodecStrategy::Split,
    );

    let mut frames_seen = 0;
    bus.set_loss(Some(Box::new(move |_: &CanFrame| {
        frames_seen += 1;
        frames_seen == 2
    })));

    node1.send_elements(&[
        Some(Value::String("housekeeping".into())),
        Some(Value::Double(21.5)),
        Some(Value::Boolean(true)),
        None,
    ])?;

    let received = node2.receive_elements(&[
        ElementKind::String,
        ElementKind::Double,
        ElementKind::Boolean,
        ElementKind::Time,
    ])?;
    println!("from {}: {:?}", received.source, received.elements);

    Ok(())
}
