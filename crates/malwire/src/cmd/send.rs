use malwire_link::SppTransport;
use malwire_transport::Transport;
use tracing::info;

use crate::cmd::{encode_payload, load_config, read_payload, SendArgs};
use crate::exit::{link_error, transport_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let config = load_config(args.config.as_deref(), args.apid)?;
    let payload = read_payload(args.data.as_deref(), args.file.as_deref())?;
    let body = if args.raw {
        payload
    } else {
        encode_payload(&config.codec.codec(), payload)?
    };

    let transport =
        SppTransport::connect(&args.addr, config).map_err(|err| link_error("connect failed", err))?;
    transport
        .send_encoded_message(&body)
        .map_err(|err| transport_error("send failed", err))?;
    info!(
        address = %transport.create_transport_address(),
        bytes = body.len(),
        "message sent"
    );
    transport
        .close()
        .map_err(|err| transport_error("close failed", err))?;

    Ok(SUCCESS)
}
