use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use malwire_link::SppListener;
use malwire_transport::{Transport, TransportError};
use tracing::info;

use crate::cmd::{decode_payload, load_config, ListenArgs};
use crate::exit::{link_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_deref(), args.apid)?;
    let codec = config.codec.codec();
    let listener =
        SppListener::bind(&args.addr, config).map_err(|err| link_error("bind failed", err))?;
    info!(address = %listener.address(), "waiting for links");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let link = listener
            .accept()
            .map_err(|err| link_error("accept failed", err))?;

        while running.load(Ordering::SeqCst) {
            let message = match link.receive() {
                Ok(message) => message,
                Err(TransportError::Shutdown) => break,
                Err(err) => return Err(transport_error("receive failed", err)),
            };

            let payload = if args.raw {
                message.body.to_vec()
            } else {
                decode_payload(&codec, &message.body)
            };
            print_message(&message, &payload, format);
            printed = printed.saturating_add(1);

            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
