use malwire_cfp::{CfpConfig, Fragmenter, IdentifierLayout};

use crate::cmd::{read_payload, FragmentArgs};
use crate::exit::{cfp_error, CliResult, SUCCESS};
use crate::output::{hex, print_frames, FrameRow, OutputFormat};

pub fn run(args: FragmentArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = read_payload(args.data.as_deref(), args.file.as_deref())?;
    let rows = fragment_rows(&args, payload)?;
    print_frames(&rows, format);
    Ok(SUCCESS)
}

fn fragment_rows(args: &FragmentArgs, payload: Vec<u8>) -> CliResult<Vec<FrameRow>> {
    let layout = IdentifierLayout::extended_default();
    let config = CfpConfig::classic(layout).with_frame_data(args.frame_data);
    let fragmenter = Fragmenter::new(config).map_err(|err| cfp_error("invalid frame size", err))?;
    let frames = fragmenter
        .fragment(args.src, args.dst, payload)
        .map_err(|err| cfp_error("fragment failed", err))?;

    frames
        .iter()
        .enumerate()
        .map(|(index, frame)| {
            let can = frame
                .to_can(&layout)
                .map_err(|err| cfp_error("fragment failed", err))?;
            Ok(FrameRow {
                index,
                frame_type: frame.frame_type().to_string(),
                remain: frame.identifier.remain,
                transaction_id: frame.identifier.transaction_id,
                can_id: format!("0x{:08X}", can.id),
                data: hex(&frame.data),
            })
        })
        .collect()
}
