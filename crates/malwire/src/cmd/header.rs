use malwire_spp::{SpacePacketHeader, HEADER_SIZE};

use crate::cmd::HeaderArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_header, HeaderView, OutputFormat};

pub fn run(args: HeaderArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_header_hex(&args.hex)?;
    let (header, length_field) = SpacePacketHeader::from_bytes(&bytes);
    let view = HeaderView {
        version: header.version,
        packet_type: header.packet_type,
        secondary_header_flag: header.secondary_header_flag,
        apid: header.apid,
        sequence_flags: header.sequence_flags,
        sequence_count: header.sequence_count,
        data_length: u32::from(length_field) + 1,
    };
    print_header(&view, format);
    Ok(SUCCESS)
}

fn parse_header_hex(input: &str) -> CliResult<[u8; HEADER_SIZE]> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() != HEADER_SIZE * 2 {
        return Err(CliError::new(
            USAGE,
            format!(
                "header must be {} hex digits, got {}",
                HEADER_SIZE * 2,
                digits.len()
            ),
        ));
    }

    let mut bytes = [0u8; HEADER_SIZE];
    for (index, byte) in bytes.iter_mut().enumerate() {
        let pair = digits
            .get(index * 2..index * 2 + 2)
            .ok_or_else(|| CliError::new(USAGE, "header must be ASCII hex"))?;
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| CliError::new(USAGE, format!("invalid hex byte `{pair}`")))?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        let expected = [0x19, 0x23, 0x40, 0x2A, 0x00, 0x09];
        for input in ["1923402a0009", "0x1923402A0009", "19 23 40 2a 00 09", "19:23:40:2a:00:09"] {
            assert_eq!(parse_header_hex(input).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert_eq!(parse_header_hex("1923").unwrap_err().code, USAGE);
        assert_eq!(parse_header_hex("zz23402a0009").unwrap_err().code, USAGE);
        assert_eq!(parse_header_hex("é923402a000").unwrap_err().code, USAGE);
    }
}
