use crc::{Crc, CRC_16_ARC, CRC_16_IBM_3740, CRC_16_KERMIT, CRC_16_XMODEM};
use serde::{Deserialize, Serialize};

/// Size of the CRC trailer in bytes.
pub const CRC_SIZE: usize = 2;

const CCITT_FALSE: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);
const KERMIT: Crc<u16> = Crc::<u16>::new(&CRC_16_KERMIT);
const ARC: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// CRC-16 variant used for the packet trailer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrcAlgorithm {
    /// Polynomial 0x1021, init 0xFFFF, no reflection (the CCSDS choice).
    #[default]
    CcittFalse,
    Xmodem,
    Kermit,
    Arc,
}

impl CrcAlgorithm {
    fn engine(self) -> &'static Crc<u16> {
        match self {
            Self::CcittFalse => &CCITT_FALSE,
            Self::Xmodem => &XMODEM,
            Self::Kermit => &KERMIT,
            Self::Arc => &ARC,
        }
    }

    /// Checksum over the primary header followed by the body.
    pub fn checksum(self, header: &[u8], body: &[u8]) -> u16 {
        let mut digest = self.engine().digest();
        digest.update(header);
        digest.update(body);
        digest.finalize()
    }
}
