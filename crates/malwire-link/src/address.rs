//! Textual transport addresses.
//!
//! SPP links are addressed as `malspp://host:port/apid`; a bare `host:port`
//! is accepted wherever the APID comes from configuration. CAN links are
//! addressed as `malcan://node`.

use std::fmt;
use std::str::FromStr;

use malwire_spp::MAX_APID;

use crate::error::LinkError;

pub const SPP_SCHEME: &str = "malspp";
pub const CAN_SCHEME: &str = "malcan";

/// A parsed `malspp://` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SppAddress {
    /// `host:port`, as given.
    pub authority: String,
    pub apid: Option<u16>,
}

impl SppAddress {
    pub fn new(authority: impl Into<String>, apid: u16) -> Self {
        Self {
            authority: authority.into(),
            apid: Some(apid),
        }
    }
}

impl fmt::Display for SppAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SPP_SCHEME}://{}", self.authority)?;
        if let Some(apid) = self.apid {
            write!(f, "/{apid}")?;
        }
        Ok(())
    }
}

impl FromStr for SppAddress {
    type Err = LinkError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| LinkError::InvalidAddress {
            address: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = match raw.split_once("://") {
            Some((SPP_SCHEME, rest)) => rest,
            Some((scheme, _)) => return Err(invalid(&format!("unsupported scheme `{scheme}`"))),
            None => raw,
        };
        let (authority, apid) = match rest.split_once('/') {
            Some((authority, "")) => (authority, None),
            Some((authority, apid)) => {
                let apid: u16 = apid.parse().map_err(|_| invalid("apid is not a number"))?;
                if apid > MAX_APID {
                    return Err(invalid("apid exceeds 2047"));
                }
                (authority, Some(apid))
            }
            None => (rest, None),
        };
        match authority.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => return Err(invalid("expected host:port")),
        }
        Ok(Self {
            authority: authority.to_string(),
            apid,
        })
    }
}

/// Address of a CAN node.
pub fn can_address(node: u32) -> String {
    format!("{CAN_SCHEME}://{node}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_address() {
        let addr: SppAddress = "malspp://127.0.0.1:9000/42".parse().unwrap();
        assert_eq!(addr.authority, "127.0.0.1:9000");
        assert_eq!(addr.apid, Some(42));
        assert_eq!(addr.to_string(), "malspp://127.0.0.1:9000/42");
    }

    #[test]
    fn bare_authority_has_no_apid() {
        let addr: SppAddress = "localhost:4000".parse().unwrap();
        assert_eq!(addr.apid, None);
        assert_eq!(addr.to_string(), "malspp://localhost:4000");

        let trailing: SppAddress = "malspp://localhost:4000/".parse().unwrap();
        assert_eq!(trailing.apid, None);
    }

    #[test]
    fn rejects_bad_addresses() {
        for raw in [
            "malcan://3",
            "malspp://host/1",
            "malspp://:80/1",
            "malspp://host:80/2048",
            "malspp://host:80/x",
            "host:99999",
        ] {
            let err = raw.parse::<SppAddress>().unwrap_err();
            assert!(
                matches!(err, LinkError::InvalidAddress { .. }),
                "{raw} parsed"
            );
        }
    }

    #[test]
    fn can_addresses() {
        assert_eq!(can_address(17), "malcan://17");
    }
}
