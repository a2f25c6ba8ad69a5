use serde::{Deserialize, Serialize};

use crate::error::{CfpError, Result};
use crate::frame::{CLASSIC_FRAME_DATA, FD_FRAME_DATA};
use crate::identifier::IdentifierLayout;

/// Fragmentation settings. Both ends of a bus must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfpConfig {
    pub layout: IdentifierLayout,
    /// Data bytes per frame: 8 for classic CAN, up to 64 for CAN FD.
    #[serde(default = "default_frame_data")]
    pub max_frame_data: usize,
}

fn default_frame_data() -> usize {
    CLASSIC_FRAME_DATA
}

impl CfpConfig {
    /// Classic CAN frames under `layout`.
    pub fn classic(layout: IdentifierLayout) -> Self {
        Self {
            layout,
            max_frame_data: CLASSIC_FRAME_DATA,
        }
    }

    pub fn with_frame_data(mut self, max_frame_data: usize) -> Self {
        self.max_frame_data = max_frame_data;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        if !(1..=FD_FRAME_DATA).contains(&self.max_frame_data) {
            return Err(CfpError::InvalidFrameCapacity(self.max_frame_data));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_capacity_bounds() {
        let config = CfpConfig::classic(IdentifierLayout::extended_default());
        assert!(config.validate().is_ok());
        assert!(config.with_frame_data(64).validate().is_ok());
        assert!(matches!(
            config.with_frame_data(0).validate(),
            Err(CfpError::InvalidFrameCapacity(0))
        ));
        assert!(matches!(
            config.with_frame_data(65).validate(),
            Err(CfpError::InvalidFrameCapacity(65))
        ));
    }
}
