//! CAN Fragmentation Protocol (CFP) for malwire.
//!
//! A payload is split into a transaction of CAN frames. The arbitration
//! identifier of every frame carries source and destination node, frame
//! type, the number of frames still to follow and a transaction id, packed
//! according to an [`IdentifierLayout`].
//!
//! - [`Fragmenter`] turns payloads into frames,
//! - [`Reassembler`] turns frames back into payloads and detects gaps,
//! - [`CanBus`] abstracts the controller; [`LoopbackBus`] runs in memory.

pub mod bus;
pub mod config;
pub mod error;
pub mod fragmenter;
pub mod frame;
pub mod identifier;
pub mod reassembler;

pub use bus::{CanBus, LoopbackBus, LoopbackPort, LossFn};
pub use config::CfpConfig;
pub use error::{CfpError, Result};
pub use fragmenter::Fragmenter;
pub use frame::{CanFrame, CfpFrame, CLASSIC_FRAME_DATA, FD_FRAME_DATA};
pub use identifier::{CfpIdentifier, FrameType, IdentifierLayout, EXTENDED_ID_BITS};
pub use reassembler::{CfpMessage, ReassemblyEvent, Reassembler};
