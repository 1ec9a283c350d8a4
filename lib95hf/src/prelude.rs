// lib95hf/src/prelude.rs

pub use crate::config::{DeviceConfig, ManagerConfig, Timings};
pub use crate::device::Device;
pub use crate::device::{Initialized, Uninitialized};
pub use crate::emulation::{CardEmulator, EmulatedTagType, EmulationState};
pub use crate::manager::{Manager, ModeOutcome, P2pPhase, PhaseStrategy};
pub use crate::nfcdep::{Carrier, Initiator, NfcDepTarget};
pub use crate::protocol::{Command, Reply};
pub use crate::timer::{Clock, StdClock, StopSignal};
pub use crate::{
    BitRate, DetectedTag, Error, P2pMode, Protocol, Result, SelectMode, SerialInterface, TagFamily,
    TagUid, TrackMask,
};

// Re-export small utilities for convenience
pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced, parse_hex};
