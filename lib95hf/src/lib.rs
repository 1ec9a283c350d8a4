// lib95hf/src/lib.rs

//! lib95hf
//!
//! Orchestration layer for the ST CR95HF/ST95HF NFC transceiver: tag
//! hunting as a reader, card emulation, NFC-DEP peer-to-peer as initiator
//! or target, and a manager that cycles through those roles on one chip.

pub mod config;
pub mod constants;
pub mod device;
pub mod emulation;
pub mod error;
pub mod hunting;
pub mod manager;
pub mod nfcdep;
pub mod pcd;
pub mod prelude;
pub mod protocol;
pub mod test_support;
pub mod timer;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export common types at crate root so `crate::Error`, `crate::Result`
// and the mode bitflags are available to consumers and to the prelude.
pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
