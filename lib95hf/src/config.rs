// lib95hf/src/config.rs

//! Session configuration consumed by the mode orchestrator.

use crate::types::{P2pMode, SelectMode, SerialInterface, TrackMask};

/// Timing and loop bounds used by the orchestrator and the chip handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timings {
    /// Delay after each field off/on edge during tag hunting
    pub settle_ms: u64,
    /// Time spent emulating each tag family in auto mode
    pub emulation_window_ms: u64,
    /// Presence polls attempted as NFC-A initiator per P2P round
    pub nfca_initiator_polls: u32,
    /// Presence polls attempted as NFC-F initiator per P2P round
    pub nfcf_initiator_polls: u32,
    /// Emulation steps run as target per P2P round
    pub target_steps: u32,
    /// Whole POR sequences attempted before giving up
    pub por_attempts: usize,
    /// Echo probes sent on UART within one POR attempt
    pub uart_probe_limit: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_ms: 5,
            emulation_window_ms: 500,
            nfca_initiator_polls: 10,
            nfcf_initiator_polls: 40,
            target_steps: 100_000,
            por_attempts: crate::constants::POR_ATTEMPTS,
            uart_probe_limit: crate::constants::UART_PROBE_LIMIT,
        }
    }
}

/// Chip handle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    pub interface: SerialInterface,
    /// Treat an ISO14443B analog register read-back mismatch as an error
    /// instead of a warning.
    pub strict_analog_check: bool,
    pub timings: Timings,
}

/// Which roles auto mode cycles through, and what each role pursues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManagerConfig {
    pub selected_mode: SelectMode,
    pub pcd_mode: TrackMask,
    pub picc_mode: TrackMask,
    pub p2p_mode: P2pMode,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            selected_mode: SelectMode::PCD,
            pcd_mode: TrackMask::ALL,
            picc_mode: TrackMask::empty(),
            p2p_mode: P2pMode::empty(),
        }
    }
}

impl ManagerConfig {
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }
}

/// Builder for [`ManagerConfig`]. Enabling a role's sub-mask also turns the
/// role on.
#[derive(Debug, Default)]
pub struct ManagerConfigBuilder {
    selected_mode: SelectMode,
    pcd_mode: TrackMask,
    picc_mode: TrackMask,
    p2p_mode: P2pMode,
}

impl ManagerConfigBuilder {
    pub fn pcd(mut self, mask: TrackMask) -> Self {
        self.selected_mode |= SelectMode::PCD;
        self.pcd_mode = mask;
        self
    }

    pub fn picc(mut self, mask: TrackMask) -> Self {
        self.selected_mode |= SelectMode::PICC;
        self.picc_mode = mask;
        self
    }

    pub fn p2p(mut self, mode: P2pMode) -> Self {
        self.selected_mode |= SelectMode::P2P;
        self.p2p_mode = mode;
        self
    }

    pub fn build(self) -> ManagerConfig {
        ManagerConfig {
            selected_mode: self.selected_mode,
            pcd_mode: self.pcd_mode,
            picc_mode: self.picc_mode,
            p2p_mode: self.p2p_mode,
        }
    }
}
