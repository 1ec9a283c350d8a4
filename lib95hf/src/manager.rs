// lib95hf/src/manager.rs

//! Mode orchestrator: runs tag hunting, card emulation and NFC-DEP on one
//! transceiver, one role at a time, until something answers or the caller
//! stops it.

use derive_more::Display;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ManagerConfig, Timings};
use crate::device::{Device, Initialized, Uninitialized};
use crate::emulation::{CardEmulator, EmulatedTagType, EmulationState};
use crate::hunting::hunt;
use crate::nfcdep::{Carrier, Initiator, SharedDepHandler};
use crate::timer::{AppliTimeout, StopSignal};
use crate::types::{DetectedTag, P2pMode, SelectMode, TrackMask};
use crate::{Error, Result};

/// Tag families emulated by auto mode, in order
const AUTO_EMULATION: [(TrackMask, EmulatedTagType); 4] = [
    (TrackMask::NFC_TYPE2, EmulatedTagType::Type2),
    (TrackMask::NFC_TYPE3, EmulatedTagType::Type3),
    (TrackMask::NFC_TYPE4A, EmulatedTagType::Type4A),
    (TrackMask::NFC_TYPE4B, EmulatedTagType::Type4B),
];

/// One step of a P2P round. Rounds always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum P2pPhase {
    #[display(fmt = "NFC-A initiator")]
    NfcAInitiator,
    #[display(fmt = "NFC-F initiator")]
    NfcFInitiator,
    #[display(fmt = "NFC-A target")]
    NfcATarget,
    #[display(fmt = "NFC-F target")]
    NfcFTarget,
}

impl P2pPhase {
    pub const ALL: [P2pPhase; 4] = [
        P2pPhase::NfcAInitiator,
        P2pPhase::NfcFInitiator,
        P2pPhase::NfcATarget,
        P2pPhase::NfcFTarget,
    ];

    /// Sub-mode bit enabling this phase
    pub fn mode(self) -> P2pMode {
        match self {
            P2pPhase::NfcAInitiator => P2pMode::INITIATOR_NFCA,
            P2pPhase::NfcFInitiator => P2pMode::INITIATOR_NFCF,
            P2pPhase::NfcATarget => P2pMode::TARGET_NFCA,
            P2pPhase::NfcFTarget => P2pMode::TARGET_NFCF,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Picks the phase the first P2P round starts at.
pub trait PhaseStrategy {
    fn start_phase(&mut self) -> P2pPhase;
}

/// Always start at the same phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPhase(pub P2pPhase);

impl PhaseStrategy for FixedPhase {
    fn start_phase(&mut self) -> P2pPhase {
        self.0
    }
}

/// Start one phase later on every call
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    next: usize,
}

impl PhaseStrategy for RoundRobin {
    fn start_phase(&mut self) -> P2pPhase {
        let phase = P2pPhase::ALL[self.next % P2pPhase::ALL.len()];
        self.next = (self.next + 1) % P2pPhase::ALL.len();
        phase
    }
}

/// Start at a uniformly drawn phase, so that two identical devices facing
/// each other do not stay in the same role.
#[derive(Debug, Clone)]
pub struct UniformRandom {
    rng: StdRng,
}

impl UniformRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseStrategy for UniformRandom {
    fn start_phase(&mut self) -> P2pPhase {
        P2pPhase::ALL[self.rng.gen_range(0..P2pPhase::ALL.len())]
    }
}

/// Why auto mode returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    /// Reader role found a tag
    TagFound(DetectedTag),
    /// An external reader talked to the emulated tag
    ReaderFound(EmulatedTagType),
    /// A P2P session was established in the given sub-mode
    PeerFound(P2pMode),
    Stopped,
}

/// Owns the transceiver for the lifetime of a session and serializes every
/// role on it.
pub struct Manager {
    device: Device<Initialized>,
    stop: StopSignal,
    timings: Timings,
    strategy: Box<dyn PhaseStrategy>,
    emulator: CardEmulator,
}

impl Manager {
    /// Bring the chip up (POR then IDN) and wrap it.
    pub fn hw_init(device: Device<Uninitialized>) -> Result<Self> {
        Ok(Self::new(device.initialize()?))
    }

    /// Wrap an initialized chip. Timings come from the device configuration;
    /// P2P rounds start at a random phase.
    pub fn new(device: Device<Initialized>) -> Self {
        let timings = device.config().timings;
        Self {
            device,
            stop: StopSignal::new(),
            timings,
            strategy: Box::new(UniformRandom::new()),
            emulator: CardEmulator::new(),
        }
    }

    pub fn with_strategy<S>(mut self, strategy: S) -> Self
    where
        S: PhaseStrategy + 'static,
    {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Application layer for DEP payloads received as NFC-DEP target
    pub fn with_dep_handler(mut self, handler: SharedDepHandler) -> Self {
        self.emulator.set_dep_handler(handler);
        self
    }

    pub fn device(&self) -> &Device<Initialized> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device<Initialized> {
        &mut self.device
    }

    pub fn into_device(self) -> Device<Initialized> {
        self.device
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Handle for stopping a running session from elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Cycle through the roles selected in `config` (reader, then card
    /// emulation, then P2P) until one of them succeeds or the session is
    /// stopped.
    pub fn auto_mode(&mut self, config: &ManagerConfig) -> ModeOutcome {
        self.stop.reset();
        if config.selected_mode.is_empty() {
            debug!("auto mode: no role selected");
            return ModeOutcome::Stopped;
        }
        info!("auto mode: roles {:?}", config.selected_mode);

        while !self.stop.is_stopped() {
            if config.selected_mode.contains(SelectMode::PCD) {
                match self.hunt(config.pcd_mode) {
                    Ok(tag) if tag.is_found() => return ModeOutcome::TagFound(tag),
                    Ok(_) => {}
                    Err(Error::Stopped) => break,
                    Err(e) => debug!("auto mode: tag hunting failed: {}", e),
                }
            }

            if config.selected_mode.contains(SelectMode::PICC) {
                for (bit, tag_type) in AUTO_EMULATION {
                    if self.stop.is_stopped() {
                        break;
                    }
                    if config.picc_mode.contains(bit)
                        && self.emulate(tag_type, self.timings.emulation_window_ms)
                    {
                        return ModeOutcome::ReaderFound(tag_type);
                    }
                }
            }

            if !self.stop.is_stopped() && config.selected_mode.contains(SelectMode::P2P) {
                let found = self.run_p2p(config.p2p_mode);
                if !found.is_empty() {
                    return ModeOutcome::PeerFound(found);
                }
            }
        }
        ModeOutcome::Stopped
    }

    /// Look once for a tag among the families in `mask`.
    pub fn tag_hunting(&mut self, mask: TrackMask) -> Result<DetectedTag> {
        self.stop.reset();
        self.hunt(mask)
    }

    /// Emulate `tag_type` until stopped or, when `delay_ms` is non-zero,
    /// until no exchange happened for `delay_ms`. Returns whether a reader
    /// sent a command of that tag type.
    pub fn tag_emulation(&mut self, tag_type: EmulatedTagType, delay_ms: u64) -> bool {
        self.stop.reset();
        self.emulate(tag_type, delay_ms)
    }

    /// Try the P2P sub-modes in `mode` until a session is established or
    /// the session is stopped. Returns the sub-mode that succeeded, empty
    /// when stopped.
    pub fn p2p(&mut self, mode: P2pMode) -> P2pMode {
        self.stop.reset();
        self.run_p2p(mode)
    }

    fn hunt(&mut self, mask: TrackMask) -> Result<DetectedTag> {
        hunt(&mut self.device, mask, &self.timings, &self.stop)
    }

    fn emulate(&mut self, tag_type: EmulatedTagType, delay_ms: u64) -> bool {
        self.emulator.init(tag_type);
        let mut timeout = AppliTimeout::new();
        if delay_ms != 0 {
            timeout.arm(self.device.clock(), delay_ms);
        }

        let mut reader_found = false;
        while !self.stop.is_stopped() && !timeout.is_expired(self.device.clock()) {
            let state = self.emulator.step(&mut self.device);
            if delay_ms != 0 {
                if state == EmulationState::DataExchanged {
                    timeout.arm(self.device.clock(), delay_ms);
                }
                if self.emulator.take_command_received() == Some(tag_type) {
                    reader_found = true;
                }
            }
        }

        self.emulator.disable(&mut self.device);
        if reader_found {
            info!("card emulation: reader found for {}", tag_type);
        }
        reader_found
    }

    fn run_p2p(&mut self, mode: P2pMode) -> P2pMode {
        if mode.is_empty() {
            return P2pMode::empty();
        }
        let start = self.strategy.start_phase().index();
        debug!("P2P: starting at {}", P2pPhase::ALL[start]);

        // the first round starts at `start`, later rounds at the beginning
        let mut next = start;
        while !self.stop.is_stopped() {
            let phase = P2pPhase::ALL[next];
            next = (next + 1) % P2pPhase::ALL.len();
            if !mode.contains(phase.mode()) {
                continue;
            }
            if self.run_phase(phase) {
                info!("P2P: session established as {}", phase);
                return phase.mode();
            }
        }
        P2pMode::empty()
    }

    fn run_phase(&mut self, phase: P2pPhase) -> bool {
        match phase {
            P2pPhase::NfcAInitiator => {
                self.poll_initiator(Carrier::NfcA, self.timings.nfca_initiator_polls)
            }
            P2pPhase::NfcFInitiator => {
                self.poll_initiator(Carrier::NfcF, self.timings.nfcf_initiator_polls)
            }
            P2pPhase::NfcATarget => self.listen_as_target(EmulatedTagType::NfcDepA),
            P2pPhase::NfcFTarget => self.listen_as_target(EmulatedTagType::NfcDepF),
        }
    }

    fn poll_initiator(&mut self, carrier: Carrier, polls: u32) -> bool {
        let mut initiator = Initiator::init(&mut self.device, carrier, true);
        for _ in 0..polls {
            if self.stop.is_stopped() {
                return false;
            }
            let present = match carrier {
                Carrier::NfcA => initiator.is_present_nfca(&mut self.device),
                Carrier::NfcF => initiator.is_present_nfcf(&mut self.device),
            };
            if present.is_ok() {
                return true;
            }
        }
        false
    }

    fn listen_as_target(&mut self, tag_type: EmulatedTagType) -> bool {
        self.emulator.init(tag_type);
        for _ in 0..self.timings.target_steps {
            if self.stop.is_stopped() {
                return false;
            }
            if self.emulator.step(&mut self.device) == EmulationState::DataExchanged {
                return true;
            }
        }
        false
    }
}
