// lib95hf/src/emulation/mod.rs

//! Card emulation (PICC role).
//!
//! [`CardEmulator`] is a step-driven state machine: the caller invokes
//! [`CardEmulator::step`] in a loop and decides when to stop. The chip runs
//! ISO14443A anticollision on its own; each received frame is handed to the
//! [`TagResponder`] of the emulated tag type.

use derive_more::Display;
use log::{debug, trace, warn};

use crate::constants::{
    BACKSCATTER_LOAD, LISTEN_DATA, LISTEN_NO_FIELD, PICC_PARAMETER_14443A_106, STATUS_OK,
};
use crate::device::{Device, Initialized};
use crate::nfcdep::{no_payload_handler, Carrier, NfcDepTarget, SharedDepHandler};
use crate::protocol::Reply;
use crate::{Error, Result};

pub mod iso7816;
pub mod type2;
pub mod type4;

pub use type2::Type2Responder;
pub use type4::Type4Responder;

/// Tag personality presented to an external reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Default)]
pub enum EmulatedTagType {
    #[default]
    #[display(fmt = "unknown")]
    Unknown,
    #[display(fmt = "type 1")]
    Type1,
    #[display(fmt = "type 2")]
    Type2,
    #[display(fmt = "type 3")]
    Type3,
    #[display(fmt = "type 4A")]
    Type4A,
    #[display(fmt = "type 4B")]
    Type4B,
    #[display(fmt = "NFC-DEP A")]
    NfcDepA,
    #[display(fmt = "NFC-DEP F")]
    NfcDepF,
    #[display(fmt = "LLCP A")]
    LlcpA,
    #[display(fmt = "LLCP F")]
    LlcpF,
}

impl EmulatedTagType {
    /// SAK loaded into the anticollision filter
    pub fn sak(self) -> u8 {
        match self {
            Self::Type4A | Self::Type4B => 0x20,
            Self::NfcDepA | Self::LlcpA => 0x40,
            _ => 0x00,
        }
    }

    /// Types the transceiver can actually emulate (ISO14443A based).
    /// The others are accepted and listen without answering.
    pub fn chip_backed(self) -> bool {
        matches!(
            self,
            Self::Type2 | Self::Type4A | Self::NfcDepA | Self::LlcpA
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Default)]
pub enum EmulationState {
    #[default]
    Unknown,
    InitializingProtocol,
    WaitField,
    Activated,
    DataExchanged,
    RfFieldCutoff,
    /// Terminal until the next `init`
    Deactivated,
}

/// Tag type and state of the current emulation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardEmulatorSession {
    pub tag_type: EmulatedTagType,
    pub state: EmulationState,
}

/// Answers the frames an external reader sends to an emulated tag.
pub trait TagResponder {
    /// Handle one frame read from the chip after a data-ready event.
    /// Returns [`Error::CommandUnknown`] when the frame is not a command of
    /// this tag type.
    fn reply(&mut self, device: &mut Device<Initialized>, frame: &Reply) -> Result<()>;

    /// Called after an RF field cutoff.
    fn reset(&mut self) {}
}

pub struct CardEmulator {
    session: CardEmulatorSession,
    responder: Option<Box<dyn TagResponder>>,
    command_received: Option<EmulatedTagType>,
    dep_handler: SharedDepHandler,
}

impl Default for CardEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CardEmulator {
    pub fn new() -> Self {
        Self::with_dep_handler(no_payload_handler())
    }

    /// Emulator whose NFC-DEP targets deliver DEP payloads to `handler`
    pub fn with_dep_handler(handler: SharedDepHandler) -> Self {
        Self {
            session: CardEmulatorSession::default(),
            responder: None,
            command_received: None,
            dep_handler: handler,
        }
    }

    pub fn set_dep_handler(&mut self, handler: SharedDepHandler) {
        self.dep_handler = handler;
    }

    /// Start a new session for `tag_type`. Nothing is sent to the chip
    /// until the first `step`.
    pub fn init(&mut self, tag_type: EmulatedTagType) {
        debug!("card emulation: init {}", tag_type);
        self.session = CardEmulatorSession {
            tag_type,
            state: EmulationState::Unknown,
        };
        self.responder = None;
        self.command_received = None;
    }

    pub fn session(&self) -> CardEmulatorSession {
        self.session
    }

    pub fn state(&self) -> EmulationState {
        self.session.state
    }

    pub fn tag_type(&self) -> EmulatedTagType {
        self.session.tag_type
    }

    /// Tag type of the last command a responder accepted, cleared by the
    /// read. Only type 2 and type 4A exchanges are recorded.
    pub fn take_command_received(&mut self) -> Option<EmulatedTagType> {
        self.command_received.take()
    }

    /// Run one transition and return the new state. Chip errors never
    /// escape: they send the machine back to listen or to initialization.
    pub fn step(&mut self, device: &mut Device<Initialized>) -> EmulationState {
        match self.session.state {
            EmulationState::RfFieldCutoff => self.field_cutoff(device),
            EmulationState::Activated => {
                if device.data_ready() {
                    self.session.state = EmulationState::DataExchanged;
                }
            }
            EmulationState::DataExchanged => self.receive_command(device),
            EmulationState::WaitField => self.listen(device),
            EmulationState::Deactivated => {}
            EmulationState::Unknown | EmulationState::InitializingProtocol => {
                self.initialize_protocol(device)
            }
        }
        self.session.state
    }

    /// Leave card emulation: echo to exit listen mode, clear the
    /// anticollision filter if one was loaded, switch the field off.
    pub fn disable(&mut self, device: &mut Device<Initialized>) {
        device.echo();
        if self.session.tag_type.chip_backed() {
            if let Err(e) = device.ac_filter_disable() {
                debug!("card emulation: AC filter clear failed: {}", e);
            }
        }
        if let Err(e) = device.field_off() {
            debug!("card emulation: field off failed: {}", e);
        }
        self.session = CardEmulatorSession {
            tag_type: EmulatedTagType::Unknown,
            state: EmulationState::Deactivated,
        };
        self.responder = None;
        debug!("card emulation: disabled");
    }

    fn new_responder(&self) -> Option<Box<dyn TagResponder>> {
        let handler = self.dep_handler.clone();
        match self.session.tag_type {
            EmulatedTagType::Type2 => Some(Box::new(Type2Responder::new())),
            EmulatedTagType::Type4A => Some(Box::new(Type4Responder::new())),
            EmulatedTagType::NfcDepA => {
                Some(Box::new(NfcDepTarget::init(Carrier::NfcA, false, handler)))
            }
            EmulatedTagType::LlcpA => {
                Some(Box::new(NfcDepTarget::init(Carrier::NfcA, true, handler)))
            }
            _ => None,
        }
    }

    fn initialize_protocol(&mut self, device: &mut Device<Initialized>) {
        self.session.state = EmulationState::InitializingProtocol;
        self.responder = self.new_responder();
        let tag_type = self.session.tag_type;
        if tag_type.chip_backed() {
            let armed = self
                .arm_anticollision(device)
                .and_then(|_| device.set_backscatter_load(BACKSCATTER_LOAD));
            if let Err(e) = armed {
                warn!("card emulation: {} setup failed: {}", tag_type, e);
                return;
            }
        }
        self.listen(device);
    }

    /// Card emulation at 106 kbit/s with the anticollision filter loaded
    fn arm_anticollision(&self, device: &mut Device<Initialized>) -> Result<()> {
        device.select_card_emulation(PICC_PARAMETER_14443A_106)?;
        device.ac_filter(self.session.tag_type.sak())
    }

    fn field_cutoff(&mut self, device: &mut Device<Initialized>) {
        debug!("card emulation: RF field cut off");
        if self.session.tag_type.chip_backed() {
            if let Err(e) = self.arm_anticollision(device) {
                debug!("card emulation: re-arm after cutoff failed: {}", e);
            }
        }
        if let Some(responder) = self.responder.as_mut() {
            responder.reset();
        }
        self.session.state = EmulationState::WaitField;
    }

    fn listen(&mut self, device: &mut Device<Initialized>) {
        if !device.echo() {
            if let Err(e) = device.por_sequence() {
                warn!("card emulation: chip lost before listen: {}", e);
            }
        }
        let next = match device.listen() {
            Ok(reply) if reply.status == LISTEN_NO_FIELD => EmulationState::WaitField,
            Ok(reply) if reply.status == STATUS_OK => {
                if device.data_ready() {
                    EmulationState::DataExchanged
                } else {
                    EmulationState::Activated
                }
            }
            Ok(reply) => {
                debug!("card emulation: listen status {:#04x}", reply.status);
                EmulationState::Unknown
            }
            Err(e) => {
                debug!("card emulation: listen failed: {}", e);
                EmulationState::Unknown
            }
        };
        if next != self.session.state {
            trace!("card emulation: {} -> {}", self.session.state, next);
        }
        self.session.state = next;
    }

    fn receive_command(&mut self, device: &mut Device<Initialized>) {
        let frame = match device.poll_data() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("card emulation: no frame to read: {}", e);
                self.listen(device);
                return;
            }
        };

        if frame.status == LISTEN_NO_FIELD && frame.is_empty() {
            self.session.state = EmulationState::RfFieldCutoff;
            return;
        }
        if frame.status != LISTEN_DATA {
            debug!("card emulation: receive status {:#04x}", frame.status);
            self.listen(device);
            return;
        }

        let tag_type = self.session.tag_type;
        if let Some(responder) = self.responder.as_mut() {
            let result = responder.reply(device, &frame);
            if let Err(e) = &result {
                debug!("card emulation: {} reply failed: {}", tag_type, e);
            }
            let recorded = matches!(tag_type, EmulatedTagType::Type2 | EmulatedTagType::Type4A);
            if recorded && !matches!(result, Err(Error::CommandUnknown)) {
                self.command_received = Some(tag_type);
            }
        }
        self.listen(device);
    }
}
