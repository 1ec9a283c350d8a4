//! Helpers shared by unit tests, integration tests, benches and demos.
//!
//! [`initialized_device`] and friends bring a Device up over a
//! MockTransport. [`SimChip`] is a small behavioural model of the
//! transceiver with tags or NFC-DEP peers in its field; it is plugged into a
//! MockTransport as a [`ChipScript`].
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::DeviceConfig;
use crate::constants::*;
use crate::device::{Device, Initialized};
use crate::timer::MockClock;
use crate::transport::{ChipScript, MockTransport};
use crate::types::SerialInterface;
use crate::Result;

/// IDN reply of a CR95HF
#[doc(hidden)]
pub const IDN_REPLY: [u8; 17] = [
    0x00, 0x0F, b'N', b'F', b'C', b' ', b'F', b'S', b'2', b'J', b'A', b'S', b'T', b'4', 0x00,
    0xE1, 0x60,
];

/// Create and initialize a Device backed by `mock` and a virtual clock.
/// The POR echo and IDN replies are queued here and the sent log is
/// cleared afterwards, so tests only see their own traffic.
#[doc(hidden)]
pub fn initialized_device(mock: &MockTransport) -> Result<Device<Initialized>> {
    initialized_device_with(mock, MockClock::new(), DeviceConfig::default())
}

#[doc(hidden)]
pub fn initialized_device_with_clock(
    mock: &MockTransport,
    clock: MockClock,
) -> Result<Device<Initialized>> {
    initialized_device_with(mock, clock, DeviceConfig::default())
}

#[doc(hidden)]
pub fn initialized_device_with_config(
    mock: &MockTransport,
    config: DeviceConfig,
) -> Result<Device<Initialized>> {
    initialized_device_with(mock, MockClock::new(), config)
}

fn initialized_device_with(
    mock: &MockTransport,
    clock: MockClock,
    config: DeviceConfig,
) -> Result<Device<Initialized>> {
    mock.push_response(vec![ECHO_RESPONSE]);
    mock.push_response(IDN_REPLY.to_vec());
    let device = Device::new_with_transport(Box::new(mock.clone()))
        .with_clock(Box::new(clock))
        .with_config(config)
        .initialize()?;
    mock.clear_sent();
    Ok(device)
}

/// NFCID3 announced by simulated NFC-DEP targets
#[doc(hidden)]
pub const SIM_NFCID3T: [u8; 10] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA];
/// IDm of a simulated NFC-F peer (NFC-DEP capable prefix)
#[doc(hidden)]
pub const SIM_NFCF_IDM: [u8; 8] = [0x01, 0xFE, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F];
/// UID of a simulated NFC-A peer
#[doc(hidden)]
pub const SIM_NFCA_UID: [u8; 4] = [0x08, 0x1A, 0x2B, 0x3C];

const SIM_CRC: [u8; 2] = [0xAB, 0xCD];
const A_CONTROL: [u8; 3] = [0x08, 0x00, 0x00];
const LLCP_GENERAL_BYTES: [u8; 13] = [
    0x46, 0x66, 0x6D, 0x01, 0x01, 0x11, 0x03, 0x02, 0x00, 0x08, 0x07, 0x01, 0x03,
];

/// A card or peer sitting in the simulated RF field.
#[doc(hidden)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimTag {
    /// NFC type 1 (Topaz)
    Topaz { uid: [u8; 4] },
    /// ISO14443A card with a 4 or 7 byte UID
    Iso14443a { uid: Vec<u8>, sak: u8 },
    Felica { idm: [u8; 8] },
    Iso14443b { pupi: [u8; 4] },
    Iso15693 { uid: [u8; 8] },
    /// NFC-DEP target reachable over NFC-A
    NfcDepA { llcp: bool },
    /// NFC-DEP target reachable over NFC-F
    NfcDepF { llcp: bool },
}

impl SimTag {
    fn answer(&self, protocol: u8, frame: &[u8]) -> Option<Vec<u8>> {
        match self {
            SimTag::Topaz { uid } if protocol == PROTOCOL_ISO14443A => match frame {
                [0x26, 0x07] => Some(vec![0x0C, 0x00, 0x08, 0x00, 0x00]),
                [0x78, ..] => {
                    let mut r = vec![0x11, 0x48];
                    r.extend_from_slice(uid);
                    r.extend_from_slice(&SIM_CRC);
                    r.extend_from_slice(&A_CONTROL);
                    Some(r)
                }
                _ => None,
            },
            SimTag::Iso14443a { uid, sak } if protocol == PROTOCOL_ISO14443A => {
                answer_14443a(uid, *sak, frame)
            }
            SimTag::NfcDepA { llcp } if protocol == PROTOCOL_ISO14443A => {
                if frame.first() == Some(&0xF0) {
                    let len = *frame.get(1)? as usize;
                    let body = frame.get(2..2 + len)?;
                    let res = nfcdep_response(body, *llcp)?;
                    let mut r = vec![0xF0, res.len() as u8];
                    r.extend_from_slice(&res);
                    r.extend_from_slice(&SIM_CRC);
                    r.extend_from_slice(&A_CONTROL);
                    Some(r)
                } else {
                    answer_14443a(&SIM_NFCA_UID, 0x40, frame)
                }
            }
            SimTag::Felica { idm } if protocol == PROTOCOL_FELICA => answer_reqc(idm, frame),
            SimTag::NfcDepF { llcp } if protocol == PROTOCOL_FELICA => {
                if frame.first() == Some(&0xD4) {
                    // strip the time slot byte
                    let body = &frame[..frame.len() - 1];
                    let mut r = nfcdep_response(body, *llcp)?;
                    r.extend_from_slice(&SIM_CRC);
                    r.push(0x00);
                    Some(r)
                } else {
                    answer_reqc(&SIM_NFCF_IDM, frame)
                }
            }
            SimTag::Iso14443b { pupi } if protocol == PROTOCOL_ISO14443B => match frame {
                [0x05, 0x00, 0x00] => {
                    let mut r = vec![0x50];
                    r.extend_from_slice(pupi);
                    r.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x71, 0x71]);
                    r.extend_from_slice(&SIM_CRC);
                    r.push(0x00);
                    Some(r)
                }
                [0x1D, rest @ ..] if rest.starts_with(pupi) => {
                    Some(vec![0x00, SIM_CRC[0], SIM_CRC[1], 0x00])
                }
                _ => None,
            },
            SimTag::Iso15693 { uid } if protocol == PROTOCOL_ISO15693 => match frame {
                [0x26, 0x01, 0x00] => {
                    let mut r = vec![0x00, 0x00];
                    r.extend_from_slice(uid);
                    r.extend_from_slice(&SIM_CRC);
                    r.push(0x00);
                    Some(r)
                }
                _ => None,
            },
            _ => None,
        }
    }
}

fn bcc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

fn answer_14443a(uid: &[u8], sak: u8, frame: &[u8]) -> Option<Vec<u8>> {
    let levels: Vec<[u8; 4]> = match uid.len() {
        4 => vec![[uid[0], uid[1], uid[2], uid[3]]],
        7 => vec![[0x88, uid[0], uid[1], uid[2]], [uid[3], uid[4], uid[5], uid[6]]],
        _ => return None,
    };
    let level = |sel: u8| match sel {
        0x93 => Some(0usize),
        0x95 => Some(1),
        0x97 => Some(2),
        _ => None,
    };

    match frame {
        [0x26, 0x07] => Some(vec![0x44, 0x00, 0x08, 0x00, 0x00]),
        [sel, 0x20, 0x08] => {
            let cln = levels.get(level(*sel)?)?;
            let mut r = cln.to_vec();
            r.push(bcc(cln));
            r.extend_from_slice(&A_CONTROL);
            Some(r)
        }
        [sel, 0x70, ..] => {
            let idx = level(*sel)?;
            levels.get(idx)?;
            let sak = if idx + 1 < levels.len() { 0x04 } else { sak };
            let mut r = vec![sak];
            r.extend_from_slice(&SIM_CRC);
            r.extend_from_slice(&A_CONTROL);
            Some(r)
        }
        _ => None,
    }
}

fn answer_reqc(idm: &[u8; 8], frame: &[u8]) -> Option<Vec<u8>> {
    if frame != [0x00, 0x12, 0xFC, 0x01, 0x03] {
        return None;
    }
    let mut r = vec![0x14, 0x01];
    r.extend_from_slice(idm);
    r.extend_from_slice(&[0u8; 8]);
    r.extend_from_slice(&[0x12, 0xFC]);
    r.extend_from_slice(&SIM_CRC);
    r.push(0x00);
    Some(r)
}

/// Target-side NFC-DEP answer for a request body starting with D4.
fn nfcdep_response(body: &[u8], llcp: bool) -> Option<Vec<u8>> {
    match body {
        [0xD4, 0x00, rest @ ..] => {
            let did = *rest.get(10)?;
            let mut r = vec![0xD5, 0x01];
            r.extend_from_slice(&SIM_NFCID3T);
            r.extend_from_slice(&[did, 0x00, 0x00, 0x0E]);
            if llcp {
                r.push(0x22);
                r.extend_from_slice(&LLCP_GENERAL_BYTES);
            } else {
                r.push(0x20);
            }
            Some(r)
        }
        [0xD4, 0x04, did, _brs, _fsl] => Some(vec![0xD5, 0x05, *did]),
        [0xD4, 0x06, pfb, payload @ ..] => {
            let mut r = vec![0xD5, 0x07, *pfb];
            r.extend_from_slice(payload);
            Some(r)
        }
        [0xD4, 0x08] => Some(vec![0xD5, 0x09]),
        [0xD4, 0x0A] => Some(vec![0xD5, 0x0B]),
        _ => None,
    }
}

#[derive(Debug)]
struct SimState {
    protocol: u8,
    tags: Vec<SimTag>,
    analog_readback: [u8; 2],
    listen: VecDeque<Vec<u8>>,
    field_detected: bool,
    silent: bool,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_FIELD_OFF,
            tags: Vec::new(),
            analog_readback: [0x01, 0x51],
            listen: VecDeque::new(),
            field_detected: false,
            silent: false,
        }
    }
}

/// Behavioural model of the transceiver. Clones share state, so a test
/// can keep a handle to change the RF field while the device runs.
#[doc(hidden)]
#[derive(Debug, Clone, Default)]
pub struct SimChip {
    state: Arc<Mutex<SimState>>,
}

impl SimChip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(self, tag: SimTag) -> Self {
        self.add_tag(tag);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_tag(&self, tag: SimTag) {
        self.lock().tags.push(tag);
    }

    pub fn clear_tags(&self) {
        self.lock().tags.clear();
    }

    /// Value returned when the ISO14443B analog register is read back
    pub fn set_analog_readback(&self, value: [u8; 2]) {
        self.lock().analog_readback = value;
    }

    /// Queue a LISTEN reply; `[0x00, 0x00]` is returned once drained.
    pub fn push_listen(&self, reply: Vec<u8>) {
        self.lock().listen.push_back(reply);
    }

    pub fn set_field_detected(&self, on: bool) {
        self.lock().field_detected = on;
    }

    /// A silent chip never answers, not even echo.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// Protocol id from the last PROTOCOL_SELECT
    pub fn protocol(&self) -> u8 {
        self.lock().protocol
    }

    /// Handle one command frame.
    pub fn respond(&self, command: &[u8]) -> Option<Vec<u8>> {
        let mut state = self.lock();
        if state.silent {
            return None;
        }
        let code = *command.first()?;
        match code {
            CMD_ECHO => Some(vec![ECHO_RESPONSE]),
            CMD_IDN => Some(IDN_REPLY.to_vec()),
            CMD_PROTOCOL_SELECT => {
                state.protocol = *command.get(DATA_OFFSET)?;
                Some(vec![STATUS_OK, 0x00])
            }
            CMD_POLL_FIELD => Some(vec![STATUS_OK, 0x01, state.field_detected as u8]),
            CMD_SEND_RECEIVE => {
                let frame = command.get(DATA_OFFSET..)?;
                let protocol = state.protocol;
                let answer = state
                    .tags
                    .iter()
                    .find_map(|tag| tag.answer(protocol, frame));
                match answer {
                    Some(data) => {
                        let mut r = vec![SENDRECV_OK, data.len() as u8];
                        r.extend_from_slice(&data);
                        Some(r)
                    }
                    None => Some(vec![SENDRECV_FRAME_WAIT_TIMEOUT, 0x00]),
                }
            }
            CMD_LISTEN => Some(
                state
                    .listen
                    .pop_front()
                    .unwrap_or_else(|| vec![STATUS_OK, 0x00]),
            ),
            CMD_READ_REGISTER => {
                let [hi, lo] = state.analog_readback;
                Some(vec![STATUS_OK, 0x02, hi, lo])
            }
            CMD_SEND | CMD_WRITE_REGISTER | CMD_AC_FILTER => Some(vec![STATUS_OK, 0x00]),
            CMD_BAUD_RATE => Some(vec![ECHO_RESPONSE]),
            _ => None,
        }
    }

    pub fn script(&self) -> ChipScript {
        let chip = self.clone();
        Box::new(move |command| chip.respond(command))
    }

    /// A MockTransport answering through this chip model.
    pub fn transport(&self, interface: SerialInterface) -> MockTransport {
        MockTransport::scripted(interface, self.script())
    }
}
