// lib95hf/src/emulation/type4.rs

//! NFC Forum type 4A tag: ISO-DEP activation and the NDEF application
//! with its capability container and NDEF file.

use log::{debug, trace};

use crate::constants::{PICC_RX_TRAILER_LEN, SEND_CONTROL_CRC_8BITS};
use crate::device::{Device, Initialized};
use crate::emulation::iso7816::*;
use crate::emulation::TagResponder;
use crate::protocol::Reply;
use crate::{Error, Result};

const RATS: u8 = 0xE0;
/// TL, T0 (FSCI 256 bytes, TA/TB/TC present), TA, TB, TC
const ATS: [u8; 5] = [0x05, 0x78, 0x80, 0x70, 0x02];

const INS_SELECT: u8 = 0xA4;
const INS_READ_BINARY: u8 = 0xB0;
const INS_UPDATE_BINARY: u8 = 0xD6;
const SELECT_BY_NAME: u8 = 0x04;

const NDEF_APPLICATION: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
const CC_FILE_ID: [u8; 2] = [0xE1, 0x03];
const NDEF_FILE_ID: [u8; 2] = [0xE1, 0x04];

pub const NDEF_FILE_MAX: usize = 256;

/// Mapping 2.0, MLe 59, MLc 52, NDEF file E104 of 256 bytes, open access
const CAPABILITY_CONTAINER: [u8; 15] = [
    0x00, 0x0F, 0x20, 0x00, 0x3B, 0x00, 0x34, 0x04, 0x06, 0xE1, 0x04, 0x01, 0x00, 0x00, 0x00,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectedFile {
    CapabilityContainer,
    Ndef,
}

/// Type 4A responder. The NDEF file keeps its content across field
/// cutoffs; selection and block state do not.
#[derive(Debug, Clone)]
pub struct Type4Responder {
    ndef: Vec<u8>,
    application_selected: bool,
    file: Option<SelectedFile>,
    block_number: u8,
    last_response: Option<Vec<u8>>,
}

impl Default for Type4Responder {
    fn default() -> Self {
        Self::new()
    }
}

impl Type4Responder {
    /// Empty NDEF file (NLEN = 0)
    pub fn new() -> Self {
        Self {
            ndef: vec![0x00, 0x00],
            application_selected: false,
            file: None,
            block_number: 0,
            last_response: None,
        }
    }

    /// Preload an NDEF message. The file is NLEN followed by the message.
    pub fn with_ndef_message(message: &[u8]) -> Result<Self> {
        if message.len() + 2 > NDEF_FILE_MAX {
            return Err(Error::InvalidLength {
                expected: NDEF_FILE_MAX - 2,
                actual: message.len(),
            });
        }
        let mut this = Self::new();
        this.ndef = (message.len() as u16).to_be_bytes().to_vec();
        this.ndef.extend_from_slice(message);
        Ok(this)
    }

    pub fn ndef_file(&self) -> &[u8] {
        &self.ndef
    }

    pub fn block_number(&self) -> u8 {
        self.block_number
    }

    fn respond(&mut self, command: &[u8]) -> Result<Option<Vec<u8>>> {
        let (&pcb, rest) = command.split_first().ok_or(Error::CommandUnknown)?;
        let response = match pcb {
            RATS => {
                let mut ats = ATS.to_vec();
                ats.push(SEND_CONTROL_CRC_8BITS);
                ats
            }
            I_BLOCK_0 | I_BLOCK_1 => {
                self.block_number = pcb & PCB_BLOCK_NUMBER;
                let response = self.apdu(pcb, rest);
                self.last_response = Some(response.clone());
                response
            }
            pcb if pcb & 0xE2 == I_BLOCK_0 && pcb & PCB_CHAINING != 0 => {
                debug!("type 4: chained I-block not supported");
                nak_frame(pcb)
            }
            S_DESELECT => {
                self.application_selected = false;
                self.file = None;
                deselect_frame()
            }
            R_ACK_0 | R_ACK_1 => match &self.last_response {
                Some(last) => last.clone(),
                None => ack_frame(pcb),
            },
            R_NAK_0 | R_NAK_1 => ack_frame(pcb),
            _ => return Err(Error::CommandUnknown),
        };
        Ok(Some(response))
    }

    fn apdu(&mut self, pcb: u8, apdu: &[u8]) -> Vec<u8> {
        let &[_cla, ins, p1, p2, ref body @ ..] = apdu else {
            return status_frame(pcb, SW_WRONG_LENGTH);
        };
        match ins {
            INS_SELECT => self.select(pcb, p1, body),
            INS_READ_BINARY => self.read_binary(pcb, u16::from_be_bytes([p1, p2]) as usize, body),
            INS_UPDATE_BINARY => {
                self.update_binary(pcb, u16::from_be_bytes([p1, p2]) as usize, body)
            }
            _ => status_frame(pcb, SW_INS_NOT_SUPPORTED),
        }
    }

    fn select(&mut self, pcb: u8, p1: u8, body: &[u8]) -> Vec<u8> {
        let Some((&lc, rest)) = body.split_first() else {
            return status_frame(pcb, SW_WRONG_LENGTH);
        };
        let Some(name) = rest.get(..lc as usize) else {
            return status_frame(pcb, SW_WRONG_LENGTH);
        };

        if p1 == SELECT_BY_NAME {
            self.application_selected = name == NDEF_APPLICATION;
            self.file = None;
            let sw = if self.application_selected {
                SW_OK
            } else {
                SW_FILE_NOT_FOUND
            };
            return status_frame(pcb, sw);
        }

        let file = match name {
            _ if !self.application_selected => None,
            id if id == CC_FILE_ID => Some(SelectedFile::CapabilityContainer),
            id if id == NDEF_FILE_ID => Some(SelectedFile::Ndef),
            _ => None,
        };
        self.file = file;
        match file {
            Some(file) => {
                trace!("type 4: {:?} selected", file);
                status_frame(pcb, SW_OK)
            }
            None => status_frame(pcb, SW_FILE_NOT_FOUND),
        }
    }

    fn read_binary(&self, pcb: u8, offset: usize, body: &[u8]) -> Vec<u8> {
        let content: &[u8] = match self.file {
            Some(SelectedFile::CapabilityContainer) => &CAPABILITY_CONTAINER,
            Some(SelectedFile::Ndef) => &self.ndef,
            None => return status_frame(pcb, SW_FILE_NOT_FOUND),
        };
        let le = match body.first() {
            Some(0) | None => NDEF_FILE_MAX,
            Some(&le) => le as usize,
        };
        if offset > content.len() {
            return status_frame(pcb, SW_WRONG_P1P2);
        }
        let end = (offset + le).min(content.len());
        buffer_frame(pcb, &content[offset..end], SW_OK)
    }

    fn update_binary(&mut self, pcb: u8, offset: usize, body: &[u8]) -> Vec<u8> {
        match self.file {
            Some(SelectedFile::Ndef) => {}
            Some(SelectedFile::CapabilityContainer) => {
                return status_frame(pcb, SW_SECURITY_NOT_SATISFIED)
            }
            None => return status_frame(pcb, SW_FILE_NOT_FOUND),
        }
        let Some((&lc, rest)) = body.split_first() else {
            return status_frame(pcb, SW_WRONG_LENGTH);
        };
        let Some(data) = rest.get(..lc as usize) else {
            return status_frame(pcb, SW_WRONG_LENGTH);
        };
        let end = offset + data.len();
        if end > NDEF_FILE_MAX {
            return status_frame(pcb, SW_WRONG_P1P2);
        }
        if self.ndef.len() < end {
            self.ndef.resize(end, 0x00);
        }
        self.ndef[offset..end].copy_from_slice(data);
        status_frame(pcb, SW_OK)
    }
}

impl TagResponder for Type4Responder {
    fn reply(&mut self, device: &mut Device<Initialized>, frame: &Reply) -> Result<()> {
        let command = frame.payload(PICC_RX_TRAILER_LEN)?;
        match self.respond(command)? {
            Some(response) => device.picc_send(&response),
            None => Ok(()),
        }
    }

    fn reset(&mut self) {
        self.application_selected = false;
        self.file = None;
        self.block_number = 0;
        self.last_response = None;
    }
}
