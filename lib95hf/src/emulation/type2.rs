// lib95hf/src/emulation/type2.rs

//! NFC Forum type 2 tag memory behind the emulated ISO14443A UID.

use log::{debug, trace};

use crate::constants::{EMULATED_UID_A, PICC_RX_TRAILER_LEN, SEND_CONTROL_CRC_8BITS};
use crate::device::{Device, Initialized};
use crate::emulation::TagResponder;
use crate::protocol::Reply;
use crate::{Error, Result};

pub const PAGE_SIZE: usize = 4;
pub const PAGE_COUNT: usize = 16;
/// Pages returned by one READ
const READ_PAGES: usize = 4;
/// First page the reader may write (capability container)
const FIRST_WRITABLE_PAGE: usize = 3;

const CMD_READ: u8 = 0x30;
const CMD_WRITE: u8 = 0xA2;
const CMD_SECTOR_SELECT: u8 = 0xC2;

/// 4-bit ACK and NAK, sent without CRC
const ACK: [u8; 2] = [0x0A, 0x04];
const NAK: [u8; 2] = [0x00, 0x04];

/// Capability container: NDEF mapping 1.0, 48 byte data area, read/write
const CAPABILITY_CONTAINER: [u8; PAGE_SIZE] = [0xE1, 0x10, 0x06, 0x00];
/// Empty NDEF message TLV followed by the terminator TLV
const EMPTY_NDEF_TLV: [u8; PAGE_SIZE] = [0x03, 0x00, 0xFE, 0x00];

fn bcc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Type 2 responder: READ, WRITE and SECTOR SELECT over a single sector
/// of 16 pages.
#[derive(Debug, Clone)]
pub struct Type2Responder {
    memory: [u8; PAGE_SIZE * PAGE_COUNT],
    sector: u8,
    sector_select_pending: bool,
}

impl Default for Type2Responder {
    fn default() -> Self {
        Self::new()
    }
}

impl Type2Responder {
    pub fn new() -> Self {
        let mut memory = [0u8; PAGE_SIZE * PAGE_COUNT];
        // cascade tag, then the 7 byte UID split over pages 0 and 1
        let uid = &EMULATED_UID_A;
        memory[0..3].copy_from_slice(&uid[1..4]);
        memory[3] = bcc(&uid[0..4]);
        memory[4..8].copy_from_slice(&uid[4..8]);
        memory[8] = bcc(&uid[4..8]);
        memory[9] = 0x48;
        memory[12..16].copy_from_slice(&CAPABILITY_CONTAINER);
        memory[16..20].copy_from_slice(&EMPTY_NDEF_TLV);
        Self {
            memory,
            sector: 0,
            sector_select_pending: false,
        }
    }

    pub fn page(&self, page: usize) -> Option<&[u8]> {
        self.memory.get(page * PAGE_SIZE..(page + 1) * PAGE_SIZE)
    }

    pub fn sector(&self) -> u8 {
        self.sector
    }

    /// Response for one inbound command, `None` when no answer is sent.
    fn respond(&mut self, command: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.sector_select_pending {
            // second packet of SECTOR SELECT: sector number and 3 RFU bytes
            self.sector_select_pending = false;
            let sector = *command.first().ok_or(Error::CommandUnknown)?;
            if sector == 0 {
                self.sector = 0;
                // passive ACK
                return Ok(None);
            }
            debug!("type 2: sector {} not available", sector);
            return Ok(Some(NAK.to_vec()));
        }

        match command {
            [CMD_READ, page, ..] => Ok(Some(self.read(*page as usize))),
            [CMD_WRITE, page, data @ ..] if data.len() >= PAGE_SIZE => {
                Ok(Some(self.write(*page as usize, &data[..PAGE_SIZE])))
            }
            [CMD_SECTOR_SELECT, 0xFF, ..] => {
                self.sector_select_pending = true;
                Ok(Some(ACK.to_vec()))
            }
            _ => Err(Error::CommandUnknown),
        }
    }

    /// Four pages from `page`, rolling over to page 0 past the end.
    fn read(&self, page: usize) -> Vec<u8> {
        if page >= PAGE_COUNT {
            return NAK.to_vec();
        }
        let mut out = Vec::with_capacity(READ_PAGES * PAGE_SIZE + 1);
        for p in 0..READ_PAGES {
            let start = ((page + p) % PAGE_COUNT) * PAGE_SIZE;
            out.extend_from_slice(&self.memory[start..start + PAGE_SIZE]);
        }
        out.push(SEND_CONTROL_CRC_8BITS);
        out
    }

    fn write(&mut self, page: usize, data: &[u8]) -> Vec<u8> {
        if !(FIRST_WRITABLE_PAGE..PAGE_COUNT).contains(&page) {
            return NAK.to_vec();
        }
        let start = page * PAGE_SIZE;
        self.memory[start..start + PAGE_SIZE].copy_from_slice(data);
        trace!("type 2: page {} written", page);
        ACK.to_vec()
    }
}

impl TagResponder for Type2Responder {
    fn reply(&mut self, device: &mut Device<Initialized>, frame: &Reply) -> Result<()> {
        let command = frame.payload(PICC_RX_TRAILER_LEN)?;
        match self.respond(command)? {
            Some(response) => device.picc_send(&response),
            None => Ok(()),
        }
    }

    fn reset(&mut self) {
        self.sector = 0;
        self.sector_select_pending = false;
    }
}
