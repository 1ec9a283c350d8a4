// lib95hf/src/nfcdep/mod.rs

//! NFC-DEP (ISO/IEC 18092 passive mode) over the NFC-A and NFC-F carriers.
//!
//! Requests start with `D4`, responses with `D5`, followed by the
//! command byte. On NFC-A every frame is prefixed with the `F0` start byte
//! and a length byte and carries the CRC control byte for the chip; on
//! NFC-F the initiator appends a time-slot byte instead.

use derive_more::Display;

use crate::constants::{PICC_RX_TRAILER_LEN, SEND_CONTROL_CRC_8BITS};
use crate::protocol::parser::{byte_at, slice_at};
use crate::{Error, Result};

pub mod initiator;
pub mod target;

pub use initiator::{Initiator, InitiatorSession, RemoteTarget};
pub use target::{
    no_payload_handler, shared_handler, DepHandler, NfcDepTarget, PeerInitiator,
    SharedDepHandler, TargetSession,
};

/// RF carrier an NFC-DEP session runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Carrier {
    #[display(fmt = "NFC-A")]
    NfcA,
    #[display(fmt = "NFC-F")]
    NfcF,
}

pub const START_BYTE: u8 = 0xF0;
pub const CMD_REQ: u8 = 0xD4;
pub const CMD_RES: u8 = 0xD5;

pub const ATR_REQ: u8 = 0x00;
pub const ATR_RES: u8 = 0x01;
pub const PSL_REQ: u8 = 0x04;
pub const PSL_RES: u8 = 0x05;
pub const DEP_REQ: u8 = 0x06;
pub const DEP_RES: u8 = 0x07;
pub const DSL_REQ: u8 = 0x08;
pub const DSL_RES: u8 = 0x09;
pub const RLS_REQ: u8 = 0x0A;
pub const RLS_RES: u8 = 0x0B;

pub const NFCID3_LEN: usize = 10;
/// NFCID3 followed by DID, BS, BR and PP
pub const ATR_REQ_PARAMS_LEN: usize = NFCID3_LEN + 4;
/// NFCID3 followed by DID, BS, BR, TO and PP
pub const ATR_RES_PARAMS_LEN: usize = NFCID3_LEN + 5;
/// Upper bound on general bytes carried in ATR
pub const MAX_GENERAL_BYTES: usize = 48;

/// PP bit: general bytes follow
pub const PP_GENERAL_BYTES: u8 = 0x02;
/// PP bit: NAD is used
pub const PP_NAD: u8 = 0x01;
pub const PP_LR_MASK: u8 = 0x30;
/// PFB bit: DID byte present
pub const PFB_DID: u8 = 0x04;
/// PFB bit: NAD byte present
pub const PFB_NAD: u8 = 0x08;

/// FSL announced in PSL_REQ (192-byte payloads)
pub const DEFAULT_FSL: u8 = 0x02;
/// LR value for 192-byte payloads
pub const DEFAULT_LR: u8 = 2;
pub const TIME_SLOT: u8 = 0x00;

/// LLCP magic number opening the general bytes
pub const LLCP_MAGIC: [u8; 3] = [0x46, 0x66, 0x6D];
/// Magic number, version 1.1, well-known services (SDP + SNEP) and LTO
pub const LLCP_GENERAL_BYTES: [u8; 13] = [
    0x46, 0x66, 0x6D, 0x01, 0x01, 0x11, 0x03, 0x02, 0x00, 0x08, 0x07, 0x01, 0x03,
];

/// NFCID3 used on NFC-F. The `01 FE` prefix advertises NFC-DEP support.
pub const NFCF_NFCID3I: [u8; NFCID3_LEN] =
    [0x01, 0xFE, 0x01, 0x10, 0x13, 0x13, 0x0D, 0x00, 0x00, 0x00];

/// LR field of a PP byte
pub fn length_reduction(pp: u8) -> u8 {
    (pp & PP_LR_MASK) >> 4
}

pub fn is_llcp(general_bytes: &[u8]) -> bool {
    general_bytes.starts_with(&LLCP_MAGIC)
}

/// Frame an initiator request body for the chip.
pub fn request_frame(carrier: Carrier, body: &[u8]) -> Vec<u8> {
    match carrier {
        Carrier::NfcA => a_frame(body),
        Carrier::NfcF => {
            let mut out = Vec::with_capacity(body.len() + 1);
            out.extend_from_slice(body);
            out.push(TIME_SLOT);
            out
        }
    }
}

/// Frame a target response body for the chip.
pub fn response_frame(carrier: Carrier, body: &[u8]) -> Vec<u8> {
    match carrier {
        Carrier::NfcA => a_frame(body),
        Carrier::NfcF => body.to_vec(),
    }
}

fn a_frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 3);
    out.push(START_BYTE);
    out.push(body.len() as u8);
    out.extend_from_slice(body);
    out.push(SEND_CONTROL_CRC_8BITS);
    out
}

/// Extract the `D4`/`D5` body from received chip data. NFC-A frames are
/// delimited by their length byte; NFC-F frames end with CRC and status.
pub fn frame_body(carrier: Carrier, data: &[u8]) -> Result<&[u8]> {
    match carrier {
        Carrier::NfcA => {
            let len = byte_at(data, 1)? as usize;
            slice_at(data, 2, len)
        }
        Carrier::NfcF => {
            if data.len() < PICC_RX_TRAILER_LEN {
                return Err(Error::InvalidLength {
                    expected: PICC_RX_TRAILER_LEN,
                    actual: data.len(),
                });
            }
            Ok(&data[..data.len() - PICC_RX_TRAILER_LEN])
        }
    }
}
