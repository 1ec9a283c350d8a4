// lib95hf/src/emulation/iso7816.rs

//! ISO-DEP block and ISO/IEC 7816-4 response builders for the type 4
//! responder. Every frame ends with the control byte asking the chip to
//! append the CRC.

use crate::constants::SEND_CONTROL_CRC_8BITS;

/// Block number bit of an I-block or R-block PCB
pub const PCB_BLOCK_NUMBER: u8 = 0x01;
/// Chaining bit of an I-block PCB
pub const PCB_CHAINING: u8 = 0x10;

pub const I_BLOCK_0: u8 = 0x02;
pub const I_BLOCK_1: u8 = 0x03;
pub const R_ACK_0: u8 = 0xA2;
pub const R_ACK_1: u8 = 0xA3;
pub const R_NAK_0: u8 = 0xB2;
pub const R_NAK_1: u8 = 0xB3;
pub const S_DESELECT: u8 = 0xC2;

pub const SW_OK: u16 = 0x9000;
pub const SW_WRONG_LENGTH: u16 = 0x6700;
pub const SW_SECURITY_NOT_SATISFIED: u16 = 0x6982;
pub const SW_FILE_NOT_FOUND: u16 = 0x6A82;
pub const SW_WRONG_P1P2: u16 = 0x6B00;
pub const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;

/// R(ACK) answering a block received with `pcb`.
pub fn ack_frame(pcb: u8) -> Vec<u8> {
    let ack = if pcb & PCB_BLOCK_NUMBER == 0 {
        R_ACK_0
    } else {
        R_ACK_1
    };
    vec![ack, SEND_CONTROL_CRC_8BITS]
}

/// R(NAK) answering a block received with `pcb`. The block number is the
/// opposite of the received one.
pub fn nak_frame(pcb: u8) -> Vec<u8> {
    let nak = if pcb & PCB_BLOCK_NUMBER != 0 {
        R_NAK_0
    } else {
        R_NAK_1
    };
    vec![nak, SEND_CONTROL_CRC_8BITS]
}

pub fn deselect_frame() -> Vec<u8> {
    vec![S_DESELECT, SEND_CONTROL_CRC_8BITS]
}

/// I-block carrying only a status word
pub fn status_frame(pcb: u8, sw: u16) -> Vec<u8> {
    buffer_frame(pcb, &[], sw)
}

/// I-block carrying `data` followed by a status word
pub fn buffer_frame(pcb: u8, data: &[u8], sw: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    out.push(pcb);
    out.extend_from_slice(data);
    out.extend_from_slice(&sw.to_be_bytes());
    out.push(SEND_CONTROL_CRC_8BITS);
    out
}
