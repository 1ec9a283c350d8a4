// lib95hf/src/pcd/felica.rs

use log::debug;

use crate::constants::{REG_ARC_B, REG_AUTO_DETECT};
use crate::device::{Device, Initialized};
use crate::protocol::parser::slice_at;
use crate::types::{Protocol, TagUid};
use crate::Result;

/// 212 kbit/s, CRC appended, then the FeliCa timing parameters
pub(crate) const PROTOCOL_PARAMS: [u8; 4] = [0x51, 0x13, 0x01, 0x0D];
const DEMODULATOR_GAIN: [u8; 2] = [0x01, 0x51];
const AUTO_DETECT_FILTER: [u8; 2] = [0x02, 0xA1];
/// Polling request for system code 12FC (NFC-DEP / NDEF), one time slot
const REQC: [u8; 5] = [0x00, 0x12, 0xFC, 0x01, 0x03];
const IDM_OFFSET: usize = 2;
const IDM_LEN: usize = 8;

/// Card data gathered by REQC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FelicaCard {
    pub idm: TagUid,
}

/// Select FeliCa and tune the demodulator gain and auto detect filter.
pub fn init(device: &mut Device<Initialized>) -> Result<()> {
    device.select_protocol(Protocol::Felica, &PROTOCOL_PARAMS)?;
    device.write_register(REG_ARC_B, 0x01, &DEMODULATOR_GAIN)?;
    device.write_register(REG_AUTO_DETECT, 0x01, &AUTO_DETECT_FILTER)
}

/// Init, then give the field 20 ms to settle. Failures are only logged: a
/// subsequent REQC reports whether a card answers.
pub fn initialization(device: &mut Device<Initialized>) {
    if let Err(e) = init(device) {
        debug!("FeliCa init failed: {}", e);
    }
    device.delay_ms(20);
}

/// Send REQC and return the card IDm.
pub fn is_present(device: &mut Device<Initialized>) -> Result<FelicaCard> {
    let reply = device.send_recv(&REQC)?;
    let idm = TagUid::try_from(slice_at(&reply.data, IDM_OFFSET, IDM_LEN)?)?;
    debug!("FeliCa: IDm {}", idm.to_hex());
    Ok(FelicaCard { idm })
}
