// lib95hf/src/pcd/iso14443a.rs

use log::{debug, warn};

use crate::constants::{ISO14443A_CONTROL_LEN, REG_TIMER_WINDOW, SEND_CONTROL_CRC_8BITS};
use crate::device::{Device, Initialized};
use crate::protocol::check_crc;
use crate::protocol::parser::{ensure_len, slice_at};
use crate::types::{Protocol, TagUid};
use crate::{Error, Result};

const REQA: [u8; 2] = [0x26, 0x07];
/// Anticollision/SELECT command bytes for cascade levels 1 to 3
const CASCADE_LEVELS: [u8; 3] = [0x93, 0x95, 0x97];
const NVB_ANTICOLLISION: u8 = 0x20;
const NVB_SELECT: u8 = 0x70;
const CONTROL_8BITS: u8 = 0x08;
const CASCADE_TAG: u8 = 0x88;
const SAK_UID_NOT_COMPLETE: u8 = 0x04;
/// Topaz read-identification (RID) frame
const TOPAZ_RID: [u8; 8] = [0x78, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xA8];

/// Card data gathered by anticollision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iso14443aCard {
    pub uid: TagUid,
    pub sak: u8,
}

/// Select ISO14443A at 106 kbit/s and widen the frame wait timer window.
pub fn init(device: &mut Device<Initialized>) -> Result<()> {
    device.select_protocol(Protocol::Iso14443A, &[0x00])?;
    device.write_register(REG_TIMER_WINDOW, 0x00, &[0x58, 0x04])
}

/// Send REQA and return the ATQA.
pub fn is_present(device: &mut Device<Initialized>) -> Result<[u8; 2]> {
    let reply = device.send_recv(&REQA)?;
    let atqa = slice_at(&reply.data, 0, 2)?;
    Ok([atqa[0], atqa[1]])
}

/// Run the cascade anticollision loop and SELECT the card.
pub fn anticollision(device: &mut Device<Initialized>) -> Result<Iso14443aCard> {
    let mut uid = Vec::with_capacity(10);

    for &level in CASCADE_LEVELS.iter() {
        let reply = device.send_recv(&[level, NVB_ANTICOLLISION, CONTROL_8BITS])?;
        let uid_cln = slice_at(&reply.data, 0, 5)?;
        let bcc = uid_cln[..4].iter().fold(0u8, |acc, b| acc ^ b);
        if bcc != uid_cln[4] {
            warn!("ISO14443A: BCC mismatch at level {:#04x}", level);
            return Err(Error::CrcError);
        }

        let mut select = Vec::with_capacity(7);
        select.extend_from_slice(&[level, NVB_SELECT]);
        select.extend_from_slice(uid_cln);
        select.push(SEND_CONTROL_CRC_8BITS);
        let reply = device.send_recv(&select)?;
        ensure_len(&reply.data, 1 + ISO14443A_CONTROL_LEN)?;
        check_crc(Protocol::Iso14443A, &reply)?;
        let sak = reply.data[0];

        if uid_cln[0] == CASCADE_TAG {
            uid.extend_from_slice(&uid_cln[1..4]);
        } else {
            uid.extend_from_slice(&uid_cln[..4]);
        }

        if sak & SAK_UID_NOT_COMPLETE == 0 {
            let uid = TagUid::try_from(uid.as_slice())?;
            debug!("ISO14443A: selected {} (SAK {:#04x})", uid.to_hex(), sak);
            return Ok(Iso14443aCard { uid, sak });
        }
    }

    Err(Error::MalformedFrame("UID longer than three cascade levels".into()))
}

/// Read the 4-byte UID of a Topaz (NFC type 1) tag.
pub fn topaz_read_id(device: &mut Device<Initialized>) -> Result<TagUid> {
    let reply = device.send_recv(&TOPAZ_RID)?;
    // HR0 HR1 UID0..3, then CRC and control bytes
    ensure_len(&reply.data, 6 + ISO14443A_CONTROL_LEN)?;
    check_crc(Protocol::Iso14443A, &reply)?;
    TagUid::try_from(&reply.data[2..6])
}
