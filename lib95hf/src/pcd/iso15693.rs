// lib95hf/src/pcd/iso15693.rs

use crate::constants::SINGLE_CONTROL_LEN;
use crate::device::{Device, Initialized};
use crate::protocol::check_crc;
use crate::protocol::parser::{ensure_len, slice_at};
use crate::types::{Protocol, TagUid};
use crate::Result;

/// 26 kbit/s, single subcarrier, CRC appended
const PROTOCOL_PARAMS: [u8; 1] = [0x05];
/// INVENTORY with one slot and no mask
const INVENTORY: [u8; 3] = [0x26, 0x01, 0x00];
/// flags, DSFID, UID(8), CRC(2)
const INVENTORY_RESPONSE_LEN: usize = 12;
const UID_OFFSET: usize = 2;
const UID_LEN: usize = 8;

pub fn init(device: &mut Device<Initialized>) -> Result<()> {
    device.select_protocol(Protocol::Iso15693, &PROTOCOL_PARAMS).map(|_| ())
}

/// Run a one-slot inventory and return the tag UID (as transmitted, LSB
/// first).
pub fn get_uid(device: &mut Device<Initialized>) -> Result<TagUid> {
    init(device)?;
    let reply = device.send_recv(&INVENTORY)?;
    ensure_len(&reply.data, INVENTORY_RESPONSE_LEN + SINGLE_CONTROL_LEN)?;
    check_crc(Protocol::Iso15693, &reply)?;
    TagUid::try_from(slice_at(&reply.data, UID_OFFSET, UID_LEN)?)
}
