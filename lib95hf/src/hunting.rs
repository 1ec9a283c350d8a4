// lib95hf/src/hunting.rs

//! Tag hunting: probe each requested tag family in a fixed order and report
//! the first one that answers.

use log::{debug, info};

use crate::config::Timings;
use crate::device::{Device, Initialized};
use crate::pcd::{felica, iso14443a, iso14443b, iso15693};
use crate::timer::StopSignal;
use crate::types::{DetectedTag, TagFamily, TrackMask};
use crate::{Error, Result};

/// Pause between the REQB answer and ATTRIB
const ATTRIB_GUARD_US: u64 = 50;

/// Look for one tag among the families in `mask`.
///
/// Families are tried in the order type 1, type 2/4A, type 3, type 4B,
/// type 5, each after a field reset. A hit returns immediately with the
/// field still on. When nothing answers the field is switched off and
/// `TagFamily::None` is returned. `stop` is checked before each family and
/// ends the hunt with [`Error::Stopped`].
pub fn hunt(
    device: &mut Device<Initialized>,
    mask: TrackMask,
    timings: &Timings,
    stop: &StopSignal,
) -> Result<DetectedTag> {
    let settle = timings.settle_ms;

    if mask.contains(TrackMask::NFC_TYPE1) {
        check_stop(device, stop)?;
        restart_field(device, settle)?;
        init_14443a(device);
        device.delay_ms(settle);
        if iso14443a::is_present(device).is_ok() {
            if let Ok(uid) = iso14443a::topaz_read_id(device) {
                return Ok(found(TagFamily::Type1, uid));
            }
        }
    }

    if mask.intersects(TrackMask::NFC_TYPE2 | TrackMask::NFC_TYPE4A) {
        check_stop(device, stop)?;
        restart_field(device, settle)?;
        init_14443a(device);
        device.delay_ms(settle);
        if iso14443a::is_present(device).is_ok() {
            match iso14443a::anticollision(device) {
                Ok(card) if card.sak == 0x00 && mask.contains(TrackMask::NFC_TYPE2) => {
                    return Ok(found(TagFamily::Type2, card.uid));
                }
                Ok(card) if card.sak != 0x00 && mask.contains(TrackMask::NFC_TYPE4A) => {
                    return Ok(found(TagFamily::Type4A, card.uid));
                }
                Ok(card) => debug!("ISO14443A card with SAK {:#04x} not requested", card.sak),
                Err(e) => debug!("ISO14443A anticollision failed: {}", e),
            }
        }
    }

    if mask.contains(TrackMask::NFC_TYPE3) {
        check_stop(device, stop)?;
        restart_field(device, settle)?;
        device.delay_ms(settle);
        felica::initialization(device);
        if let Ok(card) = felica::is_present(device) {
            return Ok(found(TagFamily::Type3, card.idm));
        }
    }

    if mask.contains(TrackMask::NFC_TYPE4B) {
        check_stop(device, stop)?;
        restart_field(device, settle)?;
        device.delay_ms(settle);
        if let Ok(card) = iso14443b::is_present(device) {
            device.delay_us(ATTRIB_GUARD_US);
            match iso14443b::anticollision(device, &card) {
                Ok(()) => return Ok(found(TagFamily::Type4B, card.pupi)),
                Err(e) => debug!("ISO14443B ATTRIB failed: {}", e),
            }
        }
    }

    if mask.contains(TrackMask::NFC_TYPE5) {
        check_stop(device, stop)?;
        restart_field(device, settle)?;
        device.delay_ms(settle);
        if let Ok(uid) = iso15693::get_uid(device) {
            return Ok(found(TagFamily::Type5, uid));
        }
    }

    device.field_off()?;
    Ok(DetectedTag::none())
}

fn found(family: TagFamily, uid: crate::types::TagUid) -> DetectedTag {
    info!("tag hunting: {} found, UID {}", family, uid.to_hex());
    DetectedTag::new(family, uid)
}

fn restart_field(device: &mut Device<Initialized>, settle_ms: u64) -> Result<()> {
    device.field_off()?;
    device.delay_ms(settle_ms);
    device.field_on()
}

fn init_14443a(device: &mut Device<Initialized>) {
    if let Err(e) = iso14443a::init(device) {
        debug!("ISO14443A init failed: {}", e);
    }
}

fn check_stop(device: &mut Device<Initialized>, stop: &StopSignal) -> Result<()> {
    if stop.is_stopped() {
        device.field_off()?;
        return Err(Error::Stopped);
    }
    Ok(())
}
