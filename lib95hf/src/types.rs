// lib95hf/src/types.rs

use crate::Error;
use bitflags::bitflags;
use derive_more::Display;
use std::convert::TryFrom;

bitflags! {
    /// Tag families to hunt for (PCD) or to emulate (PICC).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TrackMask: u8 {
        const NFC_TYPE1 = 0x01;
        const NFC_TYPE2 = 0x02;
        const NFC_TYPE3 = 0x04;
        const NFC_TYPE4A = 0x08;
        const NFC_TYPE4B = 0x10;
        const NFC_TYPE5 = 0x20;
        const ALL = 0xFF;
    }
}

bitflags! {
    /// Roles the mode orchestrator cycles through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SelectMode: u8 {
        const PCD = 0x01;
        const PICC = 0x02;
        const P2P = 0x04;
        const ALL = 0xFF;
    }
}

bitflags! {
    /// Peer-to-peer sub-modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct P2pMode: u8 {
        const INITIATOR_NFCA = 0x01;
        const INITIATOR_NFCF = 0x02;
        const TARGET_NFCA = 0x04;
        const TARGET_NFCF = 0x08;
        const ALL = 0xFF;
    }
}

impl Default for TrackMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for SelectMode {
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for P2pMode {
    fn default() -> Self {
        Self::empty()
    }
}

/// Tag family reported by tag hunting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Default)]
pub enum TagFamily {
    #[default]
    #[display(fmt = "none")]
    None,
    #[display(fmt = "NFC type 1")]
    Type1,
    #[display(fmt = "NFC type 2")]
    Type2,
    #[display(fmt = "NFC type 3")]
    Type3,
    #[display(fmt = "NFC type 4A")]
    Type4A,
    #[display(fmt = "NFC type 4B")]
    Type4B,
    #[display(fmt = "NFC type 5")]
    Type5,
}

impl TagFamily {
    /// The mask bit that selects this family (empty for `None`).
    pub fn mask(self) -> TrackMask {
        match self {
            Self::None => TrackMask::empty(),
            Self::Type1 => TrackMask::NFC_TYPE1,
            Self::Type2 => TrackMask::NFC_TYPE2,
            Self::Type3 => TrackMask::NFC_TYPE3,
            Self::Type4A => TrackMask::NFC_TYPE4A,
            Self::Type4B => TrackMask::NFC_TYPE4B,
            Self::Type5 => TrackMask::NFC_TYPE5,
        }
    }
}

/// Maximum identifier length carried by [`TagUid`]
pub const MAX_UID_LEN: usize = 16;

/// Tag identifier (UID, PUPI or IDm), at most 16 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagUid {
    bytes: [u8; MAX_UID_LEN],
    len: usize,
}

impl TagUid {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(self.as_bytes())
    }
}

impl TryFrom<&[u8]> for TagUid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() > MAX_UID_LEN {
            return Err(Error::InvalidLength {
                expected: MAX_UID_LEN,
                actual: bytes.len(),
            });
        }
        let mut uid = Self::default();
        uid.bytes[..bytes.len()].copy_from_slice(bytes);
        uid.len = bytes.len();
        Ok(uid)
    }
}

/// Result of a tag hunt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectedTag {
    pub family: TagFamily,
    pub uid: TagUid,
}

impl DetectedTag {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(family: TagFamily, uid: TagUid) -> Self {
        Self { family, uid }
    }

    pub fn is_found(&self) -> bool {
        self.family != TagFamily::None
    }

    /// Family as a mask value (empty when nothing was found)
    pub fn mask(&self) -> TrackMask {
        self.family.mask()
    }
}

/// Serial link between the MCU and the transceiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SerialInterface {
    #[default]
    #[display(fmt = "SPI")]
    Spi,
    #[display(fmt = "UART")]
    Uart,
}

/// RF protocol selectable in reader mode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Protocol {
    #[display(fmt = "field off")]
    FieldOff = crate::constants::PROTOCOL_FIELD_OFF,
    #[display(fmt = "ISO15693")]
    Iso15693 = crate::constants::PROTOCOL_ISO15693,
    #[display(fmt = "ISO14443A")]
    Iso14443A = crate::constants::PROTOCOL_ISO14443A,
    #[display(fmt = "ISO14443B")]
    Iso14443B = crate::constants::PROTOCOL_ISO14443B,
    #[display(fmt = "FeliCa")]
    Felica = crate::constants::PROTOCOL_FELICA,
}

impl Protocol {
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Protocol {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            crate::constants::PROTOCOL_FIELD_OFF => Ok(Self::FieldOff),
            crate::constants::PROTOCOL_ISO15693 => Ok(Self::Iso15693),
            crate::constants::PROTOCOL_ISO14443A => Ok(Self::Iso14443A),
            crate::constants::PROTOCOL_ISO14443B => Ok(Self::Iso14443B),
            crate::constants::PROTOCOL_FELICA => Ok(Self::Felica),
            other => Err(Error::InvalidParameter(format!(
                "unknown protocol id {:#04x}",
                other
            ))),
        }
    }
}

/// NFC-DEP bit rate. The discriminant is the BRS byte sent in PSL_REQ
/// (DSI in the high nibble, DRI in the low nibble).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BitRate {
    #[display(fmt = "106 kbit/s")]
    Kbps106 = 0x00,
    #[display(fmt = "212 kbit/s")]
    Kbps212 = 0x09,
    #[display(fmt = "424 kbit/s")]
    Kbps424 = 0x12,
}

impl BitRate {
    pub fn brs(self) -> u8 {
        self as u8
    }

    pub fn from_brs(brs: u8) -> Option<Self> {
        match brs {
            0x00 => Some(Self::Kbps106),
            0x09 => Some(Self::Kbps212),
            0x12 => Some(Self::Kbps424),
            _ => None,
        }
    }
}
