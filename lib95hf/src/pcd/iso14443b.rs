// lib95hf/src/pcd/iso14443b.rs

use log::{debug, warn};

use crate::constants::{REG_ARC_B, SINGLE_CONTROL_LEN};
use crate::device::{Device, Initialized};
use crate::protocol::check_crc;
use crate::protocol::parser::{be_u16_at, ensure_len, slice_at};
use crate::types::{Protocol, TagUid};
use crate::{Error, Result};

/// 106 kbit/s both ways with CRC appended, then the PP:MM timing bytes
const PROTOCOL_PARAMS: [u8; 3] = [0x01, 0x03, 0xFF];
/// Analog configuration (modulation index and receiver gain) for type B
const ANALOG_CONFIG: u16 = 0x0151;
const ARC_B_INDEX_FLAG: u8 = 0x01;
const REQB: [u8; 3] = [0x05, 0x00, 0x00];
const ATTRIB: u8 = 0x1D;
/// Param 1 to 4: default TR0/TR1/SOF/EOF, 256-byte frames at 106 kbit/s,
/// ISO14443-4 compliant, CID 0
const ATTRIB_PARAMS: [u8; 4] = [0x00, 0x08, 0x01, 0x00];
const PRESENCE_CHECK: [u8; 1] = [0xB2];
const PUPI_LEN: usize = 4;

/// Card data gathered by REQB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso14443bCard {
    pub pupi: TagUid,
    /// ATQB without the trailing control byte
    pub atqb: Vec<u8>,
}

/// Select ISO14443B and load the analog configuration. The register is
/// read back; a mismatch is a warning unless `strict_analog_check` is set.
pub fn init(device: &mut Device<Initialized>) -> Result<()> {
    device.select_protocol(Protocol::Iso14443B, &PROTOCOL_PARAMS)?;
    device.write_register(REG_ARC_B, ARC_B_INDEX_FLAG, &ANALOG_CONFIG.to_be_bytes())?;

    let reply = device.read_register(REG_ARC_B, 0x02, ARC_B_INDEX_FLAG)?;
    let actual = be_u16_at(&reply.data, 0)?;
    if actual != ANALOG_CONFIG {
        if device.config().strict_analog_check {
            return Err(Error::RegisterMismatch {
                register: REG_ARC_B,
                expected: ANALOG_CONFIG,
                actual,
            });
        }
        warn!(
            "ISO14443B: ARC_B reads {:#06x}, expected {:#06x}",
            actual, ANALOG_CONFIG
        );
    }
    Ok(())
}

/// Send REQB and return the answer.
pub fn reqb(device: &mut Device<Initialized>) -> Result<Iso14443bCard> {
    let reply = device.send_recv(&REQB)?;
    let atqb = reply.payload(SINGLE_CONTROL_LEN)?;
    let pupi = TagUid::try_from(slice_at(atqb, 1, PUPI_LEN)?)?;
    Ok(Iso14443bCard {
        pupi,
        atqb: atqb.to_vec(),
    })
}

/// Init, wait for the card to power up, then REQB.
pub fn is_present(device: &mut Device<Initialized>) -> Result<Iso14443bCard> {
    init(device)?;
    device.delay_ms(5);
    reqb(device)
}

/// Send ATTRIB for the card's PUPI and check the answer's CRC.
pub fn attrib(device: &mut Device<Initialized>, card: &Iso14443bCard) -> Result<()> {
    let mut frame = Vec::with_capacity(1 + PUPI_LEN + ATTRIB_PARAMS.len());
    frame.push(ATTRIB);
    frame.extend_from_slice(card.pupi.as_bytes());
    frame.extend_from_slice(&ATTRIB_PARAMS);
    let reply = device.send_recv(&frame)?;
    ensure_len(&reply.data, 1 + SINGLE_CONTROL_LEN)?;
    check_crc(Protocol::Iso14443B, &reply)?;
    debug!("ISO14443B: card {} activated", card.pupi.to_hex());
    Ok(())
}

/// Anticollision for type B is the ATTRIB exchange.
pub fn anticollision(device: &mut Device<Initialized>, card: &Iso14443bCard) -> Result<()> {
    attrib(device, card)
}

/// Check that an activated card still answers.
pub fn is_card_in_field(device: &mut Device<Initialized>) -> Result<()> {
    device.send_recv(&PRESENCE_CHECK).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::test_support::initialized_device_with_config;
    use crate::transport::MockTransport;
    use crate::types::SerialInterface;

    const ATQB: [u8; 15] = [
        0x50, 0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0x00, 0x00, 0x00, 0x71, 0x71, 0xAB, 0xCD, 0x00,
    ];

    fn queue_init(mock: &MockTransport, readback: [u8; 2]) {
        mock.push_response(vec![0x55]);
        mock.push_response(vec![0x00, 0x00]);
        mock.push_response(vec![0x00, 0x00]);
        mock.push_response(vec![0x00, 0x02, readback[0], readback[1]]);
    }

    #[test]
    fn init_writes_and_reads_back_arc_b() {
        let mock = MockTransport::new(SerialInterface::Spi);
        let mut dev = initialized_device_with_config(&mock, DeviceConfig::default()).unwrap();
        queue_init(&mock, [0x01, 0x51]);
        init(&mut dev).unwrap();
        let sent = mock.sent();
        assert_eq!(sent[1], vec![0x02, 0x04, 0x03, 0x01, 0x03, 0xFF]);
        assert_eq!(sent[2], vec![0x09, 0x04, 0x68, 0x01, 0x01, 0x51]);
        assert_eq!(sent[3], vec![0x08, 0x03, 0x68, 0x02, 0x01]);
    }

    #[test]
    fn readback_mismatch_is_warning_by_default() {
        let mock = MockTransport::new(SerialInterface::Spi);
        let mut dev = initialized_device_with_config(&mock, DeviceConfig::default()).unwrap();
        queue_init(&mock, [0x00, 0x00]);
        assert!(init(&mut dev).is_ok());
    }

    #[test]
    fn readback_mismatch_is_error_when_strict() {
        let mock = MockTransport::new(SerialInterface::Spi);
        let config = DeviceConfig {
            strict_analog_check: true,
            ..DeviceConfig::default()
        };
        let mut dev = initialized_device_with_config(&mock, config).unwrap();
        queue_init(&mock, [0x00, 0x00]);
        match init(&mut dev) {
            Err(Error::RegisterMismatch {
                register,
                expected,
                actual,
            }) => {
                assert_eq!(register, 0x68);
                assert_eq!(expected, 0x0151);
                assert_eq!(actual, 0x0000);
            }
            other => panic!("expected RegisterMismatch, got {:?}", other),
        }
    }

    #[test]
    fn reqb_then_attrib() {
        let mock = MockTransport::new(SerialInterface::Spi);
        let mut dev = initialized_device_with_config(&mock, DeviceConfig::default()).unwrap();
        let mut atqb = vec![0x80, ATQB.len() as u8];
        atqb.extend_from_slice(&ATQB);
        mock.push_response(atqb);
        mock.push_response(vec![0x80, 0x04, 0x00, 0x12, 0x34, 0x00]);

        let card = reqb(&mut dev).unwrap();
        assert_eq!(card.pupi.as_bytes(), &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(card.atqb.len(), ATQB.len() - 1);
        attrib(&mut dev, &card).unwrap();
        assert_eq!(
            mock.sent()[1],
            vec![0x04, 0x09, 0x1D, 0x12, 0x34, 0x56, 0x78, 0x00, 0x08, 0x01, 0x00]
        );
    }

    #[test]
    fn attrib_crc_error() {
        let mock = MockTransport::new(SerialInterface::Spi);
        let mut dev = initialized_device_with_config(&mock, DeviceConfig::default()).unwrap();
        let card = Iso14443bCard {
            pupi: TagUid::try_from(&[1u8, 2, 3, 4][..]).unwrap(),
            atqb: Vec::new(),
        };
        mock.push_response(vec![0x80, 0x04, 0x00, 0x12, 0x34, 0x02]);
        assert!(matches!(attrib(&mut dev, &card), Err(Error::CrcError)));
    }
}
