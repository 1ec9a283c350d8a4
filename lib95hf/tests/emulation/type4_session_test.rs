#[path = "../common/mod.rs"]
mod common;

use common::fixtures::*;
use common::helpers::{drain, last_sent_data, sim_device};
use lib95hf::constants::CMD_SEND;
use lib95hf::device::{Device, Initialized};
use lib95hf::emulation::{CardEmulator, EmulatedTagType};
use lib95hf::test_support::SimChip;
use lib95hf::transport::MockTransport;

struct Reader {
    mock: MockTransport,
    dev: Device<Initialized>,
    emulator: CardEmulator,
}

impl Reader {
    fn new() -> Self {
        let (mock, dev) = sim_device(&SimChip::new());
        let mut emulator = CardEmulator::new();
        emulator.init(EmulatedTagType::Type4A);
        Self { mock, dev, emulator }
    }

    /// Deliver one frame to the emulated tag and return its answer
    /// without the CRC control byte.
    fn transceive(&mut self, frame: &[u8]) -> Vec<u8> {
        self.mock.clear_sent();
        self.mock.push_pending(picc_inbound(frame));
        drain(&mut self.emulator, &mut self.dev, &self.mock);
        let mut answer = last_sent_data(&self.mock, CMD_SEND).expect("tag did not answer");
        assert_eq!(answer.pop(), Some(0x28));
        answer
    }
}

#[test]
fn reader_reads_capability_container() {
    let mut r = Reader::new();
    assert_eq!(r.transceive(&[0xE0, 0x80]), vec![0x05, 0x78, 0x80, 0x70, 0x02]);
    assert_eq!(r.transceive(&select_ndef_application(0x02)), vec![0x02, 0x90, 0x00]);
    assert_eq!(r.transceive(&select_file(0x03, 0xE103)), vec![0x03, 0x90, 0x00]);

    let cc = r.transceive(&read_binary(0x02, 0, 15));
    assert_eq!(cc[0], 0x02);
    assert_eq!(&cc[1..3], &[0x00, 0x0F]);
    // NDEF file control TLV names E104
    assert_eq!(&cc[10..12], &[0xE1, 0x04]);
    assert_eq!(&cc[16..], &[0x90, 0x00]);

    assert_eq!(
        r.emulator.take_command_received(),
        Some(EmulatedTagType::Type4A)
    );
}

#[test]
fn reader_writes_then_reads_ndef() {
    let mut r = Reader::new();
    r.transceive(&select_ndef_application(0x02));
    r.transceive(&select_file(0x03, 0xE104));

    let message = [0xD1, 0x01, 0x04, 0x54, 0x02, b'e', b'n', b'!'];
    let mut file = vec![0x00, message.len() as u8];
    file.extend_from_slice(&message);
    assert_eq!(
        r.transceive(&update_binary(0x02, 0, &file)),
        vec![0x02, 0x90, 0x00]
    );

    let nlen = r.transceive(&read_binary(0x03, 0, 2));
    assert_eq!(nlen, vec![0x03, 0x00, message.len() as u8, 0x90, 0x00]);
    let body = r.transceive(&read_binary(0x02, 2, message.len() as u8));
    assert_eq!(&body[1..1 + message.len()], &message);
}

#[test]
fn capability_container_is_read_only() {
    let mut r = Reader::new();
    r.transceive(&select_ndef_application(0x02));
    r.transceive(&select_file(0x03, 0xE103));
    assert_eq!(
        r.transceive(&update_binary(0x02, 0, &[0xFF])),
        vec![0x02, 0x69, 0x82]
    );
}

#[test]
fn selection_is_lost_on_field_cutoff() {
    let mut r = Reader::new();
    r.transceive(&select_ndef_application(0x02));
    r.mock.push_pending(field_cutoff());
    drain(&mut r.emulator, &mut r.dev, &r.mock);
    assert_eq!(
        r.transceive(&select_file(0x03, 0xE104)),
        vec![0x03, 0x6A, 0x82]
    );
}

#[test]
fn r_ack_repeats_last_block() {
    let mut r = Reader::new();
    let first = r.transceive(&select_ndef_application(0x02));
    assert_eq!(r.transceive(&[0xA2]), first);
    assert_eq!(r.transceive(&[0xC2]), vec![0xC2]);
}
