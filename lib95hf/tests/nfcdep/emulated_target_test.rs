#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{field_cutoff, picc_inbound};
use common::helpers::{drain, last_sent_data, sim_device};
use lib95hf::constants::{CMD_AC_FILTER, CMD_SEND};
use lib95hf::emulation::{CardEmulator, EmulatedTagType};
use lib95hf::nfcdep::{shared_handler, LLCP_MAGIC, START_BYTE};
use lib95hf::test_support::SimChip;

/// NFC-A request as the chip delivers it (before its trailer)
fn a_request(body: &[u8]) -> Vec<u8> {
    let mut frame = vec![START_BYTE, body.len() as u8];
    frame.extend_from_slice(body);
    picc_inbound(&frame)
}

fn atr_req(llcp: bool) -> Vec<u8> {
    let mut body = vec![0xD4, 0x00];
    body.extend_from_slice(&[0x01; 10]);
    if llcp {
        body.extend_from_slice(&[0x00, 0x00, 0x00, 0x22]);
        body.extend_from_slice(&LLCP_MAGIC);
        body.extend_from_slice(&[0x01, 0x01, 0x10]);
    } else {
        body.extend_from_slice(&[0x00, 0x00, 0x00, 0x20]);
    }
    body
}

#[test]
fn atr_and_dep_through_card_emulation() {
    let (mock, mut dev) = sim_device(&SimChip::new());
    let mut emulator = CardEmulator::with_dep_handler(shared_handler(
        |payload: &[u8]| -> Vec<u8> { payload.to_ascii_uppercase() },
    ));
    emulator.init(EmulatedTagType::NfcDepA);

    mock.push_pending(a_request(&atr_req(false)));
    drain(&mut emulator, &mut dev, &mock);
    let atr_res = last_sent_data(&mock, CMD_SEND).unwrap();
    assert_eq!(&atr_res[..4], &[START_BYTE, 17, 0xD5, 0x01]);
    assert_eq!(*atr_res.last().unwrap(), 0x28);

    mock.push_pending(a_request(&[0xD4, 0x06, 0x00, b'h', b'i']));
    drain(&mut emulator, &mut dev, &mock);
    assert_eq!(
        last_sent_data(&mock, CMD_SEND).unwrap(),
        vec![START_BYTE, 0x05, 0xD5, 0x07, 0x00, b'H', b'I', 0x28]
    );
    // NFC-DEP exchanges are not reported as a reader command
    assert_eq!(emulator.take_command_received(), None);
}

#[test]
fn llcp_target_answers_with_general_bytes() {
    let (mock, mut dev) = sim_device(&SimChip::new());
    let mut emulator = CardEmulator::new();
    emulator.init(EmulatedTagType::LlcpA);

    mock.push_pending(a_request(&atr_req(true)));
    drain(&mut emulator, &mut dev, &mock);
    let atr_res = last_sent_data(&mock, CMD_SEND).unwrap();
    // PPt announces general bytes, which start with the LLCP magic
    assert_eq!(atr_res[2 + 16] & 0x02, 0x02);
    assert_eq!(&atr_res[2 + 17..2 + 20], &LLCP_MAGIC);
    // filter loaded with the NFC-DEP SAK
    assert_eq!(mock.sent_with_code(CMD_AC_FILTER)[0][4], 0x40);
}

#[test]
fn field_cutoff_forgets_the_initiator() {
    let (mock, mut dev) = sim_device(&SimChip::new());
    let mut emulator = CardEmulator::new();
    emulator.init(EmulatedTagType::NfcDepA);

    mock.push_pending(a_request(&atr_req(false)));
    drain(&mut emulator, &mut dev, &mock);
    mock.push_pending(field_cutoff());
    drain(&mut emulator, &mut dev, &mock);
    mock.clear_sent();

    // PSL now fails the FSL check against an unknown initiator and is dropped
    mock.push_pending(a_request(&[0xD4, 0x04, 0x00, 0x00, 0x02]));
    drain(&mut emulator, &mut dev, &mock);
    assert!(mock.sent_with_code(CMD_SEND).is_empty());
}
