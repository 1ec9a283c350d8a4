#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{field_cutoff, picc_inbound};
use common::helpers::{drain, last_sent_data, sim_device};
use lib95hf::constants::{CMD_AC_FILTER, CMD_LISTEN, CMD_SEND};
use lib95hf::emulation::{CardEmulator, EmulatedTagType, EmulationState};
use lib95hf::test_support::SimChip;

#[test]
fn reader_reads_and_writes_pages() {
    let (mock, mut dev) = sim_device(&SimChip::new());
    let mut emulator = CardEmulator::new();
    emulator.init(EmulatedTagType::Type2);

    mock.push_pending(picc_inbound(&[0x30, 0x00]));
    drain(&mut emulator, &mut dev, &mock);
    let pages = last_sent_data(&mock, CMD_SEND).unwrap();
    assert_eq!(pages.len(), 17);
    // UID0 UID1 UID2 BCC0 with the cascade tag folded into BCC0
    assert_eq!(&pages[..4], &[0x02, 0x80, 0x74, 0x7E]);

    mock.push_pending(picc_inbound(&[0xA2, 0x04, 0x03, 0x03, 0xD0, 0x00]));
    drain(&mut emulator, &mut dev, &mock);
    assert_eq!(last_sent_data(&mock, CMD_SEND).unwrap(), vec![0x0A, 0x04]);

    mock.push_pending(picc_inbound(&[0x30, 0x04]));
    drain(&mut emulator, &mut dev, &mock);
    assert_eq!(
        &last_sent_data(&mock, CMD_SEND).unwrap()[..4],
        &[0x03, 0x03, 0xD0, 0x00]
    );
    assert_eq!(emulator.take_command_received(), Some(EmulatedTagType::Type2));
}

#[test]
fn cutoff_rearms_filter_and_keeps_memory() {
    let (mock, mut dev) = sim_device(&SimChip::new());
    let mut emulator = CardEmulator::new();
    emulator.init(EmulatedTagType::Type2);

    mock.push_pending(picc_inbound(&[0xA2, 0x05, 1, 2, 3, 4]));
    drain(&mut emulator, &mut dev, &mock);
    mock.push_pending(field_cutoff());
    drain(&mut emulator, &mut dev, &mock);
    assert_eq!(mock.sent_with_code(CMD_AC_FILTER).len(), 2);

    mock.push_pending(picc_inbound(&[0x30, 0x05]));
    drain(&mut emulator, &mut dev, &mock);
    assert_eq!(&last_sent_data(&mock, CMD_SEND).unwrap()[..4], &[1, 2, 3, 4]);
}

#[test]
fn no_field_keeps_waiting() {
    let chip = SimChip::new();
    let (mock, mut dev) = sim_device(&chip);
    chip.push_listen(vec![0x8F, 0x00]);
    chip.push_listen(vec![0x8F, 0x00]);
    let mut emulator = CardEmulator::new();
    emulator.init(EmulatedTagType::Type2);

    assert_eq!(emulator.step(&mut dev), EmulationState::WaitField);
    assert_eq!(emulator.step(&mut dev), EmulationState::WaitField);
    assert_eq!(emulator.step(&mut dev), EmulationState::Activated);
    assert_eq!(mock.sent_with_code(CMD_LISTEN).len(), 3);

    emulator.disable(&mut dev);
    assert_eq!(emulator.state(), EmulationState::Deactivated);
    assert_eq!(emulator.step(&mut dev), EmulationState::Deactivated);
}
