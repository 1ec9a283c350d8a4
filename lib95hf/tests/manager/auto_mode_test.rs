#[path = "../common/mod.rs"]
mod common;

use common::fixtures::picc_inbound;
use lib95hf::config::Timings;
use lib95hf::emulation::EmulatedTagType;
use lib95hf::manager::{FixedPhase, Manager, ModeOutcome, P2pPhase};
use lib95hf::test_support::{initialized_device_with_clock, SimChip, SimTag};
use lib95hf::timer::MockClock;
use lib95hf::transport::MockTransport;
use lib95hf::{ManagerConfig, P2pMode, SerialInterface, TagFamily, TrackMask};

fn manager(chip: &SimChip) -> (MockTransport, Manager) {
    let mock = chip.transport(SerialInterface::Spi);
    let clock = MockClock::new().with_tick_ms(1);
    let dev = initialized_device_with_clock(&mock, clock).unwrap();
    let m = Manager::new(dev)
        .with_timings(Timings {
            emulation_window_ms: 50,
            target_steps: 20,
            ..Timings::default()
        })
        .with_strategy(FixedPhase(P2pPhase::NfcAInitiator));
    (mock, m)
}

#[test]
fn reader_role_reports_double_size_uid() {
    let uid = vec![0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
    let chip = SimChip::new().with_tag(SimTag::Iso14443a {
        uid: uid.clone(),
        sak: 0x00,
    });
    let (_mock, mut m) = manager(&chip);
    let config = ManagerConfig::builder().pcd(TrackMask::ALL).build();
    match m.auto_mode(&config) {
        ModeOutcome::TagFound(tag) => {
            assert_eq!(tag.family, TagFamily::Type2);
            assert_eq!(tag.uid.as_bytes(), &uid[..]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn card_role_reports_reader() {
    let chip = SimChip::new();
    let (mock, mut m) = manager(&chip);
    // a reader reads page 4 while the type 2 tag is emulated
    mock.push_pending(picc_inbound(&[0x30, 0x04]));
    let config = ManagerConfig::builder()
        .picc(TrackMask::NFC_TYPE2 | TrackMask::NFC_TYPE4A)
        .build();
    assert_eq!(
        m.auto_mode(&config),
        ModeOutcome::ReaderFound(EmulatedTagType::Type2)
    );
}

#[test]
fn reader_must_speak_the_emulated_type() {
    let chip = SimChip::new();
    let (mock, mut m) = manager(&chip);
    // RATS is not a type 2 command
    mock.push_pending(picc_inbound(&[0xE0, 0x80]));
    assert!(!m.tag_emulation(EmulatedTagType::Type2, 50));
    mock.push_pending(picc_inbound(&[0xE0, 0x80]));
    assert!(m.tag_emulation(EmulatedTagType::Type4A, 50));
}

#[test]
fn roles_run_in_order_until_one_succeeds() {
    // no tag and no reader: only the P2P peer answers
    let chip = SimChip::new().with_tag(SimTag::NfcDepA { llcp: true });
    let (mock, mut m) = manager(&chip);
    let config = ManagerConfig::builder()
        .pcd(TrackMask::NFC_TYPE3 | TrackMask::NFC_TYPE5)
        .picc(TrackMask::NFC_TYPE2)
        .p2p(P2pMode::ALL)
        .build();
    assert_eq!(
        m.auto_mode(&config),
        ModeOutcome::PeerFound(P2pMode::INITIATOR_NFCA)
    );
    // the card emulation window ran before P2P
    assert!(!mock.sent_with_code(lib95hf::constants::CMD_LISTEN).is_empty());
}

#[test]
fn stop_from_the_chip_side_ends_auto_mode() {
    let chip = SimChip::new();
    let (mock, mut m) = manager(&chip);
    let stop = m.stop_signal();
    let script_chip = chip.clone();
    let mut calls = 0usize;
    mock.set_script(Box::new(move |cmd: &[u8]| {
        calls += 1;
        if calls == 500 {
            stop.stop();
        }
        script_chip.respond(cmd)
    }));
    let config = ManagerConfig::builder()
        .pcd(TrackMask::ALL)
        .picc(TrackMask::NFC_TYPE2)
        .build();
    assert_eq!(m.auto_mode(&config), ModeOutcome::Stopped);
}
