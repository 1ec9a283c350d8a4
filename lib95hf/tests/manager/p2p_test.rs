#[path = "../common/mod.rs"]
mod common;

use common::fixtures::picc_inbound;
use lib95hf::config::Timings;
use lib95hf::constants::{CMD_LISTEN, CMD_SEND_RECEIVE};
use lib95hf::manager::{FixedPhase, Manager, P2pPhase, RoundRobin, UniformRandom};
use lib95hf::nfcdep::shared_handler;
use lib95hf::test_support::{initialized_device, SimChip, SimTag};
use lib95hf::transport::MockTransport;
use lib95hf::{P2pMode, SerialInterface};

fn manager(chip: &SimChip, strategy: P2pPhase) -> (MockTransport, Manager) {
    let mock = chip.transport(SerialInterface::Spi);
    let dev = initialized_device(&mock).unwrap();
    let m = Manager::new(dev)
        .with_timings(Timings {
            nfca_initiator_polls: 3,
            nfcf_initiator_polls: 3,
            target_steps: 10,
            ..Timings::default()
        })
        .with_strategy(FixedPhase(strategy));
    (mock, m)
}

#[test]
fn target_phase_answers_initiator() {
    let chip = SimChip::new();
    let (mock, m) = manager(&chip, P2pPhase::NfcATarget);
    let mut m = m.with_dep_handler(shared_handler(|p: &[u8]| -> Vec<u8> { p.to_vec() }));
    mock.push_pending(picc_inbound(&[0xF0, 0x02, 0xD4, 0x0A]));
    assert_eq!(m.p2p(P2pMode::ALL), P2pMode::TARGET_NFCA);
    // no initiator phase ran before the target phase
    assert!(mock.sent_with_code(CMD_SEND_RECEIVE).is_empty());
}

#[test]
fn initiator_phases_poll_their_budget() {
    let chip = SimChip::new();
    let (mock, mut m) = manager(&chip, P2pPhase::NfcFInitiator);
    let stop = m.stop_signal();
    let script_chip = chip.clone();
    mock.set_script(Box::new(move |cmd: &[u8]| {
        // stop once the first target phase starts listening
        if cmd.first() == Some(&CMD_LISTEN) {
            stop.stop();
        }
        script_chip.respond(cmd)
    }));
    assert_eq!(m.p2p(P2pMode::ALL), P2pMode::empty());
    // three REQC polls, then the NFC-A target phase
    let reqc: Vec<_> = mock
        .sent_with_code(CMD_SEND_RECEIVE)
        .into_iter()
        .filter(|f| f.get(2) == Some(&0x00))
        .collect();
    assert_eq!(reqc.len(), 3);
}

#[test]
fn strategies_choose_start_phase() {
    use lib95hf::manager::PhaseStrategy;

    let mut rr = RoundRobin::default();
    assert_eq!(rr.start_phase(), P2pPhase::NfcAInitiator);
    assert_eq!(rr.start_phase(), P2pPhase::NfcFInitiator);

    let mut random = UniformRandom::seeded(42);
    let drawn: Vec<_> = (0..64).map(|_| random.start_phase()).collect();
    for phase in P2pPhase::ALL {
        assert!(drawn.contains(&phase), "{} never drawn", phase);
    }
}

#[test]
fn restricted_mode_only_uses_its_carrier() {
    let chip = SimChip::new()
        .with_tag(SimTag::NfcDepA { llcp: false })
        .with_tag(SimTag::NfcDepF { llcp: false });
    let (_mock, mut m) = manager(&chip, P2pPhase::NfcAInitiator);
    assert_eq!(m.p2p(P2pMode::INITIATOR_NFCF), P2pMode::INITIATOR_NFCF);
}
