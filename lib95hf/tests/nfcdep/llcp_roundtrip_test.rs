#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Mutex};

use common::helpers::DepLink;
use lib95hf::constants::{CMD_PROTOCOL_SELECT, PICC_PARAMETER_14443A_424};
use lib95hf::nfcdep::{shared_handler, Carrier, Initiator, NfcDepTarget};
use lib95hf::{BitRate, Error};
use proptest::prelude::*;

fn echo_target(carrier: Carrier, llcp: bool) -> NfcDepTarget {
    NfcDepTarget::init(
        carrier,
        llcp,
        shared_handler(|payload: &[u8]| -> Vec<u8> { payload.iter().rev().copied().collect() }),
    )
}

#[test]
fn llcp_negotiated_on_both_sides() {
    let mut link = DepLink::new(Carrier::NfcA);
    let mut initiator = Initiator::new(Carrier::NfcA, true);
    let mut target = echo_target(Carrier::NfcA, true);

    link.call(&mut target, |dev| initiator.atr(dev)).unwrap();

    assert!(initiator.target().llcp);
    assert!(target.llcp_active());
    assert_eq!(target.initiator().nfcid3i, initiator.session().nfcid3i);
    assert_eq!(initiator.target().nfcid3t, target.session().nfcid3t);
    assert_eq!(initiator.target().to, 0x0E);
}

#[test]
fn llcp_needs_both_sides() {
    let mut link = DepLink::new(Carrier::NfcA);
    let mut initiator = Initiator::new(Carrier::NfcA, true);
    let mut target = echo_target(Carrier::NfcA, false);

    link.call(&mut target, |dev| initiator.atr(dev)).unwrap();

    assert!(!initiator.target().llcp);
    assert!(initiator.target().general_bytes.is_empty());
    assert!(!target.llcp_active());
    // the target still records what the initiator offered
    assert!(target.initiator().llcp);
}

#[test]
fn full_session_over_nfca() {
    let mut link = DepLink::new(Carrier::NfcA);
    let mut initiator = Initiator::new(Carrier::NfcA, true);
    let mut target = echo_target(Carrier::NfcA, true);

    link.call(&mut target, |dev| initiator.atr(dev)).unwrap();
    link.call(&mut target, |dev| initiator.psl(dev, BitRate::Kbps424))
        .unwrap();
    // the target moved its card emulation to 424 kbit/s
    let selects = link.target_mock.sent_with_code(CMD_PROTOCOL_SELECT);
    assert_eq!(selects.last().unwrap()[3], PICC_PARAMETER_14443A_424);
    assert_eq!(target.initiator().brs, BitRate::Kbps424.brs());

    let data = link
        .call(&mut target, |dev| initiator.dep(dev, 0x00, &[1, 2, 3]))
        .unwrap();
    assert_eq!(data, vec![3, 2, 1]);

    link.call(&mut target, |dev| initiator.dsl(dev)).unwrap();
    link.call(&mut target, |dev| initiator.rls(dev)).unwrap();
}

#[test]
fn full_session_over_nfcf() {
    let mut link = DepLink::new(Carrier::NfcF);
    let mut initiator = Initiator::new(Carrier::NfcF, false);
    let mut target = echo_target(Carrier::NfcF, false);

    link.call(&mut target, |dev| initiator.atr(dev)).unwrap();
    link.call(&mut target, |dev| initiator.psl(dev, BitRate::Kbps424))
        .unwrap();
    // NFC-F targets keep their card emulation parameters
    assert!(link
        .target_mock
        .sent_with_code(CMD_PROTOCOL_SELECT)
        .is_empty());

    let data = link
        .call(&mut target, |dev| initiator.dep(dev, 0x00, b"ping"))
        .unwrap();
    assert_eq!(data, b"gnip".to_vec());
}

#[test]
fn psl_before_atr_is_dropped() {
    let mut link = DepLink::new(Carrier::NfcA);
    let mut initiator = Initiator::new(Carrier::NfcA, false);
    let mut target = echo_target(Carrier::NfcA, false);

    // without ATR the target has no length reduction to check FSL against
    let r = link.call(&mut target, |dev| initiator.psl(dev, BitRate::Kbps212));
    assert!(matches!(r, Err(Error::CommandUnknown)));
    assert!(link.target_mock.sent().is_empty());
}

#[test]
fn handler_sees_every_payload_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let mut target = NfcDepTarget::init(
        Carrier::NfcA,
        true,
        shared_handler(move |payload: &[u8]| -> Vec<u8> {
            log.lock().unwrap().push(payload.to_vec());
            vec![0xAA]
        }),
    );
    let mut link = DepLink::new(Carrier::NfcA);
    let mut initiator = Initiator::new(Carrier::NfcA, true);

    link.call(&mut target, |dev| initiator.atr(dev)).unwrap();
    for i in 0..3u8 {
        let out = link
            .call(&mut target, |dev| initiator.dep(dev, 0x00, &[i]))
            .unwrap();
        assert_eq!(out, vec![0xAA]);
    }
    assert_eq!(*seen.lock().unwrap(), vec![vec![0], vec![1], vec![2]]);
}

proptest! {
    #[test]
    fn dep_payloads_survive_the_link(payload in proptest::collection::vec(any::<u8>(), 0..200)) {
        let mut link = DepLink::new(Carrier::NfcA);
        let mut initiator = Initiator::new(Carrier::NfcA, true);
        let mut target = echo_target(Carrier::NfcA, true);

        link.call(&mut target, |dev| initiator.atr(dev)).unwrap();
        let out = link
            .call(&mut target, |dev| initiator.dep(dev, 0x00, &payload))
            .unwrap();
        let expected: Vec<u8> = payload.iter().rev().copied().collect();
        prop_assert_eq!(out, expected);
    }
}
