#[path = "../common/mod.rs"]
mod common;

use common::helpers::sim_device;
use lib95hf::nfcdep::{frame_body, no_payload_handler, Carrier, NfcDepTarget};
use lib95hf::protocol::{check_crc, check_reply, CommandKind, Reply};
use lib95hf::test_support::SimChip;
use lib95hf::{Error, Protocol};
use proptest::prelude::*;

const KINDS: [CommandKind; 6] = [
    CommandKind::Echo,
    CommandKind::Idn,
    CommandKind::ProtocolSelect,
    CommandKind::SendReceive,
    CommandKind::Listen,
    CommandKind::BaudRate,
];

proptest! {
    #[test]
    fn reply_decoding_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..300)) {
        match Reply::decode(&raw) {
            Ok(reply) => {
                for kind in KINDS {
                    let _ = check_reply(kind, &reply);
                }
                for protocol in [Protocol::Iso14443A, Protocol::Felica] {
                    let _ = check_crc(protocol, &reply);
                }
            }
            Err(e) => prop_assert!(matches!(e, Error::InvalidLength { .. })),
        }
    }

    #[test]
    fn decoded_length_matches_header(status in any::<u8>(), data in proptest::collection::vec(any::<u8>(), 0..255)) {
        let mut raw = vec![status, data.len() as u8];
        raw.extend_from_slice(&data);
        // trailing bytes past the announced length are ignored
        raw.push(0xEE);
        let reply = Reply::decode(&raw).unwrap();
        prop_assert_eq!(reply.status, status);
        prop_assert_eq!(reply.data, data);
    }

    #[test]
    fn nfcdep_framing_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = frame_body(Carrier::NfcA, &data);
        let _ = frame_body(Carrier::NfcF, &data);
    }

    #[test]
    fn target_survives_arbitrary_requests(tail in proptest::collection::vec(any::<u8>(), 0..40)) {
        let (_mock, mut dev) = sim_device(&SimChip::new());
        let mut target = NfcDepTarget::init(Carrier::NfcA, true, no_payload_handler());
        let mut frame = vec![0xF0, (tail.len() + 1) as u8, 0xD4];
        frame.extend_from_slice(&tail);
        frame.extend_from_slice(&[0xAB, 0xCD, 0x08]);
        let r = target.reply_command(&mut dev, &frame);
        prop_assert!(r.is_ok() || matches!(r, Err(Error::CommandUnknown)));
    }
}
