use lib95hf::protocol::{check_crc, check_reply, Command, CommandKind, Reply};
use lib95hf::{Error, Protocol};

fn reply(frame: &str) -> Reply {
    Reply::decode(&hex::decode(frame).unwrap()).unwrap()
}

#[test]
fn command_frames_on_the_wire() {
    let select = Command::ProtocolSelect {
        protocol: 0x02,
        params: vec![0x00],
    };
    assert_eq!(hex::encode(select.encode().unwrap()), "02020200");
    assert_eq!(hex::encode(Command::Echo.encode().unwrap()), "55");
    assert_eq!(hex::encode(Command::Listen.encode().unwrap()), "0500");
    assert_eq!(
        hex::encode(Command::SendReceive(vec![0x26, 0x07]).encode().unwrap()),
        "04022607"
    );
    assert!(Command::SendReceive(Vec::new()).encode().is_err());
}

#[test]
fn transport_timeout_reads_as_no_reply_everywhere() {
    for kind in [
        CommandKind::Idn,
        CommandKind::ProtocolSelect,
        CommandKind::SendReceive,
        CommandKind::Listen,
        CommandKind::AcFilter,
    ] {
        assert!(check_reply(kind, &Reply::no_reply())
            .unwrap_err()
            .is_no_reply());
    }
}

#[test]
fn send_receive_statuses() {
    assert!(check_reply(CommandKind::SendReceive, &reply("80054400080000")).is_ok());
    assert!(check_reply(CommandKind::SendReceive, &reply("9002aa00")).is_ok());
    // success status without data is not a tag answer
    assert!(check_reply(CommandKind::SendReceive, &reply("8000")).is_err());
    assert!(matches!(
        check_reply(CommandKind::SendReceive, &reply("8700")),
        Err(Error::ChipStatus {
            command: 0x04,
            status: 0x87
        })
    ));
}

#[test]
fn protocol_select_rejections() {
    assert!(check_reply(CommandKind::ProtocolSelect, &reply("0000")).is_ok());
    for frame in ["8200", "8300"] {
        assert!(check_reply(CommandKind::ProtocolSelect, &reply(frame)).is_err());
    }
}

#[test]
fn crc_flags_per_protocol() {
    // ISO14443A: the flag sits in the first of three control bytes
    assert!(check_crc(Protocol::Iso14443A, &reply("80054400080000")).is_ok());
    assert!(matches!(
        check_crc(Protocol::Iso14443A, &reply("8004aa280000")),
        Err(Error::CrcError)
    ));
    assert!(matches!(
        check_crc(Protocol::Iso14443A, &reply("8002aa00")),
        Err(Error::InvalidLength { .. })
    ));
    // the other protocols append a single control byte
    assert!(check_crc(Protocol::Iso15693, &reply("8003000000")).is_ok());
    assert!(matches!(
        check_crc(Protocol::Felica, &reply("8003aabb02")),
        Err(Error::CrcError)
    ));
}
