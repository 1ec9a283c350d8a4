// lib95hf/src/protocol/result.rs

//! Reply interpretation: per-command status codes and RF CRC flags.

use crate::constants::*;
use crate::protocol::commands::CommandKind;
use crate::protocol::reply::Reply;
use crate::types::Protocol;
use crate::{Error, Result};

/// Classify `reply` as success or failure for a command of `kind`.
///
/// A status of 0xFF always means the chip never answered.
pub fn check_reply(kind: CommandKind, reply: &Reply) -> Result<()> {
    let status = reply.status;
    if status == STATUS_NO_REPLY {
        return Err(Error::NoReply {
            command: kind.code(),
        });
    }

    let rejected = Err(Error::ChipStatus {
        command: kind.code(),
        status,
    });

    match kind {
        CommandKind::Echo => {
            if status == ECHO_RESPONSE {
                Ok(())
            } else {
                Err(Error::UnexpectedResponse {
                    expected: ECHO_RESPONSE,
                    actual: status,
                })
            }
        }
        CommandKind::Idn
        | CommandKind::WriteRegister
        | CommandKind::PollField
        | CommandKind::Listen
        | CommandKind::Send
        | CommandKind::AcFilter => {
            if status == STATUS_OK {
                Ok(())
            } else {
                rejected
            }
        }
        // 0x82 (length) and 0x83 (invalid protocol) are the documented
        // rejections; anything else non-zero is treated the same way.
        CommandKind::ProtocolSelect | CommandKind::Idle | CommandKind::ReadRegister => {
            match status {
                STATUS_OK => Ok(()),
                _ => rejected,
            }
        }
        CommandKind::SendReceive => match status {
            SENDRECV_OK if !reply.is_empty() => Ok(()),
            SENDRECV_RESIDUAL => Ok(()),
            _ => rejected,
        },
        // The chip answers BAUD_RATE with a pseudo reply that is not a status
        CommandKind::BaudRate => rejected,
    }
}

/// Check the CRC-error flag the chip writes into the trailing control
/// byte(s) of a received RF frame.
pub fn check_crc(protocol: Protocol, reply: &Reply) -> Result<()> {
    let (control_len, mask) = match protocol {
        Protocol::Iso14443A => (ISO14443A_CONTROL_LEN, ISO14443A_CRC_ERROR_MASK),
        Protocol::Iso14443B | Protocol::Iso15693 | Protocol::Felica => {
            (SINGLE_CONTROL_LEN, SINGLE_CONTROL_CRC_ERROR_MASK)
        }
        Protocol::FieldOff => {
            return Err(Error::InvalidParameter(
                "no CRC flags without an RF protocol".into(),
            ));
        }
    };

    if reply.len() < control_len {
        return Err(Error::InvalidLength {
            expected: control_len,
            actual: reply.len(),
        });
    }
    let control = reply.data[reply.len() - control_len];
    if control & mask == mask {
        return Err(Error::CrcError);
    }
    Ok(())
}
