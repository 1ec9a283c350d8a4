// lib95hf/src/protocol/commands.rs

use crate::constants::*;
use crate::{Error, Result};

/// Command kinds as far as reply interpretation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Echo,
    Idn,
    ProtocolSelect,
    PollField,
    SendReceive,
    Listen,
    Send,
    Idle,
    ReadRegister,
    WriteRegister,
    BaudRate,
    AcFilter,
}

impl CommandKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Echo => CMD_ECHO,
            Self::Idn => CMD_IDN,
            Self::ProtocolSelect => CMD_PROTOCOL_SELECT,
            Self::PollField => CMD_POLL_FIELD,
            Self::SendReceive => CMD_SEND_RECEIVE,
            Self::Listen => CMD_LISTEN,
            Self::Send => CMD_SEND,
            Self::Idle => CMD_IDLE,
            Self::ReadRegister => CMD_READ_REGISTER,
            Self::WriteRegister => CMD_WRITE_REGISTER,
            Self::BaudRate => CMD_BAUD_RATE,
            Self::AcFilter => CMD_AC_FILTER,
        }
    }
}

/// Number of parameter bytes an IDLE command carries
pub const IDLE_PARAMS_LEN: usize = 14;

/// High-level chip command. `encode` produces the `[code][len][data...]`
/// frame sent over the serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Echo,
    Idn,
    ProtocolSelect { protocol: u8, params: Vec<u8> },
    PollField,
    /// RF frame to transmit, including the trailing transmission flags byte
    SendReceive(Vec<u8>),
    Listen,
    /// Card-emulation answer, including the trailing transmission flags byte
    Send(Vec<u8>),
    Idle([u8; IDLE_PARAMS_LEN]),
    ReadRegister { address: u8, count: u8, flags: u8 },
    WriteRegister { address: u8, flags: u8, data: Vec<u8> },
    BaudRate(u8),
    AcFilter(Vec<u8>),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Echo => CommandKind::Echo,
            Self::Idn => CommandKind::Idn,
            Self::ProtocolSelect { .. } => CommandKind::ProtocolSelect,
            Self::PollField => CommandKind::PollField,
            Self::SendReceive(_) => CommandKind::SendReceive,
            Self::Listen => CommandKind::Listen,
            Self::Send(_) => CommandKind::Send,
            Self::Idle(_) => CommandKind::Idle,
            Self::ReadRegister { .. } => CommandKind::ReadRegister,
            Self::WriteRegister { .. } => CommandKind::WriteRegister,
            Self::BaudRate(_) => CommandKind::BaudRate,
            Self::AcFilter(_) => CommandKind::AcFilter,
        }
    }

    pub fn code(&self) -> u8 {
        self.kind().code()
    }

    /// Encode into a chip frame. Echo is the only single-byte command.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let data: Vec<u8> = match self {
            Self::Echo => return Ok(vec![CMD_ECHO]),
            Self::Idn | Self::PollField | Self::Listen => Vec::new(),
            Self::ProtocolSelect { protocol, params } => {
                let mut d = Vec::with_capacity(params.len() + 1);
                d.push(*protocol);
                d.extend_from_slice(params);
                d
            }
            Self::SendReceive(frame) => {
                if frame.is_empty() {
                    return Err(Error::InvalidLength {
                        expected: 1,
                        actual: 0,
                    });
                }
                frame.clone()
            }
            Self::Send(frame) | Self::AcFilter(frame) => frame.clone(),
            Self::Idle(params) => params.to_vec(),
            Self::ReadRegister {
                address,
                count,
                flags,
            } => vec![*address, *count, *flags],
            Self::WriteRegister {
                address,
                flags,
                data,
            } => {
                let mut d = Vec::with_capacity(data.len() + 2);
                d.push(*address);
                d.push(*flags);
                d.extend_from_slice(data);
                d
            }
            Self::BaudRate(param) => vec![*param],
        };

        if data.len() > MAX_BUFFER_SIZE {
            return Err(Error::InvalidLength {
                expected: MAX_BUFFER_SIZE,
                actual: data.len(),
            });
        }

        let mut out = Vec::with_capacity(data.len() + DATA_OFFSET);
        out.push(self.code());
        out.push(data.len() as u8);
        out.extend_from_slice(&data);
        Ok(out)
    }
}
