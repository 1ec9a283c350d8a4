// lib95hf/src/error.rs

use thiserror::Error;

/// Common error type
#[derive(Error, Debug)]
pub enum Error {
    /// The transport did not deliver a reply in time.
    #[error("operation timed out")]
    Timeout,

    #[error("no reply from transceiver for command {command:#04x}")]
    NoReply { command: u8 },

    #[error("power-on-reset sequence failed after {attempts} attempts")]
    PorFailed { attempts: usize },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("command {command:#04x} rejected by transceiver: status={status:#04x}")]
    ChipStatus { command: u8, status: u8 },

    #[error("crc error reported in control byte")]
    CrcError,

    #[error("unexpected response code: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("unknown or mismatched peer command")]
    CommandUnknown,

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("register {register:#04x} read back {actual:#06x}, expected {expected:#06x}")]
    RegisterMismatch {
        register: u8,
        expected: u16,
        actual: u16,
    },

    #[error("tag type not supported by the transceiver: {0}")]
    UnsupportedTagType(String),

    #[error("operation stopped by caller")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures that mean "the chip did not answer" rather than
    /// "the chip answered with an error".
    pub fn is_no_reply(&self) -> bool {
        matches!(self, Error::Timeout | Error::NoReply { .. })
    }
}
