// lib95hf/src/protocol/reply.rs

use crate::constants::{DATA_OFFSET, ECHO_RESPONSE, LENGTH_OFFSET, STATUS_NO_REPLY};
use crate::protocol::parser::{ensure_len, slice_at};
use crate::{Error, Result};

/// Chip reply `[status][len][data...]`. The echo pseudo reply is a single
/// status byte with no length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub status: u8,
    pub data: Vec<u8>,
}

impl Reply {
    pub fn new(status: u8, data: Vec<u8>) -> Self {
        Self { status, data }
    }

    /// Reply standing in for a chip that never answered
    pub fn no_reply() -> Self {
        Self::new(STATUS_NO_REPLY, Vec::new())
    }

    /// Decode a raw reply frame with bounds checking.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        ensure_len(raw, 1)?;
        let status = raw[0];
        if raw.len() == 1 {
            // Echo pseudo reply, or a bare status from a silent chip
            return Ok(Self::new(status, Vec::new()));
        }
        let len = raw[LENGTH_OFFSET] as usize;
        let data = slice_at(raw, DATA_OFFSET, len)?;
        Ok(Self::new(status, data.to_vec()))
    }

    pub fn is_echo(&self) -> bool {
        self.status == ECHO_RESPONSE
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Data with the `trailer` control bytes stripped
    pub fn payload(&self, trailer: usize) -> Result<&[u8]> {
        if self.data.len() < trailer {
            return Err(Error::InvalidLength {
                expected: trailer,
                actual: self.data.len(),
            });
        }
        Ok(&self.data[..self.data.len() - trailer])
    }

    /// Re-encode as `[status][len][data...]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + DATA_OFFSET);
        out.push(self.status);
        out.push(self.data.len() as u8);
        out.extend_from_slice(&self.data);
        out
    }
}
