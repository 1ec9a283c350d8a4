// lib95hf/src/transport/mock.rs

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::transport::traits::Transport;
use crate::types::SerialInterface;
use crate::{Error, Result};

/// Programmable chip model: maps a command frame to a reply frame, or to
/// `None` when the chip stays silent.
pub type ChipScript = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    pending: VecDeque<Vec<u8>>,
    script: Option<ChipScript>,
    resets: usize,
    baud_rates: Vec<u32>,
}

/// Mock transport for unit tests. It records sent frames and answers from
/// queued responses first, then from an optional [`ChipScript`].
///
/// Clones share state, so a test can keep one handle for inspection after
/// boxing another into a `Device`.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    interface: SerialInterface,
}

impl MockTransport {
    pub fn new(interface: SerialInterface) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            interface,
        }
    }

    /// Build a mock whose replies come from `script` once the response
    /// queue is drained.
    pub fn scripted(interface: SerialInterface, script: ChipScript) -> Self {
        let mock = Self::new(interface);
        mock.set_script(script);
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_script(&self, script: ChipScript) {
        self.lock().script = Some(script);
    }

    pub fn push_response(&self, resp: Vec<u8>) {
        self.lock().responses.push_back(resp);
    }

    /// Queue an inbound frame for `read_pending`; `data_ready` reports true
    /// while any are queued.
    pub fn push_pending(&self, frame: Vec<u8>) {
        self.lock().pending.push_back(frame);
    }

    /// Every frame sent so far, in order
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Sent frames whose command code matches `code`
    pub fn sent_with_code(&self, code: u8) -> Vec<Vec<u8>> {
        self.lock()
            .sent
            .iter()
            .filter(|f| f.first() == Some(&code))
            .cloned()
            .collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn reset_count(&self) -> usize {
        self.lock().resets
    }

    pub fn baud_rates(&self) -> Vec<u32> {
        self.lock().baud_rates.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockTransport")
            .field("interface", &self.interface)
            .field("sent", &state.sent.len())
            .field("responses", &state.responses.len())
            .field("pending", &state.pending.len())
            .field("scripted", &state.script.is_some())
            .finish()
    }
}

impl Transport for MockTransport {
    fn send_receive(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.sent.push(command.to_vec());
        if let Some(resp) = state.responses.pop_front() {
            return Ok(resp);
        }
        match state.script.as_mut() {
            Some(script) => script(command).ok_or(Error::Timeout),
            None => Err(Error::Timeout),
        }
    }

    fn send(&mut self, command: &[u8]) -> Result<()> {
        self.lock().sent.push(command.to_vec());
        Ok(())
    }

    fn read_pending(&mut self) -> Result<Vec<u8>> {
        self.lock().pending.pop_front().ok_or(Error::Timeout)
    }

    fn data_ready(&mut self) -> bool {
        !self.lock().pending.is_empty()
    }

    fn interface(&self) -> SerialInterface {
        self.interface
    }

    fn pulse_reset(&mut self) -> Result<()> {
        self.lock().resets += 1;
        Ok(())
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        self.lock().baud_rates.push(baud);
        Ok(())
    }
}
