// Device setup and relays shared by the integration tests

use lib95hf::constants::{CMD_SEND, CMD_SEND_RECEIVE, DATA_OFFSET, SENDRECV_OK};
use lib95hf::device::{Device, Initialized};
use lib95hf::emulation::{CardEmulator, EmulationState};
use lib95hf::nfcdep::{Carrier, NfcDepTarget, TIME_SLOT};
use lib95hf::test_support::{initialized_device, SimChip};
use lib95hf::transport::MockTransport;
use lib95hf::types::SerialInterface;
use lib95hf::Result;

use super::fixtures::RX_TRAILER;

/// Initialized SPI device answering through `chip`.
pub fn sim_device(chip: &SimChip) -> (MockTransport, Device<Initialized>) {
    let mock = chip.transport(SerialInterface::Spi);
    let dev = initialized_device(&mock).expect("sim device init");
    (mock, dev)
}

/// Data of the last command sent with `code`, header stripped.
pub fn last_sent_data(mock: &MockTransport, code: u8) -> Option<Vec<u8>> {
    mock.sent_with_code(code)
        .last()
        .map(|frame| frame[DATA_OFFSET..].to_vec())
}

/// Step the emulator until every queued inbound frame has been answered.
pub fn drain(emulator: &mut CardEmulator, dev: &mut Device<Initialized>, mock: &MockTransport) {
    for _ in 0..64 {
        let state = emulator.step(dev);
        if mock.pending_len() == 0 && state == EmulationState::Activated {
            return;
        }
    }
    panic!("emulator did not settle: {:?}", emulator.session());
}

/// Two simulated chips facing each other: requests the initiator sends with
/// SEND_RECEIVE are handed to an NFC-DEP target, and the target's answer is
/// queued as the initiator's reply.
pub struct DepLink {
    pub carrier: Carrier,
    pub initiator_mock: MockTransport,
    pub initiator_dev: Device<Initialized>,
    pub target_mock: MockTransport,
    pub target_dev: Device<Initialized>,
}

impl DepLink {
    pub fn new(carrier: Carrier) -> Self {
        let (initiator_mock, initiator_dev) = sim_device(&SimChip::new());
        let (target_mock, target_dev) = sim_device(&SimChip::new());
        Self {
            carrier,
            initiator_mock,
            initiator_dev,
            target_mock,
            target_dev,
        }
    }

    /// Run `op` on the initiator side once to capture its request, deliver
    /// the request to `target`, then run `op` again against the target's
    /// answer.
    pub fn call<R>(
        &mut self,
        target: &mut NfcDepTarget,
        mut op: impl FnMut(&mut Device<Initialized>) -> Result<R>,
    ) -> Result<R> {
        self.initiator_mock.clear_sent();
        let _ = op(&mut self.initiator_dev);
        let request = last_sent_data(&self.initiator_mock, CMD_SEND_RECEIVE)
            .expect("initiator sent no request");

        self.target_mock.clear_sent();
        target.reply_command(&mut self.target_dev, &self.as_received(&request))?;
        if let Some(mut answer) = last_sent_data(&self.target_mock, CMD_SEND) {
            answer.extend_from_slice(&RX_TRAILER[..3]);
            let mut reply = vec![SENDRECV_OK, answer.len() as u8];
            reply.extend_from_slice(&answer);
            self.initiator_mock.push_response(reply);
        }
        op(&mut self.initiator_dev)
    }

    /// A request as the target chip would deliver it: the reader-side time
    /// slot byte is not transmitted and the chip appends CRC and flags.
    fn as_received(&self, request: &[u8]) -> Vec<u8> {
        let mut data = match self.carrier {
            Carrier::NfcA => request.to_vec(),
            Carrier::NfcF => request
                .strip_suffix(&[TIME_SLOT])
                .unwrap_or(request)
                .to_vec(),
        };
        data.extend_from_slice(&RX_TRAILER[..3]);
        data
    }
}
