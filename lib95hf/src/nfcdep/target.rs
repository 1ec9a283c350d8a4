// lib95hf/src/nfcdep/target.rs

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};

use super::*;
use crate::constants::{EMULATED_UID_A, PICC_PARAMETER_14443A_212, PICC_PARAMETER_14443A_424};
use crate::device::{Device, Initialized};
use crate::emulation::TagResponder;
use crate::protocol::Reply;
use crate::types::BitRate;
use crate::{Error, Result};

/// Application layer behind the target. Receives the transport data of each
/// DEP_REQ and returns the transport data for DEP_RES.
pub trait DepHandler {
    fn on_dep(&mut self, payload: &[u8]) -> Vec<u8>;
}

impl<F> DepHandler for F
where
    F: FnMut(&[u8]) -> Vec<u8>,
{
    fn on_dep(&mut self, payload: &[u8]) -> Vec<u8> {
        self(payload)
    }
}

/// Handler shared between the orchestrator and the target it configures
pub type SharedDepHandler = Arc<Mutex<dyn DepHandler + Send>>;

pub fn shared_handler<H>(handler: H) -> SharedDepHandler
where
    H: DepHandler + Send + 'static,
{
    Arc::new(Mutex::new(handler))
}

/// Handler that answers every DEP_REQ with empty transport data
pub fn no_payload_handler() -> SharedDepHandler {
    shared_handler(|_: &[u8]| -> Vec<u8> { Vec::new() })
}

/// Parameters this side announces in ATR_RES.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSession {
    pub carrier: Carrier,
    pub nfcid3t: [u8; NFCID3_LEN],
    /// Copied from the initiator's ATR_REQ
    pub did: u8,
    pub bst: u8,
    pub brt: u8,
    pub to: u8,
    pub ppt: u8,
    pub lrt: u8,
    pub pfb: u8,
    pub llcp: bool,
}

impl TargetSession {
    pub fn new(carrier: Carrier, llcp: bool) -> Self {
        let nfcid3t = match carrier {
            Carrier::NfcA => EMULATED_UID_A,
            Carrier::NfcF => NFCF_NFCID3I,
        };
        let ppt = 0x20;
        Self {
            carrier,
            nfcid3t,
            did: 0x00,
            bst: 0x00,
            brt: 0x00,
            to: 0x0E,
            ppt,
            lrt: length_reduction(ppt),
            pfb: 0x00,
            llcp,
        }
    }
}

/// What the initiator sent in ATR_REQ and the following requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerInitiator {
    pub nfcid3i: [u8; NFCID3_LEN],
    pub did: u8,
    pub bsi: u8,
    pub bri: u8,
    pub ppi: u8,
    pub lri: u8,
    pub brs: u8,
    pub fsl: u8,
    pub pfb: u8,
    pub nad: u8,
    pub general_bytes: Vec<u8>,
    pub llcp: bool,
}

/// NFC-DEP target answering requests received in card-emulation mode.
pub struct NfcDepTarget {
    session: TargetSession,
    initiator: PeerInitiator,
    handler: SharedDepHandler,
}

fn malformed(reason: &str) -> Error {
    Error::MalformedFrame(reason.to_string())
}

impl NfcDepTarget {
    pub fn init(carrier: Carrier, llcp: bool, handler: SharedDepHandler) -> Self {
        debug!("NFC-DEP target on {} (LLCP {})", carrier, llcp);
        Self {
            session: TargetSession::new(carrier, llcp),
            initiator: PeerInitiator::default(),
            handler,
        }
    }

    pub fn session(&self) -> &TargetSession {
        &self.session
    }

    pub fn initiator(&self) -> &PeerInitiator {
        &self.initiator
    }

    /// True once both sides announced LLCP in ATR
    pub fn llcp_active(&self) -> bool {
        self.session.llcp && self.initiator.llcp
    }

    /// Answer one request received from the chip. `data` is the received
    /// frame as delivered by the chip, trailer included.
    ///
    /// Requests that do not start with `D4`, or carry an unknown command,
    /// yield [`Error::CommandUnknown`]. Malformed requests are dropped
    /// without a response and report `Ok`.
    pub fn reply_command(&mut self, device: &mut Device<Initialized>, data: &[u8]) -> Result<()> {
        match self.dispatch(device, data) {
            Err(Error::MalformedFrame(reason)) => {
                warn!("NFC-DEP target: dropped request: {}", reason);
                Ok(())
            }
            other => other,
        }
    }

    fn dispatch(&mut self, device: &mut Device<Initialized>, data: &[u8]) -> Result<()> {
        let body = frame_body(self.session.carrier, data).map_err(|e| malformed(&e.to_string()))?;
        let (cmd, params) = match body {
            [CMD_REQ, cmd, params @ ..] => (*cmd, params),
            _ => return Err(Error::CommandUnknown),
        };
        match cmd {
            ATR_REQ => {
                let res = self.atr(params)?;
                self.send(device, &res)
            }
            PSL_REQ => {
                let (res, rate) = self.psl(params)?;
                self.send(device, &res)?;
                self.switch_rate(device, rate)
            }
            DEP_REQ => {
                let res = self.dep(params)?;
                self.send(device, &res)
            }
            DSL_REQ => self.send(device, &self.short_response(DSL_RES)),
            RLS_REQ => self.send(device, &self.short_response(RLS_RES)),
            _ => Err(Error::CommandUnknown),
        }
    }

    fn atr(&mut self, params: &[u8]) -> Result<Vec<u8>> {
        if params.len() < ATR_REQ_PARAMS_LEN {
            return Err(malformed("ATR_REQ too short"));
        }
        let mut peer = PeerInitiator::default();
        peer.nfcid3i.copy_from_slice(&params[..NFCID3_LEN]);
        peer.did = params[NFCID3_LEN];
        peer.bsi = params[NFCID3_LEN + 1];
        peer.bri = params[NFCID3_LEN + 2];
        peer.ppi = params[NFCID3_LEN + 3];
        peer.lri = length_reduction(peer.ppi);
        if peer.ppi & PP_GENERAL_BYTES != 0 {
            let gi = &params[ATR_REQ_PARAMS_LEN..];
            if gi.len() > MAX_GENERAL_BYTES {
                return Err(malformed("too many general bytes"));
            }
            peer.general_bytes = gi.to_vec();
            peer.llcp = is_llcp(gi);
        }

        let s = &mut self.session;
        s.did = peer.did;
        let mut res = Vec::with_capacity(2 + ATR_RES_PARAMS_LEN + LLCP_GENERAL_BYTES.len());
        res.extend_from_slice(&[CMD_RES, ATR_RES]);
        res.extend_from_slice(&s.nfcid3t);
        res.extend_from_slice(&[s.did, s.bst, s.brt, s.to]);
        if s.llcp && peer.llcp {
            res.push(s.ppt | PP_GENERAL_BYTES);
            res.extend_from_slice(&LLCP_GENERAL_BYTES);
        } else {
            res.push(s.ppt);
        }

        info!(
            "NFC-DEP target: ATR from initiator on {} (LLCP {})",
            s.carrier,
            s.llcp && peer.llcp
        );
        self.initiator = peer;
        Ok(res)
    }

    fn psl(&mut self, params: &[u8]) -> Result<(Vec<u8>, Option<BitRate>)> {
        let &[did, brs, fsl] = params else {
            return Err(malformed("PSL_REQ length"));
        };
        if did != self.initiator.did {
            return Err(malformed("PSL_REQ DID mismatch"));
        }
        if fsl > self.initiator.lri || fsl > self.session.lrt {
            return Err(malformed("PSL_REQ FSL exceeds negotiated LR"));
        }
        self.initiator.brs = brs;
        self.initiator.fsl = fsl;
        Ok((vec![CMD_RES, PSL_RES, self.session.did], BitRate::from_brs(brs)))
    }

    /// The chip only emulates NFC-A, so only that carrier changes speed.
    fn switch_rate(&mut self, device: &mut Device<Initialized>, rate: Option<BitRate>) -> Result<()> {
        if self.session.carrier != Carrier::NfcA {
            return Ok(());
        }
        let parameter = match rate {
            Some(BitRate::Kbps212) => PICC_PARAMETER_14443A_212,
            Some(BitRate::Kbps424) => PICC_PARAMETER_14443A_424,
            _ => return Ok(()),
        };
        device.select_card_emulation(parameter)?;
        debug!("NFC-DEP target: card emulation parameter {:#04x}", parameter);
        Ok(())
    }

    fn dep(&mut self, params: &[u8]) -> Result<Vec<u8>> {
        let (&pfb, mut rest) = params
            .split_first()
            .ok_or_else(|| malformed("empty DEP_REQ"))?;
        self.initiator.pfb = pfb;
        if pfb & PFB_DID != 0 {
            rest = rest.get(1..).ok_or_else(|| malformed("DEP_REQ missing DID"))?;
        }
        if pfb & PFB_NAD != 0 {
            let (&nad, tail) = rest
                .split_first()
                .ok_or_else(|| malformed("DEP_REQ missing NAD"))?;
            self.initiator.nad = nad;
            rest = tail;
        }

        let out = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_dep(rest);

        let mut res = Vec::with_capacity(5 + out.len());
        res.extend_from_slice(&[CMD_RES, DEP_RES, self.session.pfb]);
        if self.initiator.did != 0 {
            res.push(self.session.did);
        }
        if self.initiator.ppi & PP_NAD != 0 {
            res.push(0x00);
        }
        res.extend_from_slice(&out);
        Ok(res)
    }

    fn short_response(&self, code: u8) -> Vec<u8> {
        let mut res = vec![CMD_RES, code];
        if self.initiator.did != 0 {
            res.push(self.session.did);
        }
        res
    }

    fn send(&self, device: &mut Device<Initialized>, body: &[u8]) -> Result<()> {
        device.picc_send(&response_frame(self.session.carrier, body))
    }
}

impl TagResponder for NfcDepTarget {
    fn reply(&mut self, device: &mut Device<Initialized>, frame: &Reply) -> Result<()> {
        self.reply_command(device, &frame.data)
    }

    fn reset(&mut self) {
        self.initiator = PeerInitiator::default();
    }
}
