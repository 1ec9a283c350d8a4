// lib95hf/src/nfcdep/initiator.rs

use log::{debug, info};

use super::*;
use crate::constants::EMULATED_UID_A;
use crate::device::{Device, Initialized};
use crate::pcd::{felica, iso14443a};
use crate::types::{BitRate, Protocol};
use crate::{Error, Result};

/// ISO14443A parameters after PSL to 212 and 424 kbit/s
const NFCA_212_PARAMS: [u8; 3] = [0x50, 0x01, 0xA0];
const NFCA_424_PARAMS: [u8; 3] = [0xA0, 0x01, 0xA0];
/// FeliCa parameters after PSL to 424 kbit/s
const NFCF_424_PARAMS: [u8; 4] = [0xA1, 0x13, 0x01, 0x0D];

/// Parameters this side sends in ATR_REQ and PSL_REQ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatorSession {
    pub carrier: Carrier,
    pub nfcid3i: [u8; NFCID3_LEN],
    pub did: u8,
    pub bsi: u8,
    pub bri: u8,
    pub ppi: u8,
    pub lri: u8,
    pub general_bytes: Vec<u8>,
    pub llcp: bool,
    pub brs: u8,
    pub fsl: u8,
    pub pfb: u8,
}

impl InitiatorSession {
    pub fn new(carrier: Carrier, llcp: bool) -> Self {
        let nfcid3i = match carrier {
            Carrier::NfcA => EMULATED_UID_A,
            Carrier::NfcF => NFCF_NFCID3I,
        };
        let (ppi, general_bytes) = if llcp {
            (0x20 | PP_GENERAL_BYTES, LLCP_GENERAL_BYTES.to_vec())
        } else {
            (0x20, Vec::new())
        };
        let brs = match carrier {
            Carrier::NfcA => BitRate::Kbps106.brs(),
            Carrier::NfcF => BitRate::Kbps424.brs(),
        };
        Self {
            carrier,
            nfcid3i,
            did: 0x00,
            bsi: 0x00,
            bri: 0x00,
            ppi,
            lri: DEFAULT_LR,
            general_bytes,
            llcp,
            brs,
            fsl: DEFAULT_FSL,
            pfb: 0x00,
        }
    }
}

/// What the target announced in ATR_RES.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTarget {
    pub nfcid3t: [u8; NFCID3_LEN],
    pub did: u8,
    pub bst: u8,
    pub brt: u8,
    pub to: u8,
    pub ppt: u8,
    pub general_bytes: Vec<u8>,
    pub llcp: bool,
    pub pfb: u8,
}

/// NFC-DEP initiator. Every exchange checks the response command code;
/// a mismatch, a short response or a failed RF exchange is reported as
/// [`Error::CommandUnknown`] and is not retried here.
#[derive(Debug, Clone)]
pub struct Initiator {
    session: InitiatorSession,
    target: RemoteTarget,
}

impl Initiator {
    /// Session setup without touching the chip.
    pub fn new(carrier: Carrier, llcp: bool) -> Self {
        Self {
            session: InitiatorSession::new(carrier, llcp),
            target: RemoteTarget::default(),
        }
    }

    /// Set up the session and configure the reader for the carrier.
    pub fn init(device: &mut Device<Initialized>, carrier: Carrier, llcp: bool) -> Self {
        let this = Self::new(carrier, llcp);
        match carrier {
            Carrier::NfcA => {
                if let Err(e) = iso14443a::init(device) {
                    debug!("NFC-DEP initiator: ISO14443A init failed: {}", e);
                }
            }
            Carrier::NfcF => felica::initialization(device),
        }
        this
    }

    pub fn session(&self) -> &InitiatorSession {
        &self.session
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// REQA, anticollision and ATR.
    pub fn is_present_nfca(&mut self, device: &mut Device<Initialized>) -> Result<()> {
        iso14443a::is_present(device)?;
        iso14443a::anticollision(device)?;
        self.atr(device)
    }

    /// REQC and ATR.
    pub fn is_present_nfcf(&mut self, device: &mut Device<Initialized>) -> Result<()> {
        felica::is_present(device)?;
        self.atr(device)
    }

    pub fn atr(&mut self, device: &mut Device<Initialized>) -> Result<()> {
        let s = &self.session;
        let mut body = Vec::with_capacity(2 + ATR_REQ_PARAMS_LEN + s.general_bytes.len());
        body.extend_from_slice(&[CMD_REQ, ATR_REQ]);
        body.extend_from_slice(&s.nfcid3i);
        body.extend_from_slice(&[s.did, s.bsi, s.bri, s.ppi]);
        body.extend_from_slice(&s.general_bytes);

        let params = self.transceive(device, &body, ATR_RES)?;
        if params.len() < ATR_RES_PARAMS_LEN {
            return Err(Error::CommandUnknown);
        }
        let mut target = RemoteTarget::default();
        target.nfcid3t.copy_from_slice(&params[..NFCID3_LEN]);
        target.did = params[NFCID3_LEN];
        target.bst = params[NFCID3_LEN + 1];
        target.brt = params[NFCID3_LEN + 2];
        target.to = params[NFCID3_LEN + 3];
        target.ppt = params[NFCID3_LEN + 4];
        if target.ppt & PP_GENERAL_BYTES != 0 {
            let gt = &params[ATR_RES_PARAMS_LEN..];
            if gt.len() > MAX_GENERAL_BYTES {
                return Err(Error::CommandUnknown);
            }
            target.general_bytes = gt.to_vec();
            target.llcp = is_llcp(gt);
        }
        info!(
            "NFC-DEP initiator: ATR on {} (LLCP {})",
            self.session.carrier, target.llcp
        );
        self.target = target;
        Ok(())
    }

    /// Negotiate a new bit rate, then switch the reader to it.
    pub fn psl(&mut self, device: &mut Device<Initialized>, rate: BitRate) -> Result<()> {
        self.session.brs = rate.brs();
        let s = &self.session;
        let body = [CMD_REQ, PSL_REQ, s.did, s.brs, s.fsl];
        let params = self.transceive(device, &body, PSL_RES)?;
        if params.first() != Some(&self.session.did) {
            return Err(Error::CommandUnknown);
        }

        let switch = match (self.session.carrier, rate) {
            (Carrier::NfcA, BitRate::Kbps212) => Some((Protocol::Iso14443A, &NFCA_212_PARAMS[..])),
            (Carrier::NfcA, BitRate::Kbps424) => Some((Protocol::Iso14443A, &NFCA_424_PARAMS[..])),
            (Carrier::NfcF, BitRate::Kbps424) => Some((Protocol::Felica, &NFCF_424_PARAMS[..])),
            _ => None,
        };
        if let Some((protocol, params)) = switch {
            device.select_protocol(protocol, params).map_err(|e| {
                debug!("NFC-DEP initiator: rate switch failed: {}", e);
                Error::CommandUnknown
            })?;
            debug!("NFC-DEP initiator: now at {}", rate);
        }
        Ok(())
    }

    /// Send one DEP_REQ and return the transport data of the response.
    pub fn dep(
        &mut self,
        device: &mut Device<Initialized>,
        pfb: u8,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        self.session.pfb = pfb;
        let mut body = Vec::with_capacity(3 + payload.len());
        body.extend_from_slice(&[CMD_REQ, DEP_REQ, pfb]);
        body.extend_from_slice(payload);
        let params = self.transceive(device, &body, DEP_RES)?;
        let (&target_pfb, data) = params.split_first().ok_or(Error::CommandUnknown)?;
        self.target.pfb = target_pfb;
        Ok(data.to_vec())
    }

    pub fn dsl(&mut self, device: &mut Device<Initialized>) -> Result<()> {
        self.transceive(device, &[CMD_REQ, DSL_REQ], DSL_RES).map(|_| ())
    }

    pub fn rls(&mut self, device: &mut Device<Initialized>) -> Result<()> {
        self.transceive(device, &[CMD_REQ, RLS_REQ], RLS_RES).map(|_| ())
    }

    /// Send a request body and return the response parameters after the
    /// `D5 xx` command bytes.
    fn transceive(
        &self,
        device: &mut Device<Initialized>,
        body: &[u8],
        expected: u8,
    ) -> Result<Vec<u8>> {
        let frame = request_frame(self.session.carrier, body);
        let reply = device.send_recv(&frame).map_err(|e| {
            debug!("NFC-DEP initiator: exchange failed: {}", e);
            Error::CommandUnknown
        })?;
        let res = frame_body(self.session.carrier, &reply.data)
            .map_err(|_| Error::CommandUnknown)?;
        match res {
            [CMD_RES, code, params @ ..] if *code == expected => Ok(params.to_vec()),
            _ => Err(Error::CommandUnknown),
        }
    }
}
