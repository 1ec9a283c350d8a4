// lib95hf/src/device/handle.rs

use std::marker::PhantomData;

use log::{debug, trace, warn};

use crate::config::DeviceConfig;
use crate::constants::*;
use crate::protocol::commands::IDLE_PARAMS_LEN;
use crate::protocol::{check_reply, Command, CommandKind, Reply};
use crate::timer::{Clock, StdClock};
use crate::transport::Transport;
use crate::types::{Protocol, SerialInterface};
use crate::utils::bytes_to_hex_spaced;
use crate::{Error, Result};

/// Type-state markers
pub struct Uninitialized;
pub struct Initialized;

/// Identity string and ROM CRC reported by IDN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipIdentity {
    pub name: String,
    pub rom_crc: u16,
}

/// Transceiver handle that enforces initialization state at compile time.
///
/// It owns the serial link, so only one command/response exchange can ever
/// be outstanding.
pub struct Device<State = Uninitialized> {
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    config: DeviceConfig,
    _state: PhantomData<State>,
}

/// UART baud rate selected by a BAUD_RATE parameter byte
pub fn uart_baud_rate(param: u8) -> u32 {
    (13_560_000f64 / (2.0 * param as f64 + 2.0)) as u32
}

impl Device<Uninitialized> {
    /// Create a Device from an existing Transport instance. The serial
    /// interface is taken from the transport.
    pub fn new_with_transport(transport: Box<dyn Transport>) -> Self {
        let config = DeviceConfig {
            interface: transport.interface(),
            ..DeviceConfig::default()
        };
        Self {
            transport,
            clock: Box::new(StdClock::new()),
            config,
            _state: PhantomData,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the configuration. The interface always follows the
    /// transport.
    pub fn with_config(mut self, config: DeviceConfig) -> Self {
        self.config = DeviceConfig {
            interface: self.transport.interface(),
            ..config
        };
        self
    }

    /// Hardware init: POR sequence, then IDN. Returns an initialized Device
    /// once the chip answers echo.
    pub fn initialize(self) -> Result<Device<Initialized>> {
        let mut this = self;
        this.por_sequence()?;

        let mut dev = Device {
            transport: this.transport,
            clock: this.clock,
            config: this.config,
            _state: PhantomData,
        };

        match dev.idn() {
            Ok(id) => debug!("transceiver {} (rom crc {:#06x})", id.name, id.rom_crc),
            Err(e) => warn!("IDN failed after POR: {}", e),
        }
        Ok(dev)
    }
}

impl<State> Device<State> {
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn interface(&self) -> SerialInterface {
        self.config.interface
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    pub fn delay_ms(&self, ms: u64) {
        self.clock.delay_ms(ms);
    }

    pub fn delay_us(&self, us: u64) {
        self.clock.delay_us(us);
    }

    /// Send one command and decode the reply. A transport timeout is
    /// reported as the 0xFF "no reply" status so that reply interpretation
    /// stays uniform.
    pub fn exchange(&mut self, cmd: &Command) -> Result<Reply> {
        let frame = cmd.encode()?;
        trace!("-> {}", bytes_to_hex_spaced(&frame));
        let raw = match self.transport.send_receive(&frame) {
            Ok(raw) => raw,
            Err(Error::Timeout) => {
                trace!("<- (no reply)");
                return Ok(Reply::no_reply());
            }
            Err(e) => return Err(e),
        };
        trace!("<- {}", bytes_to_hex_spaced(&raw));
        Reply::decode(&raw)
    }

    /// Exchange and classify the reply; errors on any non-success status.
    pub fn command(&mut self, cmd: &Command) -> Result<Reply> {
        let reply = self.exchange(cmd)?;
        check_reply(cmd.kind(), &reply)?;
        Ok(reply)
    }

    /// Liveness probe: true when the chip echoes 0x55.
    pub fn echo(&mut self) -> bool {
        match self.exchange(&Command::Echo) {
            Ok(reply) => check_reply(CommandKind::Echo, &reply).is_ok(),
            Err(_) => false,
        }
    }

    /// Power-on-reset recovery.
    ///
    /// The reset line is pulsed once up front. SPI pulses it again after
    /// every failed probe; UART instead spends up to `uart_probe_limit`
    /// extra echo probes (shared across attempts). Gives up after
    /// `por_attempts`.
    pub fn por_sequence(&mut self) -> Result<()> {
        let timings = self.config.timings;
        let spi = self.transport.interface() == SerialInterface::Spi;
        let mut uart_probes = 0usize;

        self.transport.pulse_reset()?;

        for attempt in 1..=timings.por_attempts {
            if self.echo() {
                debug!("POR: chip answered on attempt {}", attempt);
                return Ok(());
            }
            if spi {
                self.transport.pulse_reset()?;
            } else {
                while uart_probes < timings.uart_probe_limit {
                    uart_probes += 1;
                    if self.echo() {
                        debug!("POR: chip answered after {} UART probes", uart_probes);
                        return Ok(());
                    }
                }
            }
        }

        warn!(
            "POR failed after {} attempts on {}",
            timings.por_attempts, self.config.interface
        );
        Err(Error::PorFailed {
            attempts: timings.por_attempts,
        })
    }

    /// Echo, and run the POR sequence when the chip stays silent.
    pub fn ensure_alive(&mut self) -> Result<()> {
        if self.echo() {
            return Ok(());
        }
        warn!("chip did not echo, running POR");
        self.por_sequence()
    }
}

impl Device<Initialized> {
    pub fn idn(&mut self) -> Result<ChipIdentity> {
        let reply = self.command(&Command::Idn)?;
        let (name, crc) = if reply.len() >= 2 {
            reply.data.split_at(reply.len() - 2)
        } else {
            (&reply.data[..], &[][..])
        };
        let name = String::from_utf8_lossy(name)
            .trim_end_matches('\0')
            .to_string();
        let rom_crc = match crc {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            _ => 0,
        };
        Ok(ChipIdentity { name, rom_crc })
    }

    /// Select a reader-mode RF protocol. The chip is probed (and recovered)
    /// before the switch.
    pub fn select_protocol(&mut self, protocol: Protocol, params: &[u8]) -> Result<Reply> {
        self.select_protocol_raw(protocol.id(), params)
    }

    /// Like `select_protocol` with a raw identifier. Unknown identifiers are
    /// rejected before any I/O.
    pub fn select_protocol_raw(&mut self, protocol: u8, params: &[u8]) -> Result<Reply> {
        let protocol = Protocol::try_from(protocol)?;
        if params.len() + 1 > MAX_BUFFER_SIZE {
            return Err(Error::InvalidLength {
                expected: MAX_BUFFER_SIZE - 1,
                actual: params.len(),
            });
        }
        self.ensure_alive()?;
        debug!("protocol select {} {}", protocol, bytes_to_hex_spaced(params));
        self.command(&Command::ProtocolSelect {
            protocol: protocol.id(),
            params: params.to_vec(),
        })
    }

    pub fn field_off(&mut self) -> Result<()> {
        self.select_protocol(Protocol::FieldOff, &[0x00]).map(|_| ())
    }

    /// Turn the RF field on (selects ISO15693 with default parameters)
    pub fn field_on(&mut self) -> Result<()> {
        self.select_protocol(Protocol::Iso15693, &[0x00]).map(|_| ())
    }

    /// Transmit an RF frame and return the tag's answer.
    pub fn send_recv(&mut self, frame: &[u8]) -> Result<Reply> {
        self.command(&Command::SendReceive(frame.to_vec()))
    }

    /// Put the chip in its low-power state. IDLE gets no reply until the
    /// chip wakes up.
    pub fn idle(&mut self, params: &[u8]) -> Result<()> {
        let params: [u8; IDLE_PARAMS_LEN] =
            params.try_into().map_err(|_| Error::InvalidLength {
                expected: IDLE_PARAMS_LEN,
                actual: params.len(),
            })?;
        let frame = Command::Idle(params).encode()?;
        trace!("-> {}", bytes_to_hex_spaced(&frame));
        self.transport.send(&frame)
    }

    pub fn read_register(&mut self, address: u8, count: u8, flags: u8) -> Result<Reply> {
        self.command(&Command::ReadRegister {
            address,
            count,
            flags,
        })
    }

    pub fn write_register(&mut self, address: u8, flags: u8, data: &[u8]) -> Result<()> {
        self.command(&Command::WriteRegister {
            address,
            flags,
            data: data.to_vec(),
        })
        .map(|_| ())
    }

    /// Raw BAUD_RATE exchange. The pseudo reply is returned as is.
    pub fn baud_rate(&mut self, param: u8) -> Result<Reply> {
        self.exchange(&Command::BaudRate(param))
    }

    /// Change the UART speed on both sides and check the link with echo.
    pub fn change_uart_baud_rate(&mut self, param: u8) -> Result<u32> {
        if self.interface() != SerialInterface::Uart {
            return Err(Error::InvalidParameter(
                "baud rate can only be changed on a UART link".into(),
            ));
        }
        self.baud_rate(param)?;
        let baud = uart_baud_rate(param);
        self.transport.set_baud_rate(baud)?;

        let reply = self.exchange(&Command::Echo)?;
        if !reply.is_echo() {
            return Err(Error::UnexpectedResponse {
                expected: ECHO_RESPONSE,
                actual: reply.status,
            });
        }
        debug!("UART baud rate now {}", baud);
        Ok(baud)
    }

    /// True when an external RF field is detected.
    pub fn poll_field(&mut self) -> Result<bool> {
        let reply = self.command(&Command::PollField)?;
        Ok(reply.data.first().is_some_and(|flag| flag & 0x01 != 0))
    }

    /// Configure the chip as an ISO14443A card emulator.
    pub fn select_card_emulation(&mut self, parameter: u8) -> Result<Reply> {
        self.ensure_alive()?;
        debug!("card emulation select, parameter {:#04x}", parameter);
        self.command(&Command::ProtocolSelect {
            protocol: PROTOCOL_CARD_EMULATION_14443A,
            params: vec![parameter],
        })
    }

    /// Arm listen mode. The status is left for the caller: 0x00 when armed,
    /// 0x8F when no field is present.
    pub fn listen(&mut self) -> Result<Reply> {
        self.exchange(&Command::Listen)
    }

    /// Answer the external reader. `frame` includes the transmission flags
    /// byte.
    pub fn picc_send(&mut self, frame: &[u8]) -> Result<()> {
        self.command(&Command::Send(frame.to_vec())).map(|_| ())
    }

    pub fn data_ready(&mut self) -> bool {
        self.transport.data_ready()
    }

    /// Read the frame the chip holds after a data-ready event.
    pub fn poll_data(&mut self) -> Result<Reply> {
        let raw = self.transport.read_pending()?;
        trace!("<= {}", bytes_to_hex_spaced(&raw));
        Reply::decode(&raw)
    }

    /// Load the automatic anticollision filter (ATQA, SAK, UID).
    pub fn ac_filter(&mut self, sak: u8) -> Result<()> {
        let mut data = Vec::with_capacity(11);
        data.extend_from_slice(&EMULATED_ATQA);
        data.push(sak);
        data.extend_from_slice(&EMULATED_UID_A[..AC_FILTER_UID_LEN]);
        self.command(&Command::AcFilter(data)).map(|_| ())
    }

    pub fn ac_filter_disable(&mut self) -> Result<()> {
        self.command(&Command::AcFilter(vec![0x00])).map(|_| ())
    }

    pub fn set_backscatter_load(&mut self, load: u8) -> Result<()> {
        self.write_register(REG_ARC_B, 0x01, &[REG_INDEX_LOAD_MODULATION, load])
    }
}
