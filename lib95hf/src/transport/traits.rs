// lib95hf/src/transport/traits.rs

use crate::types::SerialInterface;
use crate::Result;

/// Transport trait abstracts the serial link (SPI or UART) to the
/// transceiver away from protocol and state-machine logic.
///
/// Exactly one exchange is outstanding at a time: every method returns only
/// after the chip's answer (if any) has been consumed.
pub trait Transport {
    /// Send a command frame and read back the reply frame
    /// (`[status][len][data...]`).
    fn send_receive(&mut self, command: &[u8]) -> Result<Vec<u8>>;

    /// Send a command frame that produces no immediate reply (IDLE).
    fn send(&mut self, command: &[u8]) -> Result<()>;

    /// Read a frame the chip has pending (card-emulation inbound data or a
    /// field-cutoff notification).
    fn read_pending(&mut self) -> Result<Vec<u8>>;

    /// State of the chip's data-ready signal (interrupt flag or IRQ_OUT
    /// line level).
    fn data_ready(&mut self) -> bool;

    /// Which serial interface the link runs on.
    fn interface(&self) -> SerialInterface;

    /// Pulse the hardware reset line. Only meaningful on SPI; the default
    /// implementation does nothing.
    fn pulse_reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Reconfigure the host side of a UART link after a BAUD_RATE command.
    /// The default implementation does nothing.
    fn set_baud_rate(&mut self, _baud: u32) -> Result<()> {
        Ok(())
    }
}
