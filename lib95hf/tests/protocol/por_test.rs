use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lib95hf::constants::CMD_ECHO;
use lib95hf::device::DeviceBuilder;
use lib95hf::test_support::SimChip;
use lib95hf::timer::MockClock;
use lib95hf::transport::MockTransport;
use lib95hf::{Error, SerialInterface};

/// Chip that ignores the first `silent` echoes, then behaves normally.
fn waking_chip(interface: SerialInterface, silent: usize) -> MockTransport {
    let chip = SimChip::new();
    let echoes = Arc::new(AtomicUsize::new(0));
    MockTransport::scripted(
        interface,
        Box::new(move |cmd: &[u8]| {
            if cmd.first() == Some(&CMD_ECHO) && echoes.fetch_add(1, Ordering::SeqCst) < silent {
                return None;
            }
            chip.respond(cmd)
        }),
    )
}

fn build(mock: &MockTransport) -> lib95hf::Result<lib95hf::Device<lib95hf::Initialized>> {
    DeviceBuilder::new()
        .with_transport(Box::new(mock.clone()))
        .with_clock(Box::new(MockClock::new()))
        .build()
}

#[test]
fn spi_pulses_reset_between_attempts() {
    let mock = waking_chip(SerialInterface::Spi, 2);
    build(&mock).unwrap();
    // one up-front pulse plus one after each silent attempt
    assert_eq!(mock.reset_count(), 3);
    assert_eq!(mock.sent_with_code(CMD_ECHO).len(), 3);
}

#[test]
fn spi_gives_up_after_five_attempts() {
    let chip = SimChip::new();
    chip.set_silent(true);
    let mock = chip.transport(SerialInterface::Spi);
    let err = build(&mock).unwrap_err();
    assert!(matches!(err, Error::PorFailed { attempts: 5 }));
    assert_eq!(mock.sent_with_code(CMD_ECHO).len(), 5);
    assert_eq!(mock.reset_count(), 6);
}

#[test]
fn uart_probes_share_one_budget() {
    let chip = SimChip::new();
    chip.set_silent(true);
    let mock = chip.transport(SerialInterface::Uart);
    assert!(build(&mock).is_err());
    // 255 extra probes are spent during the first attempt, the remaining
    // attempts each send a single echo
    assert_eq!(mock.sent_with_code(CMD_ECHO).len(), 5 + 255);
    assert_eq!(mock.reset_count(), 1);
}

#[test]
fn uart_recovers_inside_the_probe_loop() {
    let mock = waking_chip(SerialInterface::Uart, 40);
    let mut dev = build(&mock).unwrap();
    assert_eq!(mock.sent_with_code(CMD_ECHO).len(), 41);
    assert_eq!(dev.idn().unwrap().name, "NFC FS2JAST4");
}
