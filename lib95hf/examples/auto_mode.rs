// Auto mode over the simulated transceiver: the reader role finds nothing,
// so the manager falls through to card emulation where a scripted reader
// selects the NDEF application of the type 4A tag.

use lib95hf::config::Timings;
use lib95hf::prelude::*;
use lib95hf::test_support::SimChip;
use lib95hf::timer::MockClock;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let chip = SimChip::new();
    let transport = chip.transport(SerialInterface::Spi);
    let device = Device::new_with_transport(Box::new(transport.clone()))
        .with_clock(Box::new(MockClock::new().with_tick_ms(1)));
    let mut manager = Manager::hw_init(device)?.with_timings(Timings {
        emulation_window_ms: 200,
        ..Timings::default()
    });

    transport.push_pending(parse_hex(
        "80 11 02 00 a4 04 00 07 d2 76 00 00 85 01 01 00 ab cd 08",
    )?);

    let config = ManagerConfig::builder()
        .pcd(TrackMask::NFC_TYPE2 | TrackMask::NFC_TYPE4A)
        .picc(TrackMask::NFC_TYPE4A)
        .build();
    match manager.auto_mode(&config) {
        ModeOutcome::ReaderFound(tag_type) => println!("reader found while emulating {}", tag_type),
        other => println!("auto mode ended with {:?}", other),
    }
    Ok(())
}
