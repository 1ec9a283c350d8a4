// Walks the orchestrator through its three roles against the simulated
// transceiver shipped in `test_support`: tag hunting, card emulation with a
// scripted reader, and NFC-DEP as initiator.
//
// Run with `RUST_LOG=debug cargo run --example simulated_session`.

use lib95hf::manager::{FixedPhase, Manager, P2pPhase};
use lib95hf::prelude::*;
use lib95hf::test_support::{SimChip, SimTag};
use lib95hf::timer::MockClock;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let chip = SimChip::new()
        .with_tag(SimTag::Iso14443a {
            uid: vec![0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6],
            sak: 0x00,
        })
        .with_tag(SimTag::NfcDepF { llcp: true });
    let transport = chip.transport(SerialInterface::Spi);

    let device = Device::new_with_transport(Box::new(transport.clone()))
        .with_clock(Box::new(MockClock::new().with_tick_ms(1)));
    let mut manager =
        Manager::hw_init(device)?.with_strategy(FixedPhase(P2pPhase::NfcFInitiator));

    println!("=== Reader ===");
    let tag = manager.tag_hunting(TrackMask::ALL)?;
    println!("found {} with UID {}", tag.family, tag.uid.to_hex());

    println!("\n=== Card emulation ===");
    // a reader issuing READ page 4 as soon as the field is on
    transport.push_pending(parse_hex("80 05 30 04 ab cd 08")?);
    let read = manager.tag_emulation(EmulatedTagType::Type2, 100);
    println!("reader talked to the type 2 tag: {}", read);

    println!("\n=== Peer to peer ===");
    let mode = manager.p2p(P2pMode::INITIATOR_NFCF | P2pMode::INITIATOR_NFCA);
    println!("session established as {:?}", mode);

    Ok(())
}
