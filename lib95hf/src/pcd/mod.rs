// lib95hf/src/pcd/mod.rs

//! Reader-side (PCD) probes for each supported RF family.
//!
//! Each probe is a free function over an initialized [`Device`] and returns
//! the card data it learned, or the chip/protocol error that stopped it.
//!
//! [`Device`]: crate::device::Device

pub mod felica;
pub mod iso14443a;
pub mod iso14443b;
pub mod iso15693;

pub use felica::FelicaCard;
pub use iso14443a::Iso14443aCard;
pub use iso14443b::Iso14443bCard;
