// lib95hf/src/transport/mod.rs

pub mod mock;
pub mod traits;

pub use mock::{ChipScript, MockTransport};
pub use traits::Transport;
