// lib95hf/src/device/mod.rs

pub mod builder;
pub mod handle;

pub use builder::DeviceBuilder;
pub use handle::{uart_baud_rate, ChipIdentity, Device, Initialized, Uninitialized};
