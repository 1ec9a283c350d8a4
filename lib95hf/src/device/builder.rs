// lib95hf/src/device/builder.rs

use crate::config::DeviceConfig;
use crate::device::handle::{Device, Initialized, Uninitialized};
use crate::timer::Clock;
use crate::transport::Transport;
use crate::{Error, Result};

/// Helper to construct a Device with optional configuration.
#[derive(Default)]
pub struct DeviceBuilder {
    transport: Option<Box<dyn Transport>>,
    clock: Option<Box<dyn Clock>>,
    config: Option<DeviceConfig>,
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide an already-created transport instance (e.g. MockTransport)
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, config: DeviceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Consume the builder and return an uninitialized Device.
    /// Requires a transport to be provided.
    pub fn build_uninitialized(self) -> Result<Device<Uninitialized>> {
        let transport = self
            .transport
            .ok_or_else(|| Error::Transport("no transport configured".into()))?;
        let mut device = Device::new_with_transport(transport);
        if let Some(clock) = self.clock {
            device = device.with_clock(clock);
        }
        if let Some(config) = self.config {
            device = device.with_config(config);
        }
        Ok(device)
    }

    /// Build and run hardware init (POR + IDN).
    pub fn build(self) -> Result<Device<Initialized>> {
        self.build_uninitialized()?.initialize()
    }
}
