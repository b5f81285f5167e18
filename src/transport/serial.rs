//! Serial transport implementation for the actuator bus

use crate::transport::traits::{TransportConnector, TransportStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use cuddlebot_shared::link;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

/// Serial line parameters
///
/// The controllers only speak 8N1 without flow control, so only the device
/// path and baud rate are configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. "/dev/ttyUSB0"
    pub port: String,
    /// Line speed in baud
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: link::DEFAULT_PORT.into(),
            baud_rate: link::DEFAULT_BAUD_RATE,
        }
    }
}

impl TransportStream for SerialStream {}

/// Serial connector for opening the actuator bus
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    /// Create a new serial connector
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait]
impl TransportConnector for SerialConnector {
    type Stream = SerialStream;

    async fn open(&self) -> Result<Self::Stream> {
        let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .with_context(|| format!("failed to open serial port {}", self.config.port))?;

        debug!("opened {} at {} baud", self.config.port, self.config.baud_rate);
        Ok(stream)
    }

    fn endpoint(&self) -> &str {
        &self.config.port
    }
}
