//! Serial actuator link.

use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::time::Duration;

use super::ActuatorLink;
use crate::command::Command;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Configuration for a serial actuator link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (e.g., "/dev/ttyACM0" or "COM11").
    pub port: String,
    pub baud_rate: u32,
    /// Write timeout. `None` blocks until the controller drains the buffer.
    pub write_timeout: Option<Duration>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout: None,
        }
    }
}

/// Fire-and-forget serial link to the actuator controller.
pub struct SerialLink {
    config: SerialConfig,
    port: Option<Box<dyn serialport::SerialPort>>,
    commands_sent: u64,
}

impl SerialLink {
    pub fn open(config: SerialConfig) -> Result<Self> {
        if config.baud_rate == 0 {
            return Err(anyhow!("serial baud rate must be > 0"));
        }
        // serialport needs a finite timeout; a day is effectively blocking.
        let timeout = config
            .write_timeout
            .unwrap_or(Duration::from_secs(60 * 60 * 24));
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(timeout)
            .open()
            .with_context(|| format!("open serial port {}", config.port))?;
        log::info!(
            "SerialLink: opened {} at {} baud",
            config.port,
            config.baud_rate
        );
        Ok(Self {
            config,
            port: Some(port),
            commands_sent: 0,
        })
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }
}

impl ActuatorLink for SerialLink {
    fn describe(&self) -> String {
        format!("serial:{}@{}", self.config.port, self.config.baud_rate)
    }

    fn send(&mut self, command: Command) -> Result<()> {
        let port = self
            .port
            .as_mut()
            .with_context(|| format!("serial port {} is closed", self.config.port))?;
        port.write_all(&command.encode())
            .and_then(|_| port.flush())
            .with_context(|| format!("write command {} to {}", command, self.config.port))?;
        self.commands_sent += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            port.flush()
                .with_context(|| format!("flush serial port {}", self.config.port))?;
            log::info!(
                "SerialLink: closed {} after {} commands",
                self.config.port,
                self.commands_sent
            );
        }
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("SerialLink: close on drop failed: {}", err);
        }
    }
}
