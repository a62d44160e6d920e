//! Links to the downstream actuator controller.
//!
//! Writes are blocking. A slow controller stalls the caller; a failed write is
//! returned to the caller as an error and there is no reconnection.

mod serial;

use anyhow::{Context, Result};
use std::io::Write;

use crate::command::Command;

pub use serial::{SerialConfig, SerialLink, DEFAULT_BAUD_RATE};

/// Sink for debounced commands.
pub trait ActuatorLink {
    /// Human-readable link description for logs.
    fn describe(&self) -> String;

    /// Writes one command.
    fn send(&mut self, command: Command) -> Result<()>;

    /// Flushes and releases the link. Further sends fail.
    fn close(&mut self) -> Result<()>;
}

/// Writes the wire protocol to any `Write` sink (stdout, a buffer, a file).
pub struct WriterLink<W: Write> {
    name: String,
    writer: Option<W>,
}

impl<W: Write> WriterLink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Some(writer),
        }
    }

    /// Returns the writer, closing the link.
    pub fn into_inner(mut self) -> Option<W> {
        self.writer.take()
    }
}

impl<W: Write> ActuatorLink for WriterLink<W> {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn send(&mut self, command: Command) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .with_context(|| format!("actuator link {} is closed", self.name))?;
        writer
            .write_all(&command.encode())
            .and_then(|_| writer.flush())
            .with_context(|| format!("write command {} to {}", command, self.name))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .with_context(|| format!("flush {} on close", self.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_link_emits_wire_bytes() -> Result<()> {
        let mut link = WriterLink::new("buffer", Vec::new());
        link.send(Command::Red)?;
        link.send(Command::Nothing)?;
        assert_eq!(link.into_inner().unwrap_or_default(), b"R\nN\n");
        Ok(())
    }

    #[test]
    fn closed_link_rejects_sends() -> Result<()> {
        let mut link = WriterLink::new("buffer", Vec::new());
        link.close()?;
        assert!(link.send(Command::Sand).is_err());
        link.close()?;
        Ok(())
    }
}
