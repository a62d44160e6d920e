//! Actuator commands and their wire encoding.
//!
//! One ASCII character followed by `\n` per command. The link is
//! fire-and-forget: no acknowledgment, retry or handshake.

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};

use crate::classify::Material;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Red,
    Yellow,
    Sand,
    /// First confirmed steel object of the run.
    Steel,
    /// Later steel-like objects, diverted as unknown.
    Unknown,
    /// No object present.
    Nothing,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Red,
        Command::Yellow,
        Command::Sand,
        Command::Steel,
        Command::Unknown,
        Command::Nothing,
    ];

    pub fn code(self) -> char {
        match self {
            Command::Red => 'R',
            Command::Yellow => 'Y',
            Command::Sand => 'S',
            Command::Steel => 'T',
            Command::Unknown => 'U',
            Command::Nothing => 'N',
        }
    }

    pub fn from_code(code: char) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.code() == code)
            .ok_or_else(|| anyhow!("unknown actuator command code '{}'", code))
    }

    /// Wire bytes: the code followed by a newline.
    pub fn encode(self) -> [u8; 2] {
        [self.code() as u8, b'\n']
    }
}

impl From<Material> for Command {
    fn from(material: Material) -> Self {
        match material {
            Material::Red => Command::Red,
            Material::Yellow => Command::Yellow,
            Material::Sand => Command::Sand,
            Material::SteelGray => Command::Steel,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_char(self.code())
    }
}
