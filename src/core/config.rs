//! Purpose: Chain timing configuration consumed by the version resolver.
//! Exports: `ChainConfig`, `Network`, `ChainConfigOverrides`.
//! Role: Process-wide, read-only after startup; built from a preset, an optional
//! JSON file, and explicit overrides (in that order).
//! Invariants: `slots_per_epoch > 0` and `altair_fork_epoch < bellatrix_fork_epoch`.

use serde::Deserialize;
use std::path::Path;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChainConfig {
    pub slots_per_epoch: u64,
    pub altair_fork_epoch: u64,
    pub bellatrix_fork_epoch: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Network {
    #[default]
    Mainnet,
    Prater,
    Sepolia,
}

impl Network {
    pub fn name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Prater => "prater",
            Network::Sepolia => "sepolia",
        }
    }
}

/// Fields a config file or CLI flags may set; unset fields keep the preset value.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChainConfigOverrides {
    pub slots_per_epoch: Option<u64>,
    pub altair_fork_epoch: Option<u64>,
    pub bellatrix_fork_epoch: Option<u64>,
}

impl ChainConfig {
    pub fn preset(network: Network) -> Self {
        match network {
            Network::Mainnet => Self {
                slots_per_epoch: 32,
                altair_fork_epoch: 74_240,
                bellatrix_fork_epoch: 144_896,
            },
            Network::Prater => Self {
                slots_per_epoch: 32,
                altair_fork_epoch: 36_660,
                bellatrix_fork_epoch: 112_260,
            },
            Network::Sepolia => Self {
                slots_per_epoch: 32,
                altair_fork_epoch: 50,
                bellatrix_fork_epoch: 100,
            },
        }
    }

    pub fn mainnet() -> Self {
        Self::preset(Network::Mainnet)
    }

    pub fn apply(mut self, overrides: &ChainConfigOverrides) -> Self {
        if let Some(value) = overrides.slots_per_epoch {
            self.slots_per_epoch = value;
        }
        if let Some(value) = overrides.altair_fork_epoch {
            self.altair_fork_epoch = value;
        }
        if let Some(value) = overrides.bellatrix_fork_epoch {
            self.bellatrix_fork_epoch = value;
        }
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.slots_per_epoch == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("slots_per_epoch must be greater than zero")
                .with_hint("Use a positive value like 32."));
        }
        if self.altair_fork_epoch >= self.bellatrix_fork_epoch {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "fork epochs must be strictly increasing (altair {} >= bellatrix {})",
                    self.altair_fork_epoch, self.bellatrix_fork_epoch
                ))
                .with_hint("Set bellatrix_fork_epoch above altair_fork_epoch."));
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ChainConfigOverrides {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read config file {}", path.display()))
                .with_source(err)
        })?;
        serde_json::from_slice(&text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid config file {}", path.display()))
                .with_hint("Expected a JSON object with slots_per_epoch, altair_fork_epoch, bellatrix_fork_epoch.")
                .with_source(err)
        })
    }

    /// Layers `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: ChainConfigOverrides) -> Self {
        Self {
            slots_per_epoch: other.slots_per_epoch.or(self.slots_per_epoch),
            altair_fork_epoch: other.altair_fork_epoch.or(self.altair_fork_epoch),
            bellatrix_fork_epoch: other.bellatrix_fork_epoch.or(self.bellatrix_fork_epoch),
        }
    }
}
