//! Purpose: Fork versions, the version boundary table, and slot-based version resolution.
//! Exports: `ForkVersion`, `ForkBoundary`, `ForkSchedule`, `SlotField`.
//! Role: Decides which schema variant a payload uses from its slot number.
//! Invariants: Boundaries are inclusive-exclusive: `epoch == altair` resolves to altair.
//! Invariants: Resolution only peeks at the body; callers keep the original bytes.
//! Invariants: Schedules are immutable after construction and safe to share across threads.

use serde::Deserialize;
use std::fmt;

use crate::core::config::ChainConfig;
use crate::core::error::{Error, ErrorKind};
use crate::json::parse;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ForkVersion {
    Phase0,
    Altair,
    Bellatrix,
}

impl ForkVersion {
    pub const ALL: [ForkVersion; 3] = [
        ForkVersion::Phase0,
        ForkVersion::Altair,
        ForkVersion::Bellatrix,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ForkVersion::Phase0 => "phase0",
            ForkVersion::Altair => "altair",
            ForkVersion::Bellatrix => "bellatrix",
        }
    }

    /// Case-insensitive match against the known version names.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|version| version.name().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for ForkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ForkBoundary {
    pub epoch: u64,
    pub version: ForkVersion,
}

/// Where the slot lives inside a payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotField {
    /// `{"message": {"slot": "..."}}`, used by signed blocks.
    Message,
    /// `{"slot": "..."}`.
    TopLevel,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForkSchedule {
    slots_per_epoch: u64,
    boundaries: Vec<ForkBoundary>,
}

#[derive(Deserialize)]
struct MessageSlotProbe {
    message: SlotProbe,
}

#[derive(Deserialize)]
struct SlotProbe {
    slot: String,
}

impl ForkSchedule {
    pub fn new(config: &ChainConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            slots_per_epoch: config.slots_per_epoch,
            boundaries: vec![
                ForkBoundary {
                    epoch: 0,
                    version: ForkVersion::Phase0,
                },
                ForkBoundary {
                    epoch: config.altair_fork_epoch,
                    version: ForkVersion::Altair,
                },
                ForkBoundary {
                    epoch: config.bellatrix_fork_epoch,
                    version: ForkVersion::Bellatrix,
                },
            ],
        })
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
    }

    pub fn boundaries(&self) -> &[ForkBoundary] {
        &self.boundaries
    }

    pub fn epoch_at_slot(&self, slot: u64) -> u64 {
        slot / self.slots_per_epoch
    }

    pub fn fork_at_epoch(&self, epoch: u64) -> ForkVersion {
        // Table starts at epoch 0, so some boundary always matches; the latest one wins.
        self.boundaries
            .iter()
            .rev()
            .find(|boundary| epoch >= boundary.epoch)
            .map(|boundary| boundary.version)
            .unwrap_or(ForkVersion::Phase0)
    }

    pub fn fork_at_slot(&self, slot: u64) -> ForkVersion {
        self.fork_at_epoch(self.epoch_at_slot(slot))
    }

    /// Reads the slot out of `body` and maps it to a fork version.
    pub fn resolve(&self, body: &[u8], field: SlotField) -> Result<ForkVersion, Error> {
        let slot = read_slot(body, field)?;
        Ok(self.fork_at_slot(slot))
    }
}

pub fn read_slot(body: &[u8], field: SlotField) -> Result<u64, Error> {
    let slot = match field {
        SlotField::Message => {
            parse::from_slice::<MessageSlotProbe>(body, "could not read slot from body")?
                .message
                .slot
        }
        SlotField::TopLevel => {
            parse::from_slice::<SlotProbe>(body, "could not read slot from body")?.slot
        }
    };
    parse_slot(&slot)
}

fn parse_slot(text: &str) -> Result<u64, Error> {
    // `u64::from_str` tolerates a leading '+'; the wire format does not.
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(Error::new(ErrorKind::Decode)
            .with_message("slot is not an unsigned integer")
            .with_hint(format!("got {text:?}")));
    }
    text.parse::<u64>().map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("slot is not an unsigned integer")
            .with_source(err)
    })
}
