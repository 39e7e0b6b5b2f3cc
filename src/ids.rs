use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Identifier issued by the bracket service for a match.
///
/// Stable across every reconciliation run and every rebuild of the local
/// store, which makes it the only key overrides may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchExternalId(u64);

impl MatchExternalId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for MatchExternalId {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<u64>()
            .with_context(|| format!("match external id {trimmed:?} is not numeric"))?;
        Ok(Self(value))
    }
}

impl fmt::Display for MatchExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row identifier assigned by the local store.
///
/// Reassigned whenever the store is rebuilt from save files, so it is only
/// meaningful inside a single database and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchRowId(i64);

impl MatchRowId {
    pub(crate) fn from_rowid(raw: i64) -> Self {
        Self(raw)
    }

    pub(crate) fn rowid(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MatchRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitorId(u64);

impl CompetitorId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for CompetitorId {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<u64>()
            .with_context(|| format!("competitor id {trimmed:?} is not numeric"))?;
        Ok(Self(value))
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based position of a player within one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerIndex(NonZeroU32);

impl PlayerIndex {
    /// Converts the 0-based index written by the save format. Index 0 is the
    /// first player, not a missing one.
    pub fn from_source_index(source_index: u32) -> Result<Self> {
        let one_based = source_index
            .checked_add(1)
            .ok_or_else(|| anyhow!("source index {source_index} overflows player index"))?;
        NonZeroU32::new(one_based)
            .map(Self)
            .ok_or_else(|| anyhow!("source index {source_index} produced a zero player index"))
    }

    pub fn from_stored(raw: i64) -> Result<Self> {
        let value = u32::try_from(raw).with_context(|| format!("player index {raw} out of range"))?;
        NonZeroU32::new(value)
            .map(Self)
            .ok_or_else(|| anyhow!("stored player index must be >= 1"))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
