//! Identity types for team records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable integer identifier of a team.
///
/// The id is assigned by the source-of-record and never changes afterwards.
/// It is the join key between every cache representation of a team and the
/// source-of-record row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(i64);

impl TeamId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TeamId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for TeamId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}
