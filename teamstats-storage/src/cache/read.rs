//! Read strategies and read results.
//!
//! A caller picks one [`ReadStrategy`]; the orchestrator answers with a
//! [`ReadOutcome`] that carries the teams together with where they came from
//! and the diagnostic messages produced along the way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the team set is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadStrategy {
    /// Always read the source-of-record; never touch the cache.
    #[default]
    Direct,
    /// The whole ranked sorted set.
    RankedSet,
    /// The top of the ranked sorted set.
    #[serde(rename = "ranked-set-top-5")]
    RankedTop,
    /// Individually keyed entries gathered by key pattern.
    IndividuallyKeyed,
}

impl ReadStrategy {
    /// Every strategy, in selector order.
    pub const ALL: [ReadStrategy; 4] = [
        ReadStrategy::Direct,
        ReadStrategy::RankedSet,
        ReadStrategy::RankedTop,
        ReadStrategy::IndividuallyKeyed,
    ];

    /// Parse a selector value. Unknown values select [`ReadStrategy::Direct`].
    pub fn from_selector(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// Canonical selector name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::RankedSet => "ranked-set",
            Self::RankedTop => "ranked-set-top-5",
            Self::IndividuallyKeyed => "individually-keyed",
        }
    }

    /// Returns true when the strategy goes through the cache.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Self::Direct)
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector value that names no strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown read strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for ReadStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "direct" | "fromDB" => Ok(Self::Direct),
            "ranked-set" | "teamsSortedSet" => Ok(Self::RankedSet),
            "ranked-set-top-5" | "top5" | "teamsSortedSetTop5" => Ok(Self::RankedTop),
            "individually-keyed" | "teamsList" => Ok(Self::IndividuallyKeyed),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Where the records of a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadSource {
    /// Served from the cache.
    Cache,
    /// Loaded from the source-of-record (cache miss or direct read).
    SourceOfRecord,
}

/// Result of a read: records plus ordered diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadOutcome<T> {
    records: Vec<T>,
    source: ReadSource,
    diagnostics: Vec<String>,
}

impl<T> ReadOutcome<T> {
    /// A read served from the cache.
    pub fn from_cache(records: Vec<T>, diagnostics: Vec<String>) -> Self {
        Self {
            records,
            source: ReadSource::Cache,
            diagnostics,
        }
    }

    /// A read served by the source-of-record.
    pub fn from_source(records: Vec<T>, diagnostics: Vec<String>) -> Self {
        Self {
            records,
            source: ReadSource::SourceOfRecord,
            diagnostics,
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Check if the records were served from the cache.
    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    /// Append a diagnostic message.
    pub fn push_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    /// Prepend messages produced before this read ran.
    pub fn prepend_diagnostics(&mut self, mut earlier: Vec<String>) {
        earlier.append(&mut self.diagnostics);
        self.diagnostics = earlier;
    }

    /// Split into records and diagnostics.
    pub fn into_parts(self) -> (Vec<T>, ReadSource, Vec<String>) {
        (self.records, self.source, self.diagnostics)
    }
}
