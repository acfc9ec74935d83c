use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How trustworthy a fixture's prediction is, based on how much history
/// the two teams have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    /// Only high-confidence fixtures expose probabilities, get snapshots and
    /// are considered for value picks.
    pub fn publishes_probabilities(self) -> bool {
        self == Confidence::High
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown confidence tier '{0}'")]
pub struct UnknownConfidence(pub String);

impl FromStr for Confidence {
    type Err = UnknownConfidence;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            other => Err(UnknownConfidence(other.to_string())),
        }
    }
}

/// Sample-size cutoffs for the confidence tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Both teams need at least this many prior matches for `High`.
    pub high_min_matches: u32,
    /// Both teams need at least this many prior matches for `Medium`.
    pub medium_min_matches: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            high_min_matches: 10,
            medium_min_matches: 5,
        }
    }
}

impl GateConfig {
    /// Tier for a fixture given each team's count of usable prior matches.
    /// The weaker sample decides.
    pub fn classify(&self, home_samples: u32, away_samples: u32) -> Confidence {
        let n = home_samples.min(away_samples);
        if n >= self.high_min_matches {
            Confidence::High
        } else if n >= self.medium_min_matches {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}
