use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A betting proposition over a match outcome.
///
/// Variant order is the canonical display/iteration order; every
/// `BTreeMap<Market, _>` in the crate walks markets in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "1")]
    HomeWin,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    AwayWin,
    #[serde(rename = "1X")]
    HomeOrDraw,
    #[serde(rename = "X2")]
    DrawOrAway,
    #[serde(rename = "12")]
    HomeOrAway,
    #[serde(rename = "Over 1.5")]
    Over15,
    #[serde(rename = "Under 1.5")]
    Under15,
    #[serde(rename = "Over 2.5")]
    Over25,
    #[serde(rename = "Under 2.5")]
    Under25,
    #[serde(rename = "Goal")]
    BothTeamsScore,
    #[serde(rename = "No Goal")]
    NotBothTeamsScore,
}

impl Market {
    pub const ALL: [Market; 12] = [
        Market::HomeWin,
        Market::Draw,
        Market::AwayWin,
        Market::HomeOrDraw,
        Market::DrawOrAway,
        Market::HomeOrAway,
        Market::Over15,
        Market::Under15,
        Market::Over25,
        Market::Under25,
        Market::BothTeamsScore,
        Market::NotBothTeamsScore,
    ];

    /// Label used in snapshots, odds maps and the HTTP API.
    pub fn label(self) -> &'static str {
        match self {
            Market::HomeWin => "1",
            Market::Draw => "X",
            Market::AwayWin => "2",
            Market::HomeOrDraw => "1X",
            Market::DrawOrAway => "X2",
            Market::HomeOrAway => "12",
            Market::Over15 => "Over 1.5",
            Market::Under15 => "Under 1.5",
            Market::Over25 => "Over 2.5",
            Market::Under25 => "Under 2.5",
            Market::BothTeamsScore => "Goal",
            Market::NotBothTeamsScore => "No Goal",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown market label '{0}'")]
pub struct UnknownMarket(pub String);

impl FromStr for Market {
    type Err = UnknownMarket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Market::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMarket(s.to_string()))
    }
}

/// Integer percentage (0–100) for every market the model prices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketBook {
    probs: BTreeMap<Market, u8>,
}

impl MarketBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, market: Market, pct: u8) {
        self.probs.insert(market, pct.min(100));
    }

    /// The subset of markets at or above `strong_pct`, in canonical order.
    pub fn strong_markets(&self, strong_pct: u8) -> BTreeMap<Market, u8> {
        self.probs
            .iter()
            .filter(|(_, p)| **p >= strong_pct)
            .map(|(m, p)| (*m, *p))
            .collect()
    }

}

#[cfg(test)]
impl MarketBook {
    pub fn get(&self, market: Market) -> Option<u8> {
        self.probs.get(&market).copied()
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}
