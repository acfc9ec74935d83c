use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Confidence, Market};

/// One scheduled or played match as delivered by the fixture feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u64,
    pub league: League,
    pub teams: Teams,
    /// Kickoff (UTC)
    pub date: DateTime<Utc>,
    pub status: Status,
    #[serde(default)]
    pub score: ScoreBreakdown,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    pub home: TeamRef,
    pub away: TeamRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub short: FixtureStatus,
}

/// Upstream short status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureStatus {
    #[serde(rename = "NS")]
    NotStarted,
    #[serde(rename = "1H")]
    FirstHalf,
    #[serde(rename = "HT")]
    HalfTime,
    #[serde(rename = "2H")]
    SecondHalf,
    #[serde(rename = "ET")]
    ExtraTime,
    #[serde(rename = "BT")]
    BreakTime,
    #[serde(rename = "P")]
    PenaltiesInProgress,
    #[serde(rename = "FT")]
    FullTime,
    #[serde(rename = "AET")]
    AfterExtraTime,
    #[serde(rename = "PEN")]
    AfterPenalties,
    /// Postponed, cancelled, abandoned and anything else we don't act on
    #[serde(other)]
    Unknown,
}

impl FixtureStatus {
    pub fn code(self) -> &'static str {
        match self {
            FixtureStatus::NotStarted => "NS",
            FixtureStatus::FirstHalf => "1H",
            FixtureStatus::HalfTime => "HT",
            FixtureStatus::SecondHalf => "2H",
            FixtureStatus::ExtraTime => "ET",
            FixtureStatus::BreakTime => "BT",
            FixtureStatus::PenaltiesInProgress => "P",
            FixtureStatus::FullTime => "FT",
            FixtureStatus::AfterExtraTime => "AET",
            FixtureStatus::AfterPenalties => "PEN",
            FixtureStatus::Unknown => "UNK",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "NS" => FixtureStatus::NotStarted,
            "1H" => FixtureStatus::FirstHalf,
            "HT" => FixtureStatus::HalfTime,
            "2H" => FixtureStatus::SecondHalf,
            "ET" => FixtureStatus::ExtraTime,
            "BT" => FixtureStatus::BreakTime,
            "P" => FixtureStatus::PenaltiesInProgress,
            "FT" => FixtureStatus::FullTime,
            "AET" => FixtureStatus::AfterExtraTime,
            "PEN" => FixtureStatus::AfterPenalties,
            _ => FixtureStatus::Unknown,
        }
    }

    /// `FT`, `AET` and `PEN` are the only states a result can be graded in.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            FixtureStatus::FullTime | FixtureStatus::AfterExtraTime | FixtureStatus::AfterPenalties
        )
    }
}

/// Score for one period. The feed sends `{"home": null, "away": null}` for
/// periods that weren't played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLine {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl ScoreLine {
    /// Both sides, if the period was played.
    pub fn pair(&self) -> Option<(u32, u32)> {
        Some((self.home?, self.away?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub halftime: Option<ScoreLine>,
    #[serde(default)]
    pub fulltime: Option<ScoreLine>,
    #[serde(default)]
    pub extratime: Option<ScoreLine>,
    #[serde(default)]
    pub penalty: Option<ScoreLine>,
}

/// Running goal count (includes extra time, excludes shoot-out penalties).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl Fixture {
    pub fn home_team(&self) -> &str {
        &self.teams.home.name
    }

    pub fn away_team(&self) -> &str {
        &self.teams.away.name
    }

    pub fn status(&self) -> FixtureStatus {
        self.status.short
    }

    pub fn kickoff_date(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// Goals used to settle markets: the running goal count, falling back to
    /// the full-time score when the feed omits it.
    pub fn final_goals(&self) -> Option<(u32, u32)> {
        match (self.goals.home, self.goals.away) {
            (Some(h), Some(a)) => Some((h, a)),
            _ => self.score.fulltime.and_then(|s| s.pair()),
        }
    }
}

/// The model's pre-match opinion about one fixture, written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSnapshot {
    pub fixture_id: u64,
    /// Capture date
    pub date: NaiveDate,
    pub home: String,
    pub away: String,
    pub confidence: Confidence,
    /// Market → probability percentage (0–100)
    pub markets: BTreeMap<Market, u8>,
    /// Market → settled outcome, filled once by the evaluator
    pub result: Option<BTreeMap<Market, bool>>,
    pub evaluated: bool,
}

/// One bookmaker's prices for a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub date: NaiveDate,
    pub bookmaker: String,
    /// Fixture id → market label → decimal odds
    pub fixtures: BTreeMap<u64, BTreeMap<String, f64>>,
}

/// A market where the model probability beats the bookmaker price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePick {
    pub fixture_id: u64,
    pub market: Market,
    /// Model probability (0.0–1.0)
    pub probability: f64,
    /// Decimal odds
    pub odds: f64,
    /// probability × odds − 1, rounded to 2 dp
    pub edge: f64,
}

/// Hit-rate record for one market across evaluated snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub market: Market,
    pub evaluated: u32,
    pub hits: u32,
    pub hit_rate: f64,
}
