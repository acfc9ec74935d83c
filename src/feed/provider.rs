use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::Fixture;

use super::odds::FixtureOdds;

/// Source of fixture records for a calendar date.
#[async_trait]
pub trait FixtureFeed: Send + Sync {
    /// Every fixture kicking off on `date`, in any status.
    async fn fetch_fixtures(&self, date: NaiveDate) -> Result<Vec<Fixture>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Source of pre-match bookmaker prices for a calendar date.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    async fn fetch_odds(&self, date: NaiveDate) -> Result<Vec<FixtureOdds>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
