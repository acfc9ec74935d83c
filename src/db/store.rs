use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::Market;

use super::models::{OddsSnapshot, PredictionSnapshot};

/// Persistence the prediction pipeline needs.
///
/// Write-once is enforced by the store itself: `insert_prediction` must be a
/// conditional insert and `record_evaluation` a conditional update, so that
/// two racing writers cannot both succeed on the same fixture.
pub trait SnapshotStore: Send + Sync {
    fn get_prediction(&self, fixture_id: u64) -> Result<Option<PredictionSnapshot>>;

    /// Insert unless a snapshot for the fixture already exists.
    /// Returns `true` when a row was written.
    fn insert_prediction(&self, snap: &PredictionSnapshot) -> Result<bool>;

    /// Store the settled outcomes and flip `evaluated`, unless already
    /// evaluated. Returns `true` when the row was updated.
    fn record_evaluation(&self, fixture_id: u64, result: &BTreeMap<Market, bool>) -> Result<bool>;

    fn get_odds_snapshot(&self, date: NaiveDate) -> Result<Option<OddsSnapshot>>;

    /// Insert unless the date already has a snapshot.
    fn insert_odds_snapshot(&self, snap: &OddsSnapshot) -> Result<bool>;
}
