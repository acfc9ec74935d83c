use chrono::NaiveDate;
use tracing::debug;

use crate::db::models::{Fixture, PredictionSnapshot};
use crate::db::SnapshotStore;
use crate::error::Result;
use crate::model::ModelOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new snapshot was written.
    Saved,
    /// A snapshot already existed; nothing changed.
    AlreadyExists,
    /// The fixture's tier doesn't publish probabilities.
    Ineligible,
}

/// Persist the pre-match prediction for `fixture`, at most once.
///
/// Only markets at or above `strong_pct` are recorded. Store failures are
/// returned to the caller; retrying on the next scheduled run is safe because
/// an existing snapshot turns the call into a no-op.
pub fn save_prediction(
    store: &dyn SnapshotStore,
    fixture: &Fixture,
    output: &ModelOutput,
    strong_pct: u8,
    capture_date: NaiveDate,
) -> Result<SaveOutcome> {
    if !output.confidence.publishes_probabilities() {
        return Ok(SaveOutcome::Ineligible);
    }

    if store.get_prediction(fixture.id)?.is_some() {
        debug!("Snapshot for fixture {} already stored", fixture.id);
        return Ok(SaveOutcome::AlreadyExists);
    }

    let snap = PredictionSnapshot {
        fixture_id: fixture.id,
        date: capture_date,
        home: fixture.home_team().to_string(),
        away: fixture.away_team().to_string(),
        confidence: output.confidence,
        markets: output.markets.strong_markets(strong_pct),
        result: None,
        evaluated: false,
    };

    if store.insert_prediction(&snap)? {
        Ok(SaveOutcome::Saved)
    } else {
        // Another writer got there between our read and write.
        Ok(SaveOutcome::AlreadyExists)
    }
}
