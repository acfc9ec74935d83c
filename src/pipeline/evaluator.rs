use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::db::models::Fixture;
use crate::db::SnapshotStore;
use crate::error::Result;
use crate::model::outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Ground truth was recorded.
    Evaluated,
    /// No snapshot was ever stored for this fixture.
    NoSnapshot,
    /// The snapshot was already graded; nothing changed.
    AlreadyEvaluated,
    /// The fixture hasn't reached FT / AET / PEN.
    NotFinished,
    /// Finished, but the feed carried no final score.
    MissingScore,
}

/// Grade the stored snapshot for `fixture` against its final score.
///
/// At most once per fixture: the stored `evaluated` flag short-circuits
/// repeat calls, and the store's guarded update absorbs a racing grader.
/// Stored probabilities are never modified.
pub fn evaluate_prediction(
    store: &dyn SnapshotStore,
    fixture: &Fixture,
) -> Result<EvaluationOutcome> {
    let Some(snap) = store.get_prediction(fixture.id)? else {
        return Ok(EvaluationOutcome::NoSnapshot);
    };
    if snap.evaluated {
        return Ok(EvaluationOutcome::AlreadyEvaluated);
    }
    if !fixture.status().is_finished() {
        return Ok(EvaluationOutcome::NotFinished);
    }
    let Some((hg, ag)) = fixture.final_goals() else {
        debug!("Fixture {} finished without a final score", fixture.id);
        return Ok(EvaluationOutcome::MissingScore);
    };

    let truth = outcome::classify(hg, ag);
    let result: BTreeMap<_, _> = snap
        .markets
        .keys()
        .filter_map(|m| truth.get(m).map(|hit| (*m, *hit)))
        .collect();

    if store.record_evaluation(fixture.id, &result)? {
        let hits = result.values().filter(|h| **h).count();
        info!(
            "Evaluated fixture {} ({} v {} {}-{}): {}/{} markets won",
            fixture.id,
            snap.home,
            snap.away,
            hg,
            ag,
            hits,
            result.len()
        );
        Ok(EvaluationOutcome::Evaluated)
    } else {
        Ok(EvaluationOutcome::AlreadyEvaluated)
    }
}
