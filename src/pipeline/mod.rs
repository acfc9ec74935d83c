pub mod evaluator;
pub mod snapshot;
pub mod value;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::models::{Fixture, FixtureStatus, ValuePick};
use crate::db::{Database, SnapshotStore};
use crate::error;
use crate::feed::odds::{build_odds_snapshot, FixtureOdds};
use crate::feed::{FixtureFeed, OddsFeed};
use crate::model::{
    poisson, ratings, Confidence, GateConfig, MarketBook, ModelConfig, ModelOutput, RatingConfig,
    TeamForm,
};

pub use evaluator::{evaluate_prediction, EvaluationOutcome};
pub use snapshot::{save_prediction, SaveOutcome};
pub use value::{build_value_picks, ValueConfig};

/// Tunables for the whole pipeline, built once from `Config`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: ModelConfig,
    pub gate: GateConfig,
    pub ratings: RatingConfig,
    pub value: ValueConfig,
    /// Markets below this percentage are left out of snapshots.
    pub strong_pct: u8,
    /// How many recent finished matches feed a team's form.
    pub form_window: u32,
    pub bookmaker: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            gate: GateConfig::default(),
            ratings: RatingConfig::default(),
            value: ValueConfig::default(),
            strong_pct: 70,
            form_window: 38,
            bookmaker: "Bet365".into(),
        }
    }
}

/// Counters for one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub processed: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Ties the feeds, the model and the store together.
///
/// Fixture history and team form come from `db`. Snapshot, evaluation and
/// odds writes go through `store`, which is the same database unless
/// replaced.
pub struct Pipeline {
    db: Database,
    store: Arc<dyn SnapshotStore>,
    fixtures: Arc<dyn FixtureFeed>,
    odds: Arc<dyn OddsFeed>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        db: Database,
        fixtures: Arc<dyn FixtureFeed>,
        odds: Arc<dyn OddsFeed>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store: Arc::new(db.clone()),
            db,
            fixtures,
            odds,
            settings,
        }
    }

    #[cfg(test)]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    // ── Model ─────────────────────────────────────────────────────────────────

    fn team_forms(&self, fixture: &Fixture) -> error::Result<(TeamForm, TeamForm)> {
        let window = self.settings.form_window;
        let home = self.db.team_form(fixture.home_team(), fixture.date, window)?;
        let away = self.db.team_form(fixture.away_team(), fixture.date, window)?;
        Ok((home, away))
    }

    /// Confidence tier only; no markets are priced.
    pub fn tier(&self, fixture: &Fixture) -> error::Result<Confidence> {
        let (home, away) = self.team_forms(fixture)?;
        Ok(self.settings.gate.classify(home.matches, away.matches))
    }

    /// Tier and market book for a fixture, from both teams' stored form
    /// before kickoff. Tiers that don't publish get an empty book.
    pub fn assess(&self, fixture: &Fixture) -> error::Result<ModelOutput> {
        let s = &self.settings;
        let (home, away) = self.team_forms(fixture)?;

        let confidence = s.gate.classify(home.matches, away.matches);
        let markets = if confidence.publishes_probabilities() {
            let (lambda_home, lambda_away) = ratings::expected_goals(&home, &away, &s.ratings);
            debug!(
                "Fixture {}: λ {:.2} / {:.2} ({} v {} samples)",
                fixture.id, lambda_home, lambda_away, home.matches, away.matches
            );
            poisson::predict(lambda_home, lambda_away, &s.model)?
        } else {
            MarketBook::new()
        };

        Ok(ModelOutput {
            confidence,
            markets,
        })
    }

    pub fn value_picks(&self, date: NaiveDate) -> error::Result<Vec<ValuePick>> {
        build_value_picks(self.store(), date, &self.settings.value)
    }

    // ── Batch steps ───────────────────────────────────────────────────────────

    /// Store the fixtures, then snapshot every one that hasn't kicked off.
    pub fn snapshot_fixtures(&self, fixtures: &[Fixture], capture_date: NaiveDate) -> JobReport {
        let mut report = JobReport::default();

        for fixture in fixtures {
            if let Err(e) = self.db.upsert_fixture(fixture) {
                warn!("Failed to store fixture {}: {}", fixture.id, e);
                report.failed += 1;
                continue;
            }
            if fixture.status() != FixtureStatus::NotStarted {
                continue;
            }

            report.processed += 1;
            let outcome = self.assess(fixture).and_then(|output| {
                save_prediction(
                    self.store(),
                    fixture,
                    &output,
                    self.settings.strong_pct,
                    capture_date,
                )
            });
            match outcome {
                Ok(SaveOutcome::Saved) => {
                    info!(
                        "Snapshot saved for fixture {} ({} v {})",
                        fixture.id,
                        fixture.home_team(),
                        fixture.away_team()
                    );
                    report.written += 1;
                }
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    warn!("Snapshot failed for fixture {}: {}", fixture.id, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Store the fixtures, then grade every finished one.
    pub fn evaluate_fixtures(&self, fixtures: &[Fixture]) -> JobReport {
        let mut report = JobReport::default();

        for fixture in fixtures {
            if let Err(e) = self.db.upsert_fixture(fixture) {
                warn!("Failed to store fixture {}: {}", fixture.id, e);
                report.failed += 1;
                continue;
            }
            if !fixture.status().is_finished() {
                continue;
            }

            report.processed += 1;
            match evaluate_prediction(self.store(), fixture) {
                Ok(EvaluationOutcome::Evaluated) => report.written += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    warn!("Evaluation failed for fixture {}: {}", fixture.id, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Write the day's odds snapshot. Returns `false` if one already exists.
    pub fn store_odds(&self, date: NaiveDate, odds: &[FixtureOdds]) -> error::Result<bool> {
        let snap = build_odds_snapshot(date, &self.settings.bookmaker, odds);
        let written = self.store.insert_odds_snapshot(&snap)?;
        if written {
            info!(
                "Odds snapshot stored for {} ({} fixtures, {})",
                date,
                snap.fixtures.len(),
                snap.bookmaker
            );
        }
        Ok(written)
    }

    // ── Scheduled jobs ────────────────────────────────────────────────────────

    pub async fn run_snapshot_job(&self, date: NaiveDate) -> Result<JobReport> {
        let fixtures = self
            .fixtures
            .fetch_fixtures(date)
            .await
            .with_context(|| self.fetch_failed(date))?;

        let report = self.snapshot_fixtures(&fixtures, Utc::now().date_naive());
        info!("Snapshot job {}: {:?}", date, report);
        Ok(report)
    }

    /// Grades `date` and the day before, so late finishes aren't missed.
    pub async fn run_evaluation_job(&self, date: NaiveDate) -> Result<JobReport> {
        let mut fixtures = Vec::new();
        for day in [date.pred_opt(), Some(date)].into_iter().flatten() {
            let batch = self
                .fixtures
                .fetch_fixtures(day)
                .await
                .with_context(|| self.fetch_failed(day))?;
            fixtures.extend(batch);
        }

        let report = self.evaluate_fixtures(&fixtures);
        info!("Evaluation job {}: {:?}", date, report);
        Ok(report)
    }

    pub async fn run_odds_job(&self, date: NaiveDate) -> Result<bool> {
        if self.store.get_odds_snapshot(date)?.is_some() {
            debug!("Odds snapshot for {} already stored", date);
            return Ok(false);
        }

        let odds = self
            .odds
            .fetch_odds(date)
            .await
            .with_context(|| format!("{}: odds fetch for {} failed", self.odds.name(), date))?;
        Ok(self.store_odds(date, &odds)?)
    }

    fn fetch_failed(&self, date: NaiveDate) -> String {
        format!("{}: fixture fetch for {} failed", self.fixtures.name(), date)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;

    use crate::db::models::*;
    use crate::db::{Database, SnapshotStore};
    use crate::error::{PredictError, Result};
    use crate::model::Market;

    /// Inter v Roma on 2025-03-09 18:00 UTC.
    pub fn fixture(id: u64, status: &str, goals: Option<(u32, u32)>) -> Fixture {
        Fixture {
            id,
            league: League {
                name: "Serie A".into(),
                country: Some("Italy".into()),
            },
            teams: Teams {
                home: TeamRef {
                    name: "Inter".into(),
                },
                away: TeamRef {
                    name: "Roma".into(),
                },
            },
            date: Utc.with_ymd_and_hms(2025, 3, 9, 18, 0, 0).unwrap(),
            status: Status {
                short: FixtureStatus::from_code(status),
            },
            score: ScoreBreakdown::default(),
            goals: Goals {
                home: goals.map(|g| g.0),
                away: goals.map(|g| g.1),
            },
        }
    }

    /// Ten earlier results each: Inter win 2–0, Roma lose 0–2.
    pub fn seeded_db(history_games: i64) -> Database {
        let db = Database::open_in_memory().unwrap();
        let kickoff = Utc.with_ymd_and_hms(2025, 3, 9, 18, 0, 0).unwrap();
        for i in 0..history_games {
            let mut home = fixture(1000 + i as u64, "FT", Some((2, 0)));
            home.teams.away = TeamRef {
                name: format!("Opp{i}"),
            };
            home.date = kickoff - Duration::days(7 * (i + 1));
            db.upsert_fixture(&home).unwrap();

            let mut away = fixture(2000 + i as u64, "FT", Some((2, 0)));
            away.teams.home = TeamRef {
                name: format!("Opp{i}"),
            };
            away.date = kickoff - Duration::days(7 * (i + 1)) + Duration::hours(2);
            db.upsert_fixture(&away).unwrap();
        }
        db
    }

    /// A store whose every call fails.
    pub struct FailingStore;

    fn down<T>() -> Result<T> {
        Err(PredictError::StoreUnavailable("store offline".into()))
    }

    impl SnapshotStore for FailingStore {
        fn get_prediction(&self, _: u64) -> Result<Option<PredictionSnapshot>> {
            down()
        }

        fn insert_prediction(&self, _: &PredictionSnapshot) -> Result<bool> {
            down()
        }

        fn record_evaluation(&self, _: u64, _: &BTreeMap<Market, bool>) -> Result<bool> {
            down()
        }

        fn get_odds_snapshot(&self, _: NaiveDate) -> Result<Option<OddsSnapshot>> {
            down()
        }

        fn insert_odds_snapshot(&self, _: &OddsSnapshot) -> Result<bool> {
            down()
        }
    }
}
