use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{PredictError, Result};
use crate::model::{Confidence, Market, TeamForm};

pub mod models;
pub mod store;
use models::*;
pub use store::SnapshotStore;

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// Private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PredictError::StoreUnavailable("connection mutex poisoned".into()))
    }

    // ── Fixtures ──────────────────────────────────────────────────────────────

    /// Insert a fixture or refresh its status/score in place.
    pub fn upsert_fixture(&self, fixture: &Fixture) -> Result<()> {
        let payload = serde_json::to_string(fixture)?;
        let (home_goals, away_goals) = match fixture.final_goals() {
            Some((h, a)) => (Some(h), Some(a)),
            None => (None, None),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO fixtures (
                id, kickoff, kickoff_date, league, home_team, away_team,
                status, home_goals, away_goals, payload, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
             ON CONFLICT(id) DO UPDATE SET
                kickoff=excluded.kickoff,
                kickoff_date=excluded.kickoff_date,
                status=excluded.status,
                home_goals=excluded.home_goals,
                away_goals=excluded.away_goals,
                payload=excluded.payload,
                updated_at=excluded.updated_at",
            params![
                fixture.id as i64,
                fixture.date,
                fixture.kickoff_date(),
                fixture.league.name,
                fixture.home_team(),
                fixture.away_team(),
                fixture.status().code(),
                home_goals,
                away_goals,
                payload,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Fixtures kicking off on `date` (UTC), earliest first.
    pub fn list_fixtures_on(&self, date: NaiveDate) -> Result<Vec<Fixture>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM fixtures WHERE kickoff_date = ?1 ORDER BY kickoff, id",
        )?;
        let payloads = stmt
            .query_map(params![date], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(PredictError::from))
            .collect()
    }

    /// Goals scored/conceded by `team` over its most recent `window` finished
    /// fixtures that kicked off before `before`.
    pub fn team_form(&self, team: &str, before: DateTime<Utc>, window: u32) -> Result<TeamForm> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT home_team, home_goals, away_goals FROM fixtures
             WHERE (home_team = ?1 OR away_team = ?1)
               AND status IN ('FT', 'AET', 'PEN')
               AND home_goals IS NOT NULL AND away_goals IS NOT NULL
               AND kickoff < ?2
             ORDER BY kickoff DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![team, before, window], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut form = TeamForm::default();
        for (home_team, hg, ag) in rows {
            if home_team == team {
                form.record(hg, ag);
            } else {
                form.record(ag, hg);
            }
        }
        Ok(form)
    }

    // ── Predictions ───────────────────────────────────────────────────────────

    /// Snapshots captured on `date`, by fixture id.
    pub fn list_predictions_on(&self, date: NaiveDate) -> Result<Vec<PredictionSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fixture_id, date, home, away, confidence, markets, result, evaluated
             FROM predictions WHERE date = ?1 ORDER BY fixture_id",
        )?;
        let rows = stmt
            .query_map(params![date], map_prediction_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(PredictionRow::into_snapshot).collect()
    }

    /// Per-market hit rate across all evaluated snapshots.
    pub fn market_records(&self) -> Result<Vec<MarketRecord>> {
        let results: Vec<String> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT result FROM predictions WHERE evaluated = 1 AND result IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut tally: BTreeMap<Market, (u32, u32)> = BTreeMap::new();
        for raw in &results {
            let result: BTreeMap<Market, bool> = serde_json::from_str(raw)?;
            for (market, hit) in result {
                let entry = tally.entry(market).or_default();
                entry.0 += 1;
                if hit {
                    entry.1 += 1;
                }
            }
        }

        Ok(tally
            .into_iter()
            .map(|(market, (evaluated, hits))| MarketRecord {
                market,
                evaluated,
                hits,
                hit_rate: if evaluated > 0 {
                    hits as f64 / evaluated as f64
                } else {
                    0.0
                },
            })
            .collect())
    }
}

impl SnapshotStore for Database {
    fn get_prediction(&self, fixture_id: u64) -> Result<Option<PredictionSnapshot>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT fixture_id, date, home, away, confidence, markets, result, evaluated
                 FROM predictions WHERE fixture_id = ?1",
                params![fixture_id as i64],
                map_prediction_row,
            )
            .optional()?;
        row.map(PredictionRow::into_snapshot).transpose()
    }

    fn insert_prediction(&self, snap: &PredictionSnapshot) -> Result<bool> {
        let markets = serde_json::to_string(&snap.markets)?;
        let result = snap
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn()?;
        let written = conn.execute(
            "INSERT INTO predictions (
                fixture_id, date, home, away, confidence, markets, result,
                evaluated, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
             ON CONFLICT(fixture_id) DO NOTHING",
            params![
                snap.fixture_id as i64,
                snap.date,
                snap.home,
                snap.away,
                snap.confidence.as_str(),
                markets,
                result,
                snap.evaluated,
                Utc::now(),
            ],
        )?;
        Ok(written == 1)
    }

    fn record_evaluation(&self, fixture_id: u64, result: &BTreeMap<Market, bool>) -> Result<bool> {
        let result = serde_json::to_string(result)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE predictions SET result = ?1, evaluated = 1, evaluated_at = ?2
             WHERE fixture_id = ?3 AND evaluated = 0",
            params![result, Utc::now(), fixture_id as i64],
        )?;
        Ok(updated == 1)
    }

    fn get_odds_snapshot(&self, date: NaiveDate) -> Result<Option<OddsSnapshot>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT bookmaker, fixtures FROM odds_snapshots WHERE date = ?1",
                params![date],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            Some((bookmaker, fixtures)) => Ok(Some(OddsSnapshot {
                date,
                bookmaker,
                fixtures: serde_json::from_str(&fixtures)?,
            })),
            None => Ok(None),
        }
    }

    fn insert_odds_snapshot(&self, snap: &OddsSnapshot) -> Result<bool> {
        let fixtures = serde_json::to_string(&snap.fixtures)?;
        let conn = self.conn()?;
        let written = conn.execute(
            "INSERT INTO odds_snapshots (date, bookmaker, fixtures, created_at)
             VALUES (?1,?2,?3,?4)
             ON CONFLICT(date) DO NOTHING",
            params![snap.date, snap.bookmaker, fixtures, Utc::now()],
        )?;
        Ok(written == 1)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

/// Raw prediction columns; JSON decoding happens outside the row closure so
/// serde errors surface as `PredictError::Json`.
struct PredictionRow {
    fixture_id: i64,
    date: NaiveDate,
    home: String,
    away: String,
    confidence: String,
    markets: String,
    result: Option<String>,
    evaluated: bool,
}

impl PredictionRow {
    fn into_snapshot(self) -> Result<PredictionSnapshot> {
        let confidence = self
            .confidence
            .parse::<Confidence>()
            .map_err(|e| PredictError::Corrupt(e.to_string()))?;
        let result = self
            .result
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(PredictionSnapshot {
            fixture_id: self.fixture_id as u64,
            date: self.date,
            home: self.home,
            away: self.away,
            confidence,
            markets: serde_json::from_str(&self.markets)?,
            result,
            evaluated: self.evaluated,
        })
    }
}

fn map_prediction_row(row: &rusqlite::Row) -> rusqlite::Result<PredictionRow> {
    Ok(PredictionRow {
        fixture_id: row.get(0)?,
        date: row.get(1)?,
        home: row.get(2)?,
        away: row.get(3)?,
        confidence: row.get(4)?,
        markets: row.get(5)?,
        result: row.get(6)?,
        evaluated: row.get(7)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS fixtures (
    id            INTEGER PRIMARY KEY,
    kickoff       TEXT    NOT NULL,
    kickoff_date  TEXT    NOT NULL,
    league        TEXT    NOT NULL,
    home_team     TEXT    NOT NULL,
    away_team     TEXT    NOT NULL,
    status        TEXT    NOT NULL,
    home_goals    INTEGER,
    away_goals    INTEGER,
    payload       TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS predictions (
    fixture_id    INTEGER PRIMARY KEY,
    date          TEXT    NOT NULL,
    home          TEXT    NOT NULL,
    away          TEXT    NOT NULL,
    confidence    TEXT    NOT NULL,
    markets       TEXT    NOT NULL,
    result        TEXT,
    evaluated     INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT    NOT NULL,
    evaluated_at  TEXT
);

CREATE TABLE IF NOT EXISTS odds_snapshots (
    date          TEXT    PRIMARY KEY,
    bookmaker     TEXT    NOT NULL,
    fixtures      TEXT    NOT NULL,
    created_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fixtures_date ON fixtures(kickoff_date);
CREATE INDEX IF NOT EXISTS idx_fixtures_home ON fixtures(home_team, kickoff);
CREATE INDEX IF NOT EXISTS idx_fixtures_away ON fixtures(away_team, kickoff);
CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(date);
"#;
