use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub mod models;

use crate::report::PredictionReport;

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// One stored prediction row, with the full report decoded from its JSON column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub fixture_id: i64,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: Option<String>,
    pub outcome: String,
    pub score: String,
    pub confidence: f64,
    pub report: PredictionReport,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Predictions ───────────────────────────────────────────────────────────

    /// Insert or replace the prediction for a fixture
    pub fn upsert_prediction(&self, report: &PredictionReport) -> Result<()> {
        let payload = serde_json::to_string(report)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO predictions (
                fixture_id, league, home_team, away_team, kickoff,
                outcome, score, confidence, payload, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
             ON CONFLICT(fixture_id) DO UPDATE SET
                league=excluded.league,
                home_team=excluded.home_team,
                away_team=excluded.away_team,
                kickoff=excluded.kickoff,
                outcome=excluded.outcome,
                score=excluded.score,
                confidence=excluded.confidence,
                payload=excluded.payload,
                created_at=excluded.created_at",
            params![
                report.fixture.id,
                report.fixture.league,
                report.fixture.home_team,
                report.fixture.away_team,
                report.fixture.date,
                report.prediction.as_str(),
                report.score.display,
                report.confidence,
                payload,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Store a batch of reports, returning how many were written
    pub fn store_all(&self, reports: &[PredictionReport]) -> Result<usize> {
        for r in reports {
            self.upsert_prediction(r)?;
        }
        Ok(reports.len())
    }

    /// Most recently stored predictions first
    pub fn list_recent(&self, limit: i64) -> Result<Vec<StoredPrediction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT fixture_id, league, home_team, away_team, kickoff,
                    outcome, score, confidence, payload, created_at
             FROM predictions ORDER BY created_at DESC, fixture_id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get(&self, fixture_id: i64) -> Result<Option<StoredPrediction>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT fixture_id, league, home_team, away_team, kickoff,
                        outcome, score, confidence, payload, created_at
                 FROM predictions WHERE fixture_id=?1",
                params![fixture_id],
                map_prediction,
            )
            .optional()?;
        Ok(row)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let n = conn.query_row("SELECT COUNT(*) FROM predictions", [], |r| r.get(0))?;
        Ok(n)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<StoredPrediction> {
    let payload: String = row.get(8)?;
    let report = serde_json::from_str(&payload).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(StoredPrediction {
        fixture_id: row.get(0)?,
        league: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        kickoff: row.get(4)?,
        outcome: row.get(5)?,
        score: row.get(6)?,
        confidence: row.get(7)?,
        report,
        created_at: row.get(9)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    fixture_id  INTEGER PRIMARY KEY,
    league      TEXT    NOT NULL,
    home_team   TEXT    NOT NULL,
    away_team   TEXT    NOT NULL,
    kickoff     TEXT,
    outcome     TEXT    NOT NULL,
    score       TEXT    NOT NULL,
    confidence  REAL    NOT NULL,
    payload     TEXT    NOT NULL,
    created_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_predictions_created ON predictions(created_at);
"#;
