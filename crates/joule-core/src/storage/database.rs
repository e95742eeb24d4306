//! SQLite storage for analysis history and savings records.
//!
//! Provides persistent storage for:
//! - Heat-loss analyses (indexed summary columns plus the full result as JSON)
//! - Savings events
//! - Key-value store for the savings goal and a fetched rate schedule

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::analysis::AnalysisResult;
use crate::error::{DatabaseError, Result};
use crate::rates::RateSchedule;
use crate::savings::{SavingsEvent, SavingsGoal, SavingsTracker};

const GOAL_KEY: &str = "savings_goal";
const RATE_SCHEDULE_KEY: &str = "rate_schedule";

/// A stored analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub source_file: Option<String>,
    pub result: AnalysisResult,
}

/// SQLite database at `~/.config/joule/joule.db`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database in the data directory.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("joule.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn save_analysis(&self, result: &AnalysisResult, source_file: Option<&str>) -> Result<i64> {
        let json = serde_json::to_string(result)?;
        self.conn.execute(
            "INSERT INTO analyses (created_at, method, heat_loss_factor, source_file, result_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Utc::now().to_rfc3339(),
                result.method.to_string(),
                result.heat_loss_factor,
                source_file,
                json,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "saved analysis");
        Ok(id)
    }

    /// Most recent analyses first.
    pub fn list_analyses(&self, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, source_file, result_json
             FROM analyses
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, created_at, source_file, json) = row?;
            records.push(AnalysisRecord {
                id,
                created_at: parse_timestamp(&created_at)?,
                source_file,
                result: serde_json::from_str(&json)?,
            });
        }
        Ok(records)
    }

    pub fn latest_analysis(&self) -> Result<Option<AnalysisRecord>> {
        Ok(self.list_analyses(1)?.into_iter().next())
    }

    /// Returns whether a row was removed.
    pub fn delete_analysis(&self, id: i64) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM analyses WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    pub fn add_savings_event(&self, event: &SavingsEvent) -> Result<()> {
        self.conn.execute(
            "INSERT INTO savings_events (id, occurred_on, amount, kind, note, event_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id.to_string(),
                event.occurred_on.format("%Y-%m-%d").to_string(),
                event.amount,
                event.kind.as_str(),
                event.note,
                serde_json::to_string(event)?,
            ],
        )?;
        Ok(())
    }

    /// Events in date order.
    pub fn savings_events(&self) -> Result<Vec<SavingsEvent>> {
        let mut stmt = self
            .conn
            .prepare("SELECT event_json FROM savings_events ORDER BY occurred_on, rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut events = Vec::new();
        for json in rows {
            events.push(serde_json::from_str(&json?)?);
        }
        Ok(events)
    }

    pub fn savings_events_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SavingsEvent>> {
        Ok(self
            .savings_events()?
            .into_iter()
            .filter(|e| e.occurred_on >= from && e.occurred_on <= to)
            .collect())
    }

    pub fn delete_savings_event(&self, id: Uuid) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM savings_events WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(n > 0)
    }

    pub fn savings_goal(&self) -> Result<Option<SavingsGoal>> {
        self.kv_get_json(GOAL_KEY)
    }

    /// `None` clears the goal.
    pub fn set_savings_goal(&self, goal: Option<&SavingsGoal>) -> Result<()> {
        match goal {
            Some(goal) => self.kv_set_json(GOAL_KEY, goal),
            None => self.kv_delete(GOAL_KEY),
        }
    }

    /// Events and goal loaded into a tracker.
    pub fn savings_tracker(&self) -> Result<SavingsTracker> {
        Ok(SavingsTracker::new(self.savings_events()?, self.savings_goal()?))
    }

    pub fn rate_schedule(&self) -> Result<Option<RateSchedule>> {
        self.kv_get_json(RATE_SCHEDULE_KEY)
    }

    /// `None` goes back to the flat configured rate.
    pub fn set_rate_schedule(&self, schedule: Option<&RateSchedule>) -> Result<()> {
        match schedule {
            Some(s) => self.kv_set_json(RATE_SCHEDULE_KEY, s),
            None => self.kv_delete(RATE_SCHEDULE_KEY),
        }
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn kv_get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv_get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn kv_set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.kv_set(key, &serde_json::to_string(value)?)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{s}': {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BalancePoint, BalanceStatus, EstimateMethod};
    use crate::savings::SavingsKind;

    fn result(ua: f64) -> AnalysisResult {
        AnalysisResult {
            method: EstimateMethod::CoastDown,
            heat_loss_factor: ua,
            design_heat_loss_btu_hr: ua * 70.0,
            heat_loss_per_sqft: ua / 1500.0,
            balance_point: BalancePoint {
                temp_f: Some(28.5),
                status: BalanceStatus::Found,
            },
            coast_down: None,
            runtime_fit: None,
            data_start: None,
            data_end: None,
            rows: 100,
            days: 3,
        }
    }

    #[test]
    fn analyses_newest_first() {
        let db = Database::open_memory().unwrap();
        let first = db.save_analysis(&result(300.0), Some("jan.csv")).unwrap();
        let second = db.save_analysis(&result(320.0), None).unwrap();

        let list = db.list_analyses(10).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second);
        assert_eq!(list[1].source_file.as_deref(), Some("jan.csv"));
        assert_eq!(list[1].result, result(300.0));
        assert_eq!(db.latest_analysis().unwrap().unwrap().id, second);

        assert!(db.delete_analysis(first).unwrap());
        assert!(!db.delete_analysis(first).unwrap());
        assert_eq!(db.list_analyses(10).unwrap().len(), 1);
    }

    #[test]
    fn savings_roundtrip() {
        let db = Database::open_memory().unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let late = SavingsEvent::new(d(9), 12.5, SavingsKind::Schedule, Some("night setback".into()))
            .unwrap();
        let early = SavingsEvent::new(d(2), 4.0, SavingsKind::Other, None).unwrap();
        db.add_savings_event(&late).unwrap();
        db.add_savings_event(&early).unwrap();

        let events = db.savings_events().unwrap();
        assert_eq!(events, vec![early.clone(), late.clone()]);
        assert_eq!(db.savings_events_between(d(5), d(31)).unwrap(), vec![late]);

        assert!(db.delete_savings_event(early.id).unwrap());
        assert_eq!(db.savings_tracker().unwrap().total(), 12.5);
    }

    #[test]
    fn goal_and_schedule_in_kv() {
        let db = Database::open_memory().unwrap();
        assert!(db.savings_goal().unwrap().is_none());
        let goal = SavingsGoal {
            target: 100.0,
            label: None,
            deadline: None,
        };
        db.set_savings_goal(Some(&goal)).unwrap();
        assert_eq!(db.savings_goal().unwrap(), Some(goal));
        db.set_savings_goal(None).unwrap();
        assert!(db.savings_goal().unwrap().is_none());

        let schedule = RateSchedule::flat(0.13, 9.0);
        db.set_rate_schedule(Some(&schedule)).unwrap();
        assert_eq!(db.rate_schedule().unwrap(), Some(schedule));
    }

    #[test]
    fn file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joule.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
