// src/store/sqlite.rs
//! SQLite-backed statistics store.

use super::StatisticsStore;
use crate::error::StoreError;
use crate::model::{PlanErrorState, PlanRow, StatisticsRecord, TraversalResult};
use crate::types::PlanId;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS plans (
    id TEXT PRIMARY KEY,
    root_block TEXT NOT NULL,
    notion_token TEXT,
    last_error TEXT
);
CREATE TABLE IF NOT EXISTS statistics (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    plan_id TEXT NOT NULL REFERENCES plans(id),
    block_cnt INTEGER NOT NULL,
    word_cnt INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS statistics_plan_recent ON statistics(plan_id, created_at, seq);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file and its schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts or replaces a plan row.
    pub fn add_plan(&self, row: &PlanRow) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO plans(id, root_block, notion_token) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET root_block = excluded.root_block,
                                           notion_token = excluded.notion_token",
            params![row.id.as_str(), row.root_block, row.notion_token],
        )?;
        Ok(())
    }

    /// The plan's recorded last error, `None` when clear or unknown.
    pub fn plan_error(&self, plan: &PlanId) -> Result<Option<String>, StoreError> {
        let value: Option<Option<String>> = self
            .conn
            .lock()
            .query_row(
                "SELECT last_error FROM plans WHERE id = ?1",
                params![plan.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// The plan's statistics history, oldest first.
    pub fn history(&self, plan: &PlanId) -> Result<Vec<StatisticsRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT block_cnt, word_cnt, created_at FROM statistics
             WHERE plan_id = ?1 ORDER BY created_at, seq",
        )?;
        let rows = stmt.query_map(params![plan.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (blocks, words, created_at) = row?;
            let recorded_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Malformed(format!("created_at {}: {}", created_at, e)))?
                .with_timezone(&Utc);
            records.push(StatisticsRecord::new(
                plan.clone(),
                TraversalResult::new(to_count(blocks)?, to_count(words)?),
                recorded_at,
            ));
        }
        Ok(records)
    }
}

fn to_count(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Malformed(format!("negative count {}", value)))
}

fn to_column(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Malformed(format!("count {} overflows", value)))
}

#[async_trait::async_trait]
impl StatisticsStore for SqliteStore {
    async fn select_plans(&self) -> Result<Vec<PlanRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, root_block, notion_token FROM plans ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(PlanRow {
                id: PlanId::new(row.get::<_, String>(0)?),
                root_block: row.get(1)?,
                notion_token: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn latest_statistics(&self, plan: &PlanId) -> Result<Option<TraversalResult>, StoreError> {
        let latest = self
            .conn
            .lock()
            .query_row(
                "SELECT block_cnt, word_cnt FROM statistics WHERE plan_id = ?1
                 ORDER BY created_at DESC, seq DESC LIMIT 1",
                params![plan.as_str()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        latest
            .map(|(blocks, words)| Ok(TraversalResult::new(to_count(blocks)?, to_count(words)?)))
            .transpose()
    }

    async fn insert_statistics(&self, record: &StatisticsRecord) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO statistics(plan_id, block_cnt, word_cnt, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.plan_id.as_str(),
                to_column(record.block_count)?,
                to_column(record.word_count)?,
                record.recorded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    async fn update_plan_error(&self, state: &PlanErrorState) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "UPDATE plans SET last_error = ?2 WHERE id = ?1",
            params![state.plan_id.as_str(), state.last_error],
        )?;
        Ok(())
    }
}
