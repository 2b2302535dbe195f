//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::models::*;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    /// Save an exported plan and return its ID.
    pub fn save_plan(&self, plan: &mut SavedPlan) -> Result<i64, DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO plans (name, gateway_type, gateway_count, stream_count, document, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                plan.name,
                plan.gateway_type,
                plan.gateway_count,
                plan.stream_count,
                plan.document,
                plan.created_at.format(TIME_FORMAT).to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        plan.id = id;
        Ok(id)
    }

    /// List plans, newest first.
    pub fn list_plans(&self) -> Result<Vec<PlanSummary>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, gateway_type, gateway_count, stream_count, created_at FROM plans ORDER BY created_at DESC, id DESC"
        )?;

        let plans = stmt.query_map([], |row| {
            let time_str: String = row.get(5)?;
            Ok(PlanSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                gateway_type: row.get(2)?,
                gateway_count: row.get(3)?,
                stream_count: row.get(4)?,
                created_at: parse_db_time(&time_str).unwrap_or_else(Utc::now),
            })
        })?
        .collect::<SqlResult<Vec<_>>>()?;

        Ok(plans)
    }

    /// Get a plan with its document.
    pub fn get_plan(&self, id: i64) -> Result<SavedPlan, DbError> {
        let conn = self.conn.lock().unwrap();
        let plan = conn
            .query_row(
                "SELECT id, name, gateway_type, gateway_count, stream_count, document, created_at FROM plans WHERE id = ?1",
                params![id],
                |row| {
                    let time_str: String = row.get(6)?;
                    Ok(SavedPlan {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        gateway_type: row.get(2)?,
                        gateway_count: row.get(3)?,
                        stream_count: row.get(4)?,
                        document: row.get(5)?,
                        created_at: parse_db_time(&time_str).unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;
        plan.ok_or(DbError::NotFound)
    }

    /// Delete a plan.
    pub fn delete_plan(&self, id: i64) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM plans WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [TIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}
