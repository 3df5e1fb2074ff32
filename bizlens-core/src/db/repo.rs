//! Database repository layer
//!
//! Insert and query operations for analysis records. Records are
//! append-only: there is no update or delete path by design.

use crate::error::Result;
use crate::types::{AnalysisRecord, Industry, RecordMetrics};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::PathBuf;
use std::sync::Mutex;

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrency with readers
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Analysis records
    // ============================================

    /// Insert an analysis record. Append-only: an existing id is an error.
    pub fn insert_analysis(&self, record: &AnalysisRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO analyses (
                id, user_id, dataset_id, question, answer, industry,
                row_count, column_count, total_revenue, avg_revenue,
                prompt_hash, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.id,
                record.user_id,
                record.dataset_id,
                record.question,
                record.answer,
                record.industry.as_str(),
                record.metrics.row_count as i64,
                record.metrics.column_count as i64,
                record.metrics.total_revenue,
                record.metrics.avg_revenue,
                record.prompt_hash,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List a user's analyses, newest first.
    pub fn list_analyses(&self, user_id: &str, limit: usize) -> Result<Vec<AnalysisRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, dataset_id, question, answer, industry,
                   row_count, column_count, total_revenue, avg_revenue,
                   prompt_hash, created_at
            FROM analyses
            WHERE user_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], row_to_record)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// List a user's analyses within a time window, newest first. Used by
    /// history and comparison reads.
    pub fn list_analyses_between(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AnalysisRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, dataset_id, question, answer, industry,
                   row_count, column_count, total_revenue, avg_revenue,
                   prompt_hash, created_at
            FROM analyses
            WHERE user_id = ?1 AND created_at >= ?2 AND created_at <= ?3
            ORDER BY created_at DESC
            "#,
        )?;

        let rows = stmt.query_map(
            params![user_id, since.to_rfc3339(), until.to_rfc3339()],
            row_to_record,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Count a user's stored analyses.
    pub fn count_analyses(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM analyses WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let industry: String = row.get(5)?;
    let created_at_str: String = row.get(11)?;
    Ok(AnalysisRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        dataset_id: row.get(2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        industry: industry.parse().unwrap_or(Industry::Business),
        metrics: RecordMetrics {
            row_count: row.get::<_, i64>(6)? as usize,
            column_count: row.get::<_, i64>(7)? as usize,
            total_revenue: row.get(8)?,
            avg_revenue: row.get(9)?,
        },
        prompt_hash: row.get(10)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
