use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{conversion_error, parse_status, to_u32},
    models::{CategoryUsage, NewSession, Session},
    store::SessionStore,
};

const SESSION_COLUMNS: &str = "id, package_id, app_label, screen_text, category, subcategory, \
     confidence, start_ms, end_ms, status";

fn row_to_session(row: &Row) -> Result<Session, rusqlite::Error> {
    let status: String = row.get("status")?;

    Ok(Session {
        id: row.get("id")?,
        package_id: row.get("package_id")?,
        app_label: row.get("app_label")?,
        screen_text: row.get("screen_text")?,
        category: row.get("category")?,
        subcategory: row.get("subcategory")?,
        confidence: row.get("confidence")?,
        start_ms: row.get("start_ms")?,
        end_ms: row.get("end_ms")?,
        status: parse_status(&status).map_err(conversion_error)?,
    })
}

impl SessionStore for Database {
    fn insert_open(&self, session: &NewSession) -> Result<String> {
        let record = session.clone();
        self.execute_blocking(move |conn| {
            conn.execute(
                "INSERT INTO usage_sessions (id, package_id, app_label, screen_text, category, subcategory, confidence, start_ms, end_ms, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 'open')",
                params![
                    record.id,
                    record.package_id,
                    record.app_label,
                    record.screen_text,
                    record.category,
                    record.subcategory,
                    record.confidence,
                    record.start_ms,
                ],
            )
            .context("failed to insert usage session")?;
            Ok(record.id)
        })
    }

    fn extend(&self, session_id: &str, end_ms: i64) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute_blocking(move |conn| {
            conn.execute(
                "UPDATE usage_sessions SET end_ms = ?1 WHERE id = ?2 AND status = 'open'",
                params![end_ms, session_id],
            )
            .context("failed to extend usage session")?;
            Ok(())
        })
    }

    fn close(&self, session_id: &str, end_ms: i64) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute_blocking(move |conn| {
            conn.execute(
                "UPDATE usage_sessions
                 SET end_ms = ?1,
                     status = 'closed'
                 WHERE id = ?2 AND status = 'open'",
                params![end_ms, session_id],
            )
            .context("failed to close usage session")?;
            Ok(())
        })
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute_blocking(move |conn| {
            conn.execute(
                "DELETE FROM usage_sessions WHERE id = ?1",
                params![session_id],
            )
            .context("failed to delete usage session")?;
            Ok(())
        })
    }
}

impl Database {
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM usage_sessions WHERE id = ?1");
            let session = conn
                .query_row(&sql, params![session_id], row_to_session)
                .optional()?;
            Ok(session)
        })
        .await
    }

    /// Sessions overlapping `[start_ms, end_ms)`, oldest first.
    pub async fn list_sessions_in_range(&self, start_ms: i64, end_ms: i64) -> Result<Vec<Session>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM usage_sessions
                 WHERE end_ms >= ?1 AND start_ms < ?2
                 ORDER BY start_ms ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let sessions = stmt
                .query_map(params![start_ms, end_ms], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
        .await
    }

    /// Time per category over `[start_ms, end_ms)`, with sessions clipped to the range.
    /// Largest total first; equal totals are ordered by category name.
    pub async fn category_totals(&self, start_ms: i64, end_ms: i64) -> Result<Vec<CategoryUsage>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT category,
                        SUM(MAX(MIN(end_ms, ?2) - MAX(start_ms, ?1), 0)) AS total_ms,
                        COUNT(*) AS session_count
                 FROM usage_sessions
                 WHERE end_ms > ?1 AND start_ms < ?2
                 GROUP BY category
                 ORDER BY total_ms DESC, category ASC",
            )?;

            let mut rows = stmt.query(params![start_ms, end_ms])?;
            let mut totals = Vec::new();
            while let Some(row) = rows.next()? {
                let session_count: i64 = row.get(2)?;
                totals.push(CategoryUsage {
                    category: row.get(0)?,
                    duration_ms: row.get(1)?,
                    session_count: to_u32(session_count, "session_count")?,
                });
            }
            Ok(totals)
        })
        .await
    }

    /// Marks sessions left open by a previous run as interrupted, keeping the
    /// last end time that was persisted for them. Returns the affected ids.
    pub async fn recover_open_sessions(&self) -> Result<Vec<String>> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            let ids = {
                let mut stmt = tx.prepare("SELECT id FROM usage_sessions WHERE status = 'open'")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            };
            tx.execute(
                "UPDATE usage_sessions SET status = 'interrupted' WHERE status = 'open'",
                [],
            )?;
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
