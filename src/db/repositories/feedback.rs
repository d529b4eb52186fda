use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{conversion_error, to_u32},
    models::FeedbackRecord,
    store::FeedbackStore,
};

fn row_to_feedback(row: &Row) -> Result<FeedbackRecord, rusqlite::Error> {
    let feedback_count: i64 = row.get("feedback_count")?;

    Ok(FeedbackRecord {
        package_id: row.get("package_id")?,
        category: row.get("category")?,
        confidence: row.get("confidence")?,
        feedback_count: to_u32(feedback_count, "feedback_count").map_err(conversion_error)?,
        updated_at_ms: row.get("updated_at_ms")?,
    })
}

impl FeedbackStore for Database {
    fn get(&self, package_id: &str) -> Result<Option<FeedbackRecord>> {
        let package_id = package_id.to_string();
        self.execute_blocking(move |conn| {
            let record = conn
                .query_row(
                    "SELECT package_id, category, confidence, feedback_count, updated_at_ms
                     FROM user_feedback WHERE package_id = ?1",
                    params![package_id],
                    row_to_feedback,
                )
                .optional()?;
            Ok(record)
        })
    }

    fn upsert(&self, record: &FeedbackRecord) -> Result<()> {
        let record = record.clone();
        self.execute_blocking(move |conn| {
            conn.execute(
                "INSERT INTO user_feedback (package_id, category, confidence, feedback_count, updated_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(package_id) DO UPDATE SET
                     category = excluded.category,
                     confidence = excluded.confidence,
                     feedback_count = excluded.feedback_count,
                     updated_at_ms = excluded.updated_at_ms",
                params![
                    record.package_id,
                    record.category,
                    record.confidence,
                    record.feedback_count,
                    record.updated_at_ms,
                ],
            )
            .context("failed to upsert user feedback")?;
            Ok(())
        })
    }
}

impl Database {
    pub async fn list_feedback(&self) -> Result<Vec<FeedbackRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT package_id, category, confidence, feedback_count, updated_at_ms
                 FROM user_feedback ORDER BY package_id",
            )?;
            let records = stmt
                .query_map([], row_to_feedback)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }
}
