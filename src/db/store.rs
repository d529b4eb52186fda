//! Storage seams used by the pipeline.
//!
//! Both traits are synchronous: session writes are executed off the intake path
//! by the session writer thread, and feedback reads are served from memory.

use anyhow::Result;

use super::models::{FeedbackRecord, NewSession};

pub trait SessionStore: Send + Sync {
    /// Persists a new open session and returns its id.
    fn insert_open(&self, session: &NewSession) -> Result<String>;

    /// Advances the end time of an open session. Repeating the call is harmless.
    fn extend(&self, session_id: &str, end_ms: i64) -> Result<()>;

    /// Freezes the end time. Closing an already closed session does nothing.
    fn close(&self, session_id: &str, end_ms: i64) -> Result<()>;

    fn delete(&self, session_id: &str) -> Result<()>;
}

pub trait FeedbackStore: Send + Sync {
    fn get(&self, package_id: &str) -> Result<Option<FeedbackRecord>>;

    fn upsert(&self, record: &FeedbackRecord) -> Result<()>;
}
