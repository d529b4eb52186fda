//! In-process stores for embedders without SQLite and for tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, RwLock,
    },
};

use anyhow::{anyhow, bail, Result};

use super::{
    models::{FeedbackRecord, NewSession, Session, SessionStatus},
    store::{FeedbackStore, SessionStore},
};

/// One write as the store received it, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Insert(String),
    Extend(String, i64),
    Close(String, i64),
    Delete(String),
}

#[derive(Default)]
struct SessionTable {
    rows: Vec<Session>,
    /// Only kept when asked for; a long-running store would grow it forever.
    ops: Option<Vec<StoreOp>>,
}

impl SessionTable {
    fn record(&mut self, op: StoreOp) {
        if let Some(ops) = self.ops.as_mut() {
            ops.push(op);
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    table: Mutex<SessionTable>,
    failing: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that also remembers every write it received, in order.
    pub fn with_op_log() -> Self {
        Self {
            table: Mutex::new(SessionTable {
                rows: Vec::new(),
                ops: Some(Vec::new()),
            }),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent write fail, to exercise degraded persistence.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.lock().rows.clone()
    }

    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.lock().rows.iter().find(|s| s.id == session_id).cloned()
    }

    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock().ops.clone().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionTable> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("session store unavailable");
        }
        Ok(())
    }
}

impl SessionStore for MemorySessionStore {
    fn insert_open(&self, session: &NewSession) -> Result<String> {
        self.check_available()?;
        let mut table = self.lock();
        if table.rows.iter().any(|s| s.id == session.id) {
            bail!("session {} already exists", session.id);
        }
        table.rows.push(Session::from(session.clone()));
        table.record(StoreOp::Insert(session.id.clone()));
        Ok(session.id.clone())
    }

    fn extend(&self, session_id: &str, end_ms: i64) -> Result<()> {
        self.check_available()?;
        let mut table = self.lock();
        let row = table
            .rows
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| anyhow!("session {session_id} not found"))?;
        if row.status == SessionStatus::Open {
            row.end_ms = end_ms;
        }
        table.record(StoreOp::Extend(session_id.to_string(), end_ms));
        Ok(())
    }

    fn close(&self, session_id: &str, end_ms: i64) -> Result<()> {
        self.check_available()?;
        let mut table = self.lock();
        if let Some(row) = table
            .rows
            .iter_mut()
            .find(|s| s.id == session_id && s.status == SessionStatus::Open)
        {
            row.end_ms = end_ms;
            row.status = SessionStatus::Closed;
        }
        table.record(StoreOp::Close(session_id.to_string(), end_ms));
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        self.check_available()?;
        let mut table = self.lock();
        table.rows.retain(|s| s.id != session_id);
        table.record(StoreOp::Delete(session_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFeedbackStore {
    records: RwLock<HashMap<String, FeedbackRecord>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = FeedbackRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.package_id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn get(&self, package_id: &str) -> Result<Option<FeedbackRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow!("feedback cache poisoned"))?;
        Ok(records.get(package_id).cloned())
    }

    fn upsert(&self, record: &FeedbackRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow!("feedback cache poisoned"))?;
        records.insert(record.package_id.clone(), record.clone());
        Ok(())
    }
}
