//! Background executor for [`SessionCommand`]s.
//!
//! A single thread drains one FIFO queue, so writes for any session id land in
//! the order the manager issued them (open, extends, close, delete) and the
//! intake path never waits on storage.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc, Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};

use crate::db::{NewSession, SessionStore};

use super::manager::{CloseSession, SessionCommand};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

enum WriterMessage {
    Apply(SessionCommand),
    Flush(mpsc::Sender<()>),
    Shutdown,
}

pub struct SessionWriter {
    sender: mpsc::Sender<WriterMessage>,
    worker: Mutex<Option<JoinHandle<()>>>,
    failed_writes: Arc<AtomicU64>,
}

impl SessionWriter {
    pub fn spawn(store: Arc<dyn SessionStore>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<WriterMessage>();
        let failed_writes = Arc::new(AtomicU64::new(0));
        let failures = failed_writes.clone();

        let worker = thread::Builder::new()
            .name("usage-timeline-session-writer".into())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        WriterMessage::Apply(command) => {
                            if let Err(err) = apply(store.as_ref(), &command) {
                                failures.fetch_add(1, Ordering::Relaxed);
                                log_error!("session write failed: {err:?}");
                            }
                        }
                        WriterMessage::Flush(reply) => {
                            let _ = reply.send(());
                        }
                        WriterMessage::Shutdown => break,
                    }
                }
                log_info!("Session writer shutting down");
            })
            .context("failed to spawn session writer thread")?;

        Ok(Self {
            sender,
            worker: Mutex::new(Some(worker)),
            failed_writes,
        })
    }

    /// Queues `command`; `Ignore` is dropped here.
    pub fn submit(&self, command: SessionCommand) {
        if command.is_ignore() {
            return;
        }
        if self.sender.send(WriterMessage::Apply(command)).is_err() {
            log_error!("session writer is gone; dropping command");
        }
    }

    /// Blocks until everything queued before this call has been applied.
    pub fn flush(&self) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.sender
            .send(WriterMessage::Flush(reply_tx))
            .map_err(|_| anyhow!("session writer is not running"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("session writer stopped before flushing"))
    }

    /// Number of commands whose store write returned an error.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// Applies everything already queued, then stops the thread.
    pub fn shutdown(&self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if self.sender.send(WriterMessage::Shutdown).is_err() {
                log_error!("session writer exited before shutdown");
            }
            if let Err(join_err) = handle.join() {
                log_error!("failed to join session writer: {join_err:?}");
            }
        }
    }
}

impl Drop for SessionWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply(store: &dyn SessionStore, command: &SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Open(session) => apply_open(store, session),
        SessionCommand::Extend { session_id, end_ms } => store
            .extend(session_id, *end_ms)
            .with_context(|| format!("extend {session_id} to {end_ms}")),
        SessionCommand::Close(close) => apply_close(store, close),
        SessionCommand::CloseAndOpen { close, open } => {
            // The new session is opened even when finalizing the old one failed.
            let closed = apply_close(store, close);
            apply_open(store, open)?;
            closed
        }
        SessionCommand::Ignore => Ok(()),
    }
}

fn apply_open(store: &dyn SessionStore, session: &NewSession) -> Result<()> {
    let id = store
        .insert_open(session)
        .with_context(|| format!("open {} ({})", session.id, session.package_id))?;
    log_debug!("opened session {id} for {} as {}", session.package_id, session.category);
    Ok(())
}

fn apply_close(store: &dyn SessionStore, close: &CloseSession) -> Result<()> {
    store
        .close(&close.session_id, close.end_ms)
        .with_context(|| format!("close {} at {}", close.session_id, close.end_ms))?;
    if close.discard {
        store
            .delete(&close.session_id)
            .with_context(|| format!("discard short session {}", close.session_id))?;
        log_debug!("discarded short session {}", close.session_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::StoreOp;
    use crate::db::{MemorySessionStore, SessionStatus};

    fn new_session(id: &str, start_ms: i64) -> NewSession {
        NewSession {
            id: id.into(),
            package_id: "com.whatsapp".into(),
            app_label: "WhatsApp".into(),
            screen_text: "chat".into(),
            category: "social".into(),
            subcategory: String::new(),
            confidence: 0.95,
            start_ms,
        }
    }

    fn close(id: &str, end_ms: i64, discard: bool) -> CloseSession {
        CloseSession {
            session_id: id.into(),
            end_ms,
            discard,
        }
    }

    #[test]
    fn commands_apply_in_submission_order() {
        let store = Arc::new(MemorySessionStore::with_op_log());
        let writer = SessionWriter::spawn(store.clone()).unwrap();

        writer.submit(SessionCommand::Open(new_session("s1", 0)));
        writer.submit(SessionCommand::Extend {
            session_id: "s1".into(),
            end_ms: 1_000,
        });
        writer.submit(SessionCommand::Ignore);
        writer.submit(SessionCommand::CloseAndOpen {
            close: close("s1", 2_000, false),
            open: new_session("s2", 2_000),
        });
        writer.flush().unwrap();

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Insert("s1".into()),
                StoreOp::Extend("s1".into(), 1_000),
                StoreOp::Close("s1".into(), 2_000),
                StoreOp::Insert("s2".into()),
            ]
        );
        let s1 = store.session("s1").unwrap();
        assert_eq!(s1.status, SessionStatus::Closed);
        assert_eq!(s1.duration_ms(), 2_000);
    }

    #[test]
    fn discarded_session_is_closed_then_deleted() {
        let store = Arc::new(MemorySessionStore::with_op_log());
        let writer = SessionWriter::spawn(store.clone()).unwrap();

        writer.submit(SessionCommand::Open(new_session("s1", 0)));
        writer.submit(SessionCommand::Close(close("s1", 400, true)));
        writer.flush().unwrap();

        assert!(store.session("s1").is_none());
        assert_eq!(
            store.operations().last(),
            Some(&StoreOp::Delete("s1".into()))
        );
    }

    #[test]
    fn failures_are_counted_and_do_not_stop_the_writer() {
        let store = Arc::new(MemorySessionStore::new());
        let writer = SessionWriter::spawn(store.clone()).unwrap();

        store.set_failing(true);
        writer.submit(SessionCommand::Open(new_session("s1", 0)));
        writer.flush().unwrap();
        assert_eq!(writer.failed_writes(), 1);

        store.set_failing(false);
        writer.submit(SessionCommand::Open(new_session("s2", 10)));
        writer.flush().unwrap();
        assert!(store.session("s2").is_some());
    }

    #[test]
    fn shutdown_drains_pending_writes() {
        let store = Arc::new(MemorySessionStore::new());
        let writer = SessionWriter::spawn(store.clone()).unwrap();

        writer.submit(SessionCommand::Open(new_session("s1", 0)));
        writer.submit(SessionCommand::Close(close("s1", 5_000, false)));
        writer.shutdown();

        assert_eq!(store.session("s1").unwrap().end_ms, 5_000);
        assert!(writer.flush().is_err());
    }
}
