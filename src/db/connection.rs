use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Request {
    Run(Job),
    Stop,
}

/// The thread that owns the connection, plus the queue feeding it.
struct Worker {
    queue: mpsc::Sender<Request>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    fn stop(&self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if self.queue.send(Request::Stop).is_err() {
            error!("Database thread already gone at shutdown");
        }
        if let Err(panic) = handle.join() {
            error!("Database thread panicked: {panic:?}");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to the SQLite connection owned by a dedicated thread.
///
/// Jobs run one at a time in submission order, whichever clone or thread
/// submitted them.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create database directory {}", dir.display()))?;
        }

        let (queue, requests) = mpsc::channel::<Request>();
        let (opened_tx, opened_rx) = mpsc::channel::<Result<()>>();
        let thread_path = path.clone();

        let thread = thread::Builder::new()
            .name("usage-timeline-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&thread_path) {
                    Ok(conn) => {
                        if opened_tx.send(Ok(())).is_err() {
                            return;
                        }
                        conn
                    }
                    Err(err) => {
                        let _ = opened_tx.send(Err(err));
                        return;
                    }
                };

                for request in requests {
                    match request {
                        Request::Run(job) => job(&mut conn),
                        Request::Stop => break,
                    }
                }
                info!("Database thread stopped");
            })
            .context("failed to spawn database thread")?;

        opened_rx
            .recv()
            .context("database thread exited during startup")??;
        info!("Database ready at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                queue,
                thread: Mutex::new(Some(thread)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.dispatch(task, move |result| reply_tx.send(result).is_ok())?;
        reply_rx.await.map_err(|_| thread_gone())?
    }

    /// Same as [`Database::execute`] for synchronous callers such as the
    /// session writer thread. Never call it from an async task.
    pub fn execute_blocking<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.dispatch(task, move |result| reply_tx.send(result).is_ok())?;
        reply_rx.recv().map_err(|_| thread_gone())?
    }

    /// Queues `task`; `deliver` hands its result back and reports whether the
    /// caller was still waiting.
    fn dispatch<F, T, D>(&self, task: F, deliver: D) -> Result<()>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        D: FnOnce(Result<T>) -> bool + Send + 'static,
    {
        let job: Job = Box::new(move |conn| {
            if !deliver(task(conn)) {
                error!("Database caller went away before its result arrived");
            }
        });
        self.worker
            .queue
            .send(Request::Run(job))
            .map_err(|_| thread_gone())
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("WAL journal mode unavailable: {err}");
    }
    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn thread_gone() -> anyhow::Error {
    anyhow!("database thread is not running")
}
