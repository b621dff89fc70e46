//! Session record writes, off the engine lock.
//!
//! The machine queues operations on a channel. One task applies them in order
//! on the blocking pool, so a busy database never stalls the countdown.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use flowmate_storage::{SessionStatus, SessionStore};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

enum RecordOp {
    Start {
        key: Uuid,
        task: String,
        planned_minutes: u32,
    },
    End {
        key: Uuid,
        status: SessionStatus,
    },
    Distraction {
        key: Uuid,
        process: String,
        title: String,
        reason: String,
    },
    Flush(oneshot::Sender<()>),
}

/// Handle to the record writer task
pub struct RecordWriter {
    tx: mpsc::UnboundedSender<RecordOp>,
}

impl RecordWriter {
    /// Spawn the writer on the current runtime
    #[must_use]
    pub fn spawn(store: Arc<dyn SessionStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, rx));
        Self { tx }
    }

    /// Queue a new record; later calls refer to it by the returned key
    pub fn start(&self, task: &str, planned_minutes: u32) -> Uuid {
        let key = Uuid::new_v4();
        self.send(RecordOp::Start {
            key,
            task: task.to_string(),
            planned_minutes,
        });
        key
    }

    pub fn end(&self, key: Uuid, status: SessionStatus) {
        self.send(RecordOp::End { key, status });
    }

    pub fn distraction(&self, key: Uuid, process: &str, title: &str, reason: &str) {
        self.send(RecordOp::Distraction {
            key,
            process: process.to_string(),
            title: title.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Resolves once every operation queued before it has been applied
    pub fn flush(&self) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        self.send(RecordOp::Flush(done));
        rx
    }

    fn send(&self, op: RecordOp) {
        if self.tx.send(op).is_err() {
            log::warn!("Record writer stopped, dropping session update");
        }
    }
}

async fn run_writer(store: Arc<dyn SessionStore>, mut ops: mpsc::UnboundedReceiver<RecordOp>) {
    // Record keys to the ids the store assigned; a failed start has no entry
    let mut ids: HashMap<Uuid, Uuid> = HashMap::new();

    while let Some(op) = ops.recv().await {
        match op {
            RecordOp::Start {
                key,
                task,
                planned_minutes,
            } => {
                let name = task.clone();
                match blocking(&store, move |s| s.start_session(&task, planned_minutes)).await {
                    Ok(id) => {
                        ids.insert(key, id);
                    }
                    Err(e) => log::warn!("Failed to open session record for '{name}': {e}"),
                }
            }
            RecordOp::End { key, status } => {
                let Some(id) = ids.remove(&key) else {
                    continue;
                };
                if let Err(e) = blocking(&store, move |s| s.end_session(id, status)).await {
                    log::warn!("Failed to close session record {id} as {status}: {e}");
                }
            }
            RecordOp::Distraction {
                key,
                process,
                title,
                reason,
            } => {
                let Some(&id) = ids.get(&key) else {
                    continue;
                };
                let result = blocking(&store, move |s| {
                    s.log_distraction(id, &process, &title, &reason)
                })
                .await;
                if let Err(e) = result {
                    log::warn!("Failed to persist distraction for session {id}: {e}");
                }
            }
            RecordOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn blocking<T, F>(store: &Arc<dyn SessionStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn SessionStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref())).await?
}
