use crate::{
    config::{socket_path, EngineConfig},
    engine::{EngineEvent, FocusEngine, PlanningOutcome},
    ipc::{listen, DaemonIpcHandler},
    sampler::{create_sampler, ActivitySampler},
};
use anyhow::Result;
use flowmate_ai::create_oracle;
use flowmate_storage::Database;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

pub struct Daemon {
    engine: Arc<FocusEngine>,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Wire storage, oracle and sampler into a running focus engine.
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be read
    pub fn new(db: Arc<Database>, config: &EngineConfig) -> Result<Self> {
        let stale = db.abandon_stale_sessions()?;
        if stale > 0 {
            log::info!("Closed {stale} session(s) left open by a previous run");
        }

        let ai_config = db.get_ai_config()?.with_env_overrides();
        let oracle = create_oracle(&ai_config);
        let sampler: Arc<dyn ActivitySampler> = Arc::from(create_sampler());

        let engine = FocusEngine::start(config, db, oracle, sampler);
        Ok(Self {
            engine: Arc::new(engine),
            shutdown: CancellationToken::new(),
        })
    }

    pub async fn run_with_signals(&self) -> Result<()> {
        let sock_path = socket_path()?;
        let ipc_handler = Arc::new(DaemonIpcHandler::new(
            self.engine.clone(),
            self.shutdown.clone(),
        ));

        let listen_path = sock_path.clone();
        tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &listen_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });
        tokio::spawn(log_events(self.engine.subscribe(), self.shutdown.clone()));

        log::info!("Daemon started with signal handling and IPC");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received Ctrl-C, shutting down...");
                self.shutdown.cancel();
            }
            () = self.shutdown.cancelled() => {
                log::info!("Shutdown requested over IPC");
            }
        }

        self.engine.shutdown().await;
        if sock_path.exists() {
            if let Err(e) = std::fs::remove_file(&sock_path) {
                log::warn!("Failed to remove socket {}: {e}", sock_path.display());
            }
        }
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }
}

/// Mirror engine events into the daemon log
async fn log_events(mut events: broadcast::Receiver<EngineEvent>, shutdown: CancellationToken) {
    loop {
        let event = tokio::select! {
            () = shutdown.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(EngineEvent::StateChanged {
                display,
                task_index,
                task_name,
                total,
            }) => {
                let position = task_index.map_or(0, |i| i + 1);
                log::info!(
                    "[{display}] {position}/{total} {}",
                    task_name.unwrap_or_default()
                );
            }
            Ok(EngineEvent::Attention(event)) if event.distracted => {
                log::info!(
                    "Attention ({}, {}): {}",
                    event.severity,
                    event.source,
                    event.reason
                );
            }
            Ok(EngineEvent::Planning(PlanningOutcome::Failed)) => {
                log::warn!("Planner returned no steps");
            }
            Ok(EngineEvent::QueueCompleted) => log::info!("All tasks done"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("Event log skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
