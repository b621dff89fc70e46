use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
};
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineStatus, FocusEngine, Task, TaskDraft};
use crate::error::EngineError;

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcRequest {
    Status,
    Queue,
    StartSession { goal: String },
    /// `None` confirms the plan produced by the last `StartSession`
    ConfirmPlan { tasks: Option<Vec<TaskDraft>> },
    EditQueue { tasks: Vec<TaskDraft> },
    CompleteStep,
    Abandon,
    SetTaskPause(bool),
    SetSupervisionPause(bool),
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IpcResponse {
    Status(EngineStatus),
    Queue {
        tasks: Vec<Task>,
        current: Option<usize>,
    },
    Plan {
        tasks: Vec<Task>,
    },
    Ok,
    Error(String),
    Shutdown,
}

impl From<Result<(), EngineError>> for IpcResponse {
    fn from(result: Result<(), EngineError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// # Errors
    ///
    /// Fails when the daemon is unreachable or answers garbage
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

pub struct DaemonIpcHandler {
    engine: Arc<FocusEngine>,
    shutdown: CancellationToken,
}

impl DaemonIpcHandler {
    #[must_use]
    pub const fn new(engine: Arc<FocusEngine>, shutdown: CancellationToken) -> Self {
        Self { engine, shutdown }
    }

    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => IpcResponse::Status(self.engine.status().await),
            IpcRequest::Queue => {
                let (tasks, current) = self.engine.queue().await;
                IpcResponse::Queue { tasks, current }
            }
            IpcRequest::StartSession { goal } => match self.engine.start_session(&goal).await {
                Ok(tasks) => IpcResponse::Plan { tasks },
                Err(e) => IpcResponse::Error(e.to_string()),
            },
            IpcRequest::ConfirmPlan { tasks } => {
                let drafts = match tasks {
                    Some(drafts) => drafts,
                    None => self
                        .engine
                        .pending_plan()
                        .await
                        .iter()
                        .map(TaskDraft::from)
                        .collect(),
                };
                self.engine.confirm_plan(drafts).await.into()
            }
            IpcRequest::EditQueue { tasks } => self.engine.edit_queue(tasks).await.into(),
            IpcRequest::CompleteStep => self.engine.complete_step().await.into(),
            IpcRequest::Abandon => self.engine.abandon().await.into(),
            IpcRequest::SetTaskPause(paused) => self.engine.set_task_pause(paused).await.into(),
            IpcRequest::SetSupervisionPause(paused) => {
                self.engine.set_supervision_pause(paused).await;
                IpcResponse::Ok
            }
            IpcRequest::Shutdown => {
                self.shutdown.cancel();
                IpcResponse::Shutdown
            }
        }
    }

    async fn serve(&self, stream: &mut UnixStream) -> Result<()> {
        // The client shuts down its write half after the request
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        if buffer.is_empty() {
            return Ok(());
        }

        let request: IpcRequest = bincode::deserialize(&buffer)?;
        log::debug!("IPC request: {request:?}");
        let response = self.handle(request).await;

        let encoded = bincode::serialize(&response)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

/// Accept connections on `sock_path` until the process exits
///
/// # Errors
///
/// Fails when the socket cannot be bound
pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = handler.serve(&mut stream).await {
                        log::error!("IPC handle error: {e}");
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}
