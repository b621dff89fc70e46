pub mod attention;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod sampler;
pub mod severity;

#[cfg(test)]
mod test_support;

pub use config::EngineConfig;
pub use daemon::Daemon;
pub use engine::{
    DisplayState, EngineEvent, EngineStatus, FocusEngine, SessionState, Task, TaskDraft,
};
pub use error::EngineError;
pub use ipc::{IpcClient, IpcRequest, IpcResponse};
pub use severity::Severity;
