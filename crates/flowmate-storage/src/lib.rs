pub mod db;
pub mod migrations;
pub mod models;
pub mod store;

pub use db::{Database, AI_CONFIG_KEYS};
pub use models::{
    AiConfig, AiProvider, DistractionRecord, ReasonCount, SessionRecord, SessionStatus,
    SessionSummary, TodayStats,
};
pub use store::SessionStore;
