//! Persistence seam consumed by the focus engine.

use anyhow::Result;
use uuid::Uuid;

use crate::models::{SessionStatus, TodayStats};
use crate::Database;

/// Session persistence as seen by the engine
///
/// Every call is fire-and-forget with respect to timer progress: callers log
/// failures and keep going.
pub trait SessionStore: Send + Sync {
    /// Open a record for a task entering FOCUS and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written
    fn start_session(&self, task_name: &str, planned_minutes: u32) -> Result<Uuid>;

    /// Close the record with a terminal status
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be updated
    fn end_session(&self, session_id: Uuid, status: SessionStatus) -> Result<()>;

    /// Append a distraction and increment the record's counter
    ///
    /// # Errors
    ///
    /// Returns an error if the distraction cannot be written
    fn log_distraction(
        &self,
        session_id: Uuid,
        process_name: &str,
        window_title: &str,
        reason: &str,
    ) -> Result<()>;

    /// Sessions started today and the top distraction reasons
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics cannot be read
    fn today_stats(&self) -> Result<TodayStats>;
}

impl SessionStore for Database {
    fn start_session(&self, task_name: &str, planned_minutes: u32) -> Result<Uuid> {
        Database::start_session(self, task_name, planned_minutes)
    }

    fn end_session(&self, session_id: Uuid, status: SessionStatus) -> Result<()> {
        Database::end_session(self, session_id, status)
    }

    fn log_distraction(
        &self,
        session_id: Uuid,
        process_name: &str,
        window_title: &str,
        reason: &str,
    ) -> Result<()> {
        Database::log_distraction(self, session_id, process_name, window_title, reason)
    }

    fn today_stats(&self) -> Result<TodayStats> {
        self.get_today_stats()
    }
}
