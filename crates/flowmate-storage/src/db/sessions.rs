use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use rusqlite::params;
#[cfg(test)]
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::models::{ReasonCount, SessionRecord, SessionStatus, SessionSummary, TodayStats};

use super::helpers::{local_day_bounds, parse_datetime, parse_uuid};
use super::Database;

impl Database {
    /// Open a new session record for a task entering FOCUS
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub fn start_session(&self, task_name: &str, planned_minutes: u32) -> Result<Uuid> {
        let record = SessionRecord::new(task_name.to_string(), planned_minutes);
        self.insert_session(&record)?;
        log::debug!("Opened session {} for '{task_name}'", record.id);
        Ok(record.id)
    }

    /// Insert a fully-formed session record
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails
    pub fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO sessions (id, task_name, start_time, end_time, planned_minutes, status, distraction_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.task_name,
                record.start_time.to_rfc3339(),
                record.end_time.map(|t| t.to_rfc3339()),
                record.planned_minutes,
                record.status.to_string(),
                record.distraction_count,
            ],
        )?;
        Ok(())
    }

    /// Close a session record with a terminal status
    ///
    /// Closing an already-closed record is a no-op so a late retry can never
    /// overwrite the first terminal status.
    ///
    /// # Errors
    ///
    /// Returns an error if the status is not terminal or the update fails
    pub fn end_session(&self, session_id: Uuid, status: SessionStatus) -> Result<()> {
        if !status.is_terminal() {
            anyhow::bail!("cannot close session {session_id} with status {status}");
        }
        let updated = self.conn()?.execute(
            "UPDATE sessions SET end_time = ?1, status = ?2 WHERE id = ?3 AND end_time IS NULL",
            params![Utc::now().to_rfc3339(), status.to_string(), session_id.to_string()],
        )?;
        if updated == 0 {
            log::warn!("Session {session_id} was not open; close as {status} ignored");
        }
        Ok(())
    }

    /// Append a distraction to the log and bump the session's counter
    ///
    /// # Errors
    ///
    /// Returns an error if either statement fails; both run in one transaction
    pub fn log_distraction(
        &self,
        session_id: Uuid,
        process_name: &str,
        window_title: &str,
        reason: &str,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO distractions (id, session_id, timestamp, process_name, window_title, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                session_id.to_string(),
                Utc::now().to_rfc3339(),
                process_name,
                window_title,
                reason,
            ],
        )?;
        tx.execute(
            "UPDATE sessions SET distraction_count = distraction_count + 1 WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Get a session record by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[cfg(test)]
    pub fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
        let record = self
            .conn()?
            .query_row(
                "SELECT id, task_name, start_time, end_time, planned_minutes, status, distraction_count
                 FROM sessions WHERE id = ?1",
                params![session_id.to_string()],
                Self::row_to_session,
            )
            .optional()?;
        Ok(record)
    }

    /// The open session record, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[cfg(test)]
    pub fn get_open_session(&self) -> Result<Option<SessionRecord>> {
        let record = self
            .conn()?
            .query_row(
                "SELECT id, task_name, start_time, end_time, planned_minutes, status, distraction_count
                 FROM sessions WHERE end_time IS NULL
                 ORDER BY start_time DESC LIMIT 1",
                [],
                Self::row_to_session,
            )
            .optional()?;
        Ok(record)
    }

    /// Close records left open by a crashed or killed daemon
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub fn abandon_stale_sessions(&self) -> Result<usize> {
        let closed = self.conn()?.execute(
            "UPDATE sessions SET end_time = ?1, status = ?2 WHERE end_time IS NULL",
            params![Utc::now().to_rfc3339(), SessionStatus::Abandoned.to_string()],
        )?;
        if closed > 0 {
            log::warn!("Closed {closed} stale session(s) as ABANDONED");
        }
        Ok(closed)
    }

    /// Sessions started within `[start, end)`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, task_name, start_time, end_time, planned_minutes, status, distraction_count
             FROM sessions
             WHERE start_time >= ?1 AND start_time < ?2
             ORDER BY start_time ASC",
        )?;
        let sessions = stmt
            .query_map(params![start.to_rfc3339(), end.to_rfc3339()], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// All distractions logged for a session, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    #[cfg(test)]
    pub fn get_distractions(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<crate::models::DistractionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, process_name, window_title, reason
             FROM distractions
             WHERE session_id = ?1
             ORDER BY timestamp ASC",
        )?;
        let distractions = stmt
            .query_map(params![session_id.to_string()], |row| {
                Ok(crate::models::DistractionRecord {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    session_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    timestamp: parse_datetime(&row.get::<_, String>(2)?)?,
                    process_name: row.get(3)?,
                    window_title: row.get(4)?,
                    reason: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(distractions)
    }

    /// Most frequent distraction reasons within `[start, end)`
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn top_distraction_reasons(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReasonCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT reason, COUNT(*) AS cnt
             FROM distractions
             WHERE timestamp >= ?1 AND timestamp < ?2
             GROUP BY reason
             ORDER BY cnt DESC, reason ASC
             LIMIT ?3",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let reasons = stmt
            .query_map(params![start.to_rfc3339(), end.to_rfc3339(), limit], |row| {
                Ok(ReasonCount {
                    reason: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(reasons)
    }

    /// Today's sessions plus the top 3 distraction reasons
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_today_stats(&self) -> Result<TodayStats> {
        let (start, end) = local_day_bounds(Local::now());
        let sessions = self
            .get_sessions_between(start, end)?
            .into_iter()
            .map(|s| SessionSummary {
                task_name: s.task_name,
                planned_minutes: s.planned_minutes,
                status: s.status,
                distraction_count: s.distraction_count,
            })
            .collect();
        let top_reasons = self.top_distraction_reasons(start, end, 3)?;
        Ok(TodayStats {
            sessions,
            top_reasons,
        })
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<SessionRecord> {
        let status_str: String = row.get(5)?;
        Ok(SessionRecord {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            task_name: row.get(1)?,
            start_time: parse_datetime(&row.get::<_, String>(2)?)?,
            end_time: row
                .get::<_, Option<String>>(3)?
                .map(|s| parse_datetime(&s))
                .transpose()?,
            planned_minutes: row.get(4)?,
            status: status_str.parse().unwrap_or(SessionStatus::Abandoned),
            distraction_count: row.get(6)?,
        })
    }
}
