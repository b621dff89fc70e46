//! Database helper functions for safe type conversions.

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rusqlite::types::Type;

/// Parse a UUID string from database, returning a rusqlite error on failure.
pub fn parse_uuid(s: &str) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an RFC3339 datetime string from database, returning a rusqlite error on failure.
pub fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// UTC bounds `[start, end)` of the local calendar day containing `now`.
pub fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    let to_utc = |naive: NaiveDateTime| {
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    };
    let start = to_utc(midnight).unwrap_or_else(|| now.with_timezone(&Utc));
    let end = to_utc(midnight + Duration::days(1)).unwrap_or(start + Duration::days(1));
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(parse_datetime("yesterday-ish").is_err());
        assert!(parse_datetime("2024-03-01T10:00:00+00:00").is_ok());
    }

    #[test]
    fn test_local_day_bounds_contain_now() {
        let now = Local::now();
        let (start, end) = local_day_bounds(now);
        let now_utc = now.with_timezone(&Utc);
        assert!(start <= now_utc && now_utc < end);
        assert!(end - start <= Duration::hours(25));
    }
}
