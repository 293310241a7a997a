use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Handles parsing the timestamp formats that appear in run files, sizing
/// records, and project logs.
pub struct TimestampParser;

impl TimestampParser {
    /// The absolute-UTC format shared by run files and sizing records.
    pub const UTC_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%SZ";

    /// Parse the strict absolute-UTC form. Records whose timestamps deviate
    /// from this format are unusable for time-based ranking and get dropped
    /// by the caller.
    pub fn parse_utc(value: &str) -> Result<DateTime<Utc>> {
        match NaiveDateTime::parse_from_str(value, Self::UTC_FORMAT) {
            Ok(naive) => Ok(DateTime::from_naive_utc_and_offset(naive, Utc)),
            Err(_) => anyhow::bail!("not an absolute UTC timestamp: {}", value),
        }
    }

    /// Parse a local-time `YYYY-MM-DD HH:MM:SS` stamp (the ralph.log form)
    /// into UTC. Ambiguous or nonexistent local times resolve to the earliest
    /// mapping.
    pub fn parse_local(value: &str) -> Result<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")?;
        match Local.from_local_datetime(&naive).earliest() {
            Some(local) => Ok(local.with_timezone(&Utc)),
            None => anyhow::bail!("local time has no UTC mapping: {}", value),
        }
    }

    /// Compact stamp used to suffix backup copies of rewritten run files.
    pub fn backup_stamp(now: DateTime<Utc>) -> String {
        now.format("%Y%m%dT%H%M%SZ").to_string()
    }
}
