use crate::PlanRecord;
use chrono::{NaiveDate, NaiveDateTime};

/// Fixed timestamp for tests (2024-03-09 14:02:07).
pub fn timestamp() -> NaiveDateTime {
    timestamp_at(14, 2, 7)
}

/// Timestamp on 2024-03-09 at the given wall-clock time.
pub fn timestamp_at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|d| d.and_hms_opt(hour, min, sec))
        .expect("valid test timestamp")
}

/// Record with an explicit query name.
pub fn record(database: &str, query_name: &str, body: &str) -> PlanRecord {
    PlanRecord {
        database: database.to_string(),
        logged_at: timestamp(),
        query_name: query_name.to_string(),
        body: body.to_string(),
    }
}

/// Positional marker line for `database` logged at `ts`.
pub fn marker_line(database: &str, ts: NaiveDateTime) -> String {
    format!(
        "{} UTC [{}] {database},report,psql,10.0.0.7 LOG:  duration: 1.250 ms  plan:",
        ts.format("%Y-%m-%d %H:%M:%S"),
        next_pid(),
    )
}

fn next_pid() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(1000);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
