use chrono::Utc;

/// Current time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Rank that sorts later creation times first. Times before the epoch
/// rank as the epoch.
pub fn newest_first_rank(created_at_ms: i64) -> u64 {
    u64::MAX - created_at_ms.max(0) as u64
}
