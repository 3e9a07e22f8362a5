//! Wall-clock helpers used for JWT registered claims.

use chrono::{DateTime, Utc};

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Unix seconds for an optional instant, `0` when unset.
pub fn timestamp_or_zero(instant: Option<DateTime<Utc>>) -> i64 {
    instant.map(|t| t.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_is_reasonable() {
        let ts = now_timestamp();
        // Should be after 2024-01-01 (1704067200)
        assert!(ts > 1704067200, "Timestamp {} is too old", ts);
        // Should be before 2100-01-01 (4102444800)
        assert!(ts < 4102444800, "Timestamp {} is too far in future", ts);
    }

    #[test]
    fn test_timestamp_or_zero() {
        assert_eq!(timestamp_or_zero(None), 0);

        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(timestamp_or_zero(Some(t)), 1_700_000_000);
    }
}
