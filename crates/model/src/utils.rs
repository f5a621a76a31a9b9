use std::time::Duration;

use time::OffsetDateTime;

/// Time elapsed from `since` to `now`, zero if `since` is in the future.
pub(crate) fn elapsed(now: OffsetDateTime, since: OffsetDateTime) -> Duration {
    Duration::try_from(now - since).unwrap_or_default()
}

pub(crate) fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}
