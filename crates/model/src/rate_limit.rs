use std::{collections::VecDeque, time::Duration};

use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    utils::{elapsed, unix_millis},
    RateLimited,
};

/// Default ledger submissions per window.
pub const DEFAULT_SUBMISSION_LIMIT: u32 = 20;

/// Default ledger window.
pub const DEFAULT_SUBMISSION_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default pattern history length.
pub const DEFAULT_PATTERN_CAPACITY: usize = 10;

/// Default number of records before the detector engages.
pub const DEFAULT_PATTERN_MIN_RECORDS: usize = 5;

/// Default tolerance around the mean interval.
pub const DEFAULT_PATTERN_TOLERANCE: Duration = Duration::from_millis(50);

/// Ledger-level submission counter of one player.
///
/// The window opens at its first submission and is reset by the first
/// submission observed after it elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SubmissionWindow {
    /// First submission of the window.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub window_start: OffsetDateTime,
    /// Last accepted submission.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub last_submit: OffsetDateTime,
    /// Accepted submissions in the window.
    pub count: u32,
}

impl SubmissionWindow {
    /// An empty window opened at `now`.
    pub fn open(now: OffsetDateTime) -> Self {
        Self {
            window_start: now,
            last_submit: now,
            count: 0,
        }
    }

    /// Record a submission at `now`.
    pub fn try_record(
        &mut self,
        now: OffsetDateTime,
        limit: u32,
        window: Duration,
    ) -> Result<(), RateLimited> {
        if elapsed(now, self.window_start) > window {
            *self = Self::open(now);
        }
        if self.count >= limit {
            return Err(RateLimited::SubmissionWindow { limit, window });
        }
        self.count += 1;
        self.last_submit = now;
        Ok(())
    }

    /// Give back a submission recorded at `recorded_at`.
    ///
    /// Returns `false` if the window has been reopened since.
    pub fn release(&mut self, recorded_at: OffsetDateTime) -> bool {
        if self.count == 0 || recorded_at < self.window_start {
            return false;
        }
        self.count -= 1;
        true
    }
}

/// A recorded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PatternRecord {
    /// Unix timestamp in milliseconds.
    pub at: i64,
    /// Submitted number.
    pub number: u8,
}

/// Detector of uniformly timed submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubmissionPattern {
    records: VecDeque<PatternRecord>,
}

impl SubmissionPattern {
    /// Recorded submissions, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &PatternRecord> {
        self.records.iter()
    }

    /// Check the submission of `number` at `now` and record it if accepted.
    ///
    /// With more than `min_records` submissions including this one, it is
    /// rejected if every interval lies within `tolerance` of the mean interval.
    /// Rejected submissions are not recorded.
    pub fn check_and_record(
        &mut self,
        now: OffsetDateTime,
        number: u8,
        capacity: usize,
        min_records: usize,
        tolerance: Duration,
    ) -> Result<(), RateLimited> {
        let record = PatternRecord {
            at: unix_millis(now),
            number,
        };
        let mut candidate = self.records.clone();
        candidate.push_back(record);
        while candidate.len() > capacity.max(2) {
            candidate.pop_front();
        }
        if candidate.len() > min_records && is_uniform(&candidate, tolerance) {
            return Err(RateLimited::SuspiciousPattern);
        }
        self.records = candidate;
        Ok(())
    }

    /// Forget every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn is_uniform(records: &VecDeque<PatternRecord>, tolerance: Duration) -> bool {
    let intervals = records
        .iter()
        .zip(records.iter().skip(1))
        .map(|(a, b)| i128::from(b.at) - i128::from(a.at))
        .collect::<Vec<_>>();
    if intervals.is_empty() {
        return false;
    }
    let len = intervals.len() as i128;
    let sum = intervals.iter().sum::<i128>();
    let tolerance = tolerance.as_millis() as i128 * len;
    intervals
        .iter()
        .all(|interval| (interval * len - sum).abs() <= tolerance)
}

/// Remaining cooldown at `now` of an action last performed at `last`.
pub fn cooldown_remaining(
    last: Option<OffsetDateTime>,
    now: OffsetDateTime,
    cooldown: Duration,
) -> Option<Duration> {
    let passed = elapsed(now, last?);
    cooldown.checked_sub(passed).filter(|left| !left.is_zero())
}

/// Returns whether less than `min_interval` passed since `last`.
pub fn is_too_soon(
    last: Option<OffsetDateTime>,
    now: OffsetDateTime,
    min_interval: Duration,
) -> bool {
    last.is_some_and(|last| elapsed(now, last) < min_interval)
}
