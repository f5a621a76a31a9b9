#![deny(missing_docs)]
#![deny(unreachable_pub)]

//! # LuckyFive Model
//!
//! Records, scoring rules and the pure parts of the anti-abuse heuristics.
//! Nothing in this crate performs I/O; every time-dependent function takes
//! `now` explicitly.

/// Error types.
pub mod error;

/// Scoring and number selection.
pub mod scoring;

/// Input validation.
pub mod validation;

/// Player record.
pub mod player;

/// Cycle record and winner slots.
pub mod cycle;

/// Payment records.
pub mod payment;

/// Leaderboard projections and aggregate stats.
pub mod leaderboard;

/// Rate limiting windows and the submission pattern detector.
pub mod rate_limit;

pub(crate) mod utils;

pub use crate::{
    cycle::{Cycle, CycleParams, PaidEntry, Place, Winner, Winners},
    error::{ActionClass, RateLimited, ValidationError},
    leaderboard::{GameStats, LeaderboardEntry, Period, Trend, WinnerAlert},
    payment::{PaymentRecord, PointDeduction},
    player::{GameRecord, Player},
    rate_limit::{SubmissionPattern, SubmissionWindow},
    scoring::{count_matches, points_for_matches, Selection},
};
