use std::time::Duration;

use luckyfive_model::{
    cycle::{DEFAULT_CYCLE_DURATION, DEFAULT_TARGET_POINTS},
    leaderboard::{DEFAULT_LEADERBOARD_SIZE, DEFAULT_MIN_POINTS},
    rate_limit::{
        DEFAULT_PATTERN_CAPACITY, DEFAULT_PATTERN_MIN_RECORDS, DEFAULT_PATTERN_TOLERANCE,
        DEFAULT_SUBMISSION_LIMIT, DEFAULT_SUBMISSION_WINDOW,
    },
    CycleParams,
};
use typed_builder::TypedBuilder;

/// Default entry amount, in the payment chain's native unit.
pub const DEFAULT_ENTRY_AMOUNT: &str = "0.003";

/// Default receiver of entry payments.
pub const DEFAULT_PAYMENT_RECEIVER: &str = "0x4b2cd2688cc3a86aff6254c8512b2fc969008093";

/// Default points removed by the leader deduction.
pub const DEFAULT_LEADER_DEDUCTION: u64 = 1000;

/// Options for [`Client`](crate::Client).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ClientOptions {
    /// Cycle duration.
    #[builder(default = DEFAULT_CYCLE_DURATION)]
    pub cycle_duration: Duration,
    /// Points required to place.
    #[builder(default = DEFAULT_TARGET_POINTS)]
    pub target_points: u64,
    /// Ledger awards allowed per window.
    #[builder(default = DEFAULT_SUBMISSION_LIMIT)]
    pub submission_limit: u32,
    /// Ledger window.
    #[builder(default = DEFAULT_SUBMISSION_WINDOW)]
    pub submission_window: Duration,
    /// Entry amount.
    #[builder(default = DEFAULT_ENTRY_AMOUNT.to_string(), setter(into))]
    pub entry_amount: String,
    /// Receiver of entry payments.
    #[builder(default = DEFAULT_PAYMENT_RECEIVER.to_string(), setter(into))]
    pub payment_receiver: String,
    /// Points removed by the leader deduction.
    #[builder(default = DEFAULT_LEADER_DEDUCTION)]
    pub leader_deduction: u64,
    /// Leaderboard size.
    #[builder(default = DEFAULT_LEADERBOARD_SIZE)]
    pub leaderboard_size: usize,
    /// Minimum points of the "all" leaderboard.
    #[builder(default = DEFAULT_MIN_POINTS)]
    pub leaderboard_min_points: u64,
    /// Guard options.
    #[builder(default)]
    pub guard: GuardOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientOptions {
    /// Parameters of new cycles.
    pub fn cycle_params(&self) -> CycleParams {
        CycleParams {
            duration: self.cycle_duration,
            target_points: self.target_points,
        }
    }
}

/// Options for the [`Guard`](crate::guard::Guard).
#[derive(Debug, Clone, TypedBuilder)]
pub struct GuardOptions {
    /// Minimum interval between input changes.
    #[builder(default = Duration::from_millis(100))]
    pub input_interval: Duration,
    /// Minimum interval between number confirmations.
    #[builder(default = Duration::from_millis(800))]
    pub add_interval: Duration,
    /// Cooldown of each action class.
    #[builder(default = Duration::from_secs(20))]
    pub cooldown: Duration,
    /// Submissions kept by the pattern detector.
    #[builder(default = DEFAULT_PATTERN_CAPACITY)]
    pub pattern_capacity: usize,
    /// Submissions before the pattern detector engages.
    #[builder(default = DEFAULT_PATTERN_MIN_RECORDS)]
    pub pattern_min_records: usize,
    /// Tolerance around the mean submission interval.
    #[builder(default = DEFAULT_PATTERN_TOLERANCE)]
    pub pattern_tolerance: Duration,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
