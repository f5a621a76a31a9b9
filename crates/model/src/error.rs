use std::time::Duration;

/// Validation error. Raised locally, never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The game wallet address is malformed.
    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(String),
    /// The payment wallet address is malformed.
    #[error("invalid payment address: {0}")]
    InvalidPaymentAddress(String),
    /// The username is empty.
    #[error("username must not be empty")]
    EmptyUsername,
    /// The number input is not numeric or out of range.
    #[error("invalid number `{0}`: expected an integer between 1 and 100")]
    InvalidNumber(String),
    /// The number has already been selected.
    #[error("number {0} already selected")]
    DuplicateNumber(u8),
    /// The selection is already full.
    #[error("only {0} numbers can be selected")]
    SelectionFull(usize),
    /// The selection is not complete.
    #[error("exactly {expected} numbers are required, got {got}")]
    IncompleteSelection {
        /// Required count.
        expected: usize,
        /// Selected count.
        got: usize,
    },
    /// The transaction reference is empty.
    #[error("empty transaction reference")]
    EmptyTransaction,
}

/// Action classes with independent cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ActionClass {
    /// Confirming a number.
    AddNumber,
    /// Submitting a complete game.
    SubmitGame,
}

/// Rate limit rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimited {
    /// Input field changed faster than the debounce interval.
    #[error("input changed too quickly")]
    InputTooFast,
    /// Numbers confirmed faster than the minimum interval.
    #[error("numbers added too quickly")]
    AddTooFast,
    /// The action class is cooling down.
    #[error("{class} is cooling down, {}s remaining", .remaining.as_secs_f32().ceil())]
    Cooldown {
        /// Action class.
        class: ActionClass,
        /// Time until the next action of this class is accepted.
        remaining: Duration,
    },
    /// Submission timing looks scripted.
    #[error("suspicious activity detected, please slow down")]
    SuspiciousPattern,
    /// The ledger-level submission window is exhausted.
    #[error("too many submissions: at most {limit} per {}s", .window.as_secs())]
    SubmissionWindow {
        /// Submissions allowed per window.
        limit: u32,
        /// Window length.
        window: Duration,
    },
}
