//! Client-local rate and anomaly heuristics.
//!
//! The guard is advisory: it runs in the client and can be bypassed by a
//! modified client. The ledger limiter is the only server-visible limit.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use luckyfive_model::{
    rate_limit::{cooldown_remaining, is_too_soon},
    ActionClass, RateLimited, SubmissionPattern,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{clock::Clock, options::GuardOptions};

/// Storage key of the guard state.
pub const GUARD_STATE_KEY: &str = "luckyfive.guard";

/// Key/value storage local to one client.
pub trait GuardStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: String);

    /// Remove a value.
    fn remove(&self, key: &str);
}

/// In-memory [`GuardStorage`]. Clones share the same values.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuardStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl GuardStorage for MemoryGuardStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuardState {
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_input: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_add: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_submit: Option<OffsetDateTime>,
    #[serde(default)]
    pattern: SubmissionPattern,
}

impl GuardState {
    fn last_action(&self, class: ActionClass) -> Option<OffsetDateTime> {
        match class {
            ActionClass::AddNumber => self.last_add,
            ActionClass::SubmitGame => self.last_submit,
        }
    }
}

/// Rate/anomaly guard.
pub struct Guard<G> {
    clock: Arc<dyn Clock>,
    storage: G,
    options: GuardOptions,
}

impl<G> std::fmt::Debug for Guard<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<G: GuardStorage> Guard<G> {
    /// Create a guard.
    pub fn new(clock: Arc<dyn Clock>, storage: G, options: GuardOptions) -> Self {
        Self {
            clock,
            storage,
            options,
        }
    }

    /// Get the options.
    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    fn load(&self) -> GuardState {
        let Some(raw) = self.storage.get(GUARD_STATE_KEY) else {
            return GuardState::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(%err, "discarding malformed guard state");
            GuardState::default()
        })
    }

    fn save(&self, state: &GuardState) {
        match serde_json::to_string(state) {
            Ok(raw) => self.storage.set(GUARD_STATE_KEY, raw),
            Err(err) => tracing::warn!(%err, "failed to persist guard state"),
        }
    }

    fn reject(&self, err: RateLimited) -> Result<(), RateLimited> {
        tracing::warn!(%err, "guard rejected action");
        Err(err)
    }

    /// Check a raw input change.
    pub fn check_input_change(&self) -> Result<(), RateLimited> {
        let now = self.clock.now();
        let mut state = self.load();
        if is_too_soon(state.last_input, now, self.options.input_interval) {
            return self.reject(RateLimited::InputTooFast);
        }
        state.last_input = Some(now);
        self.save(&state);
        Ok(())
    }

    /// Check the confirmation of `number`.
    pub fn check_add_number(&self, number: u8) -> Result<(), RateLimited> {
        let now = self.clock.now();
        let mut state = self.load();
        if is_too_soon(state.last_add, now, self.options.add_interval) {
            return self.reject(RateLimited::AddTooFast);
        }
        if let Some(remaining) = cooldown_remaining(state.last_add, now, self.options.cooldown) {
            return self.reject(RateLimited::Cooldown {
                class: ActionClass::AddNumber,
                remaining,
            });
        }
        state.pattern.check_and_record(
            now,
            number,
            self.options.pattern_capacity,
            self.options.pattern_min_records,
            self.options.pattern_tolerance,
        )
        .or_else(|err| self.reject(err))?;
        state.last_add = Some(now);
        self.save(&state);
        Ok(())
    }

    /// Check a game submission and start its cooldown.
    pub fn check_submit_game(&self) -> Result<(), RateLimited> {
        self.ensure_submit_allowed()?;
        self.record_submit_game();
        Ok(())
    }

    /// Check a game submission without starting its cooldown.
    ///
    /// Pair with [`Guard::record_submit_game`] once the submission is accepted.
    pub fn ensure_submit_allowed(&self) -> Result<(), RateLimited> {
        let state = self.load();
        match cooldown_remaining(state.last_submit, self.clock.now(), self.options.cooldown) {
            Some(remaining) => self.reject(RateLimited::Cooldown {
                class: ActionClass::SubmitGame,
                remaining,
            }),
            None => Ok(()),
        }
    }

    /// Start the submission cooldown.
    pub fn record_submit_game(&self) {
        let mut state = self.load();
        state.last_submit = Some(self.clock.now());
        self.save(&state);
    }

    /// Remaining cooldown of `class`, for a countdown.
    pub fn remaining_cooldown(&self, class: ActionClass) -> Option<Duration> {
        let state = self.load();
        cooldown_remaining(state.last_action(class), self.clock.now(), self.options.cooldown)
    }

    /// Forget every recorded action.
    pub fn reset(&self) {
        self.storage.remove(GUARD_STATE_KEY);
    }
}
