use std::collections::BTreeMap;

use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{cycle::cycle_key, leaderboard::Trend, payment::PaymentRecord};

/// One entry of the game history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GameRecord {
    /// Points earned by the game.
    pub points: u64,
    /// Time of the award.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

/// Player record, keyed by game wallet address.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Player {
    /// Game wallet address.
    pub wallet_address: String,
    /// Display name.
    pub username: String,
    /// Points in [`Player::cycle_number`].
    #[cfg_attr(feature = "serde", serde(default))]
    pub points: u64,
    /// Games played since registration. Never reset.
    #[cfg_attr(feature = "serde", serde(default))]
    pub games_played: u64,
    /// Append-only award log.
    #[cfg_attr(feature = "serde", serde(default))]
    pub game_history: Vec<GameRecord>,
    /// Linked payment wallet.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub eth_address: Option<String>,
    /// Payment of the current cycle, keyed by `cycle_{N}`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub payments: BTreeMap<String, PaymentRecord>,
    /// Payments of past cycles, keyed by `cycle_{N}`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub payment_history: BTreeMap<String, PaymentRecord>,
    /// Whether a game is being played.
    #[cfg_attr(feature = "serde", serde(default))]
    pub game_in_progress: bool,
    /// The cycle `points` belong to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cycle_number: u64,
    /// Registration time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
    /// Time of the last award.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::rfc3339::option")
    )]
    pub last_updated: Option<OffsetDateTime>,
    /// Time of the last rollover reset.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::rfc3339::option")
    )]
    pub last_reset: Option<OffsetDateTime>,
}

impl Player {
    /// Create a fresh player.
    pub fn new(
        username: impl ToString,
        wallet_address: impl ToString,
        cycle_number: u64,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            wallet_address: wallet_address.to_string(),
            username: username.to_string(),
            points: 0,
            games_played: 0,
            game_history: Vec::new(),
            eth_address: None,
            payments: BTreeMap::new(),
            payment_history: BTreeMap::new(),
            game_in_progress: false,
            cycle_number,
            created_at: now,
            last_updated: None,
            last_reset: None,
        }
    }

    /// Points counted in `cycle_number`.
    ///
    /// Points stamped with an older cycle have not been reset yet and count as zero.
    pub fn points_in(&self, cycle_number: u64) -> u64 {
        if self.cycle_number >= cycle_number {
            self.points
        } else {
            0
        }
    }

    /// Apply the rollover reset for `cycle_number`.
    ///
    /// Moves payments of older cycles to the payment history, zeroes the points
    /// and clears the in-progress flag. Returns `false` if already applied.
    pub fn reset_for_cycle(&mut self, cycle_number: u64, now: OffsetDateTime) -> bool {
        if self.cycle_number >= cycle_number {
            return false;
        }
        let current = cycle_key(cycle_number);
        let stale = self
            .payments
            .keys()
            .filter(|key| **key != current)
            .cloned()
            .collect::<Vec<_>>();
        for key in stale {
            if let Some(record) = self.payments.remove(&key) {
                self.payment_history.insert(key, record);
            }
        }
        self.points = 0;
        self.game_in_progress = false;
        self.cycle_number = cycle_number;
        self.last_reset = Some(now);
        true
    }

    /// Record an award. Points, games played and history change together.
    pub fn record_game(&mut self, points: u64, now: OffsetDateTime) {
        self.points = self.points.saturating_add(points);
        self.games_played += 1;
        self.game_history.push(GameRecord {
            points,
            timestamp: now,
        });
        self.game_in_progress = false;
        self.last_updated = Some(now);
    }

    /// Payment record for `cycle_number`, if any.
    pub fn payment_for(&self, cycle_number: u64) -> Option<&PaymentRecord> {
        self.payments.get(&cycle_key(cycle_number))
    }

    /// Trend derived from the two most recent awards.
    pub fn trend(&self) -> Trend {
        let mut recent = self.game_history.iter().rev().map(|record| record.points);
        let last = recent.next().unwrap_or(0);
        let previous = recent.next().unwrap_or(0);
        Trend::between(previous, last)
    }

    /// Time of the last award, or the registration time.
    pub fn last_played(&self) -> OffsetDateTime {
        self.last_updated.unwrap_or(self.created_at)
    }

    /// Average points per game.
    pub fn average_points(&self) -> f64 {
        self.points as f64 / self.games_played.max(1) as f64
    }
}
