use std::{collections::BTreeMap, time::Duration};

use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default cycle duration.
pub const DEFAULT_CYCLE_DURATION: Duration = Duration::from_secs(4 * 60 * 60);

/// Default target points.
pub const DEFAULT_TARGET_POINTS: u64 = 2000;

/// Key of a cycle in per-cycle maps and in the cycle history, `cycle_{N}`.
pub fn cycle_key(cycle_number: u64) -> String {
    format!("cycle_{cycle_number}")
}

/// Winner slot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Place {
    /// First.
    First,
    /// Second.
    Second,
    /// Third. Filling it closes the cycle.
    Third,
}

/// An occupied winner slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Winner {
    /// Username at placement time.
    pub username: String,
    /// Game wallet address.
    pub address: String,
    /// Placement time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

/// Winner slots of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Winners {
    /// First place.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub first: Option<Winner>,
    /// Second place.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub second: Option<Winner>,
    /// Third place.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub third: Option<Winner>,
}

impl Winners {
    /// Get the slot of `place`.
    pub fn get(&self, place: Place) -> Option<&Winner> {
        match place {
            Place::First => self.first.as_ref(),
            Place::Second => self.second.as_ref(),
            Place::Third => self.third.as_ref(),
        }
    }

    fn slot_mut(&mut self, place: Place) -> &mut Option<Winner> {
        match place {
            Place::First => &mut self.first,
            Place::Second => &mut self.second,
            Place::Third => &mut self.third,
        }
    }

    /// The first empty slot in order.
    pub fn next_place(&self) -> Option<Place> {
        [Place::First, Place::Second, Place::Third]
            .into_iter()
            .find(|place| self.get(*place).is_none())
    }

    /// Put `winner` into the first empty slot.
    ///
    /// The same address may occupy several slots.
    pub fn assign(&mut self, winner: Winner) -> Option<Place> {
        let place = self.next_place()?;
        *self.slot_mut(place) = Some(winner);
        Some(place)
    }

    /// Returns whether all slots are occupied.
    pub fn is_full(&self) -> bool {
        self.third.is_some()
    }

    /// Occupied slots in order.
    pub fn iter(&self) -> impl Iterator<Item = (Place, &Winner)> {
        [Place::First, Place::Second, Place::Third]
            .into_iter()
            .filter_map(|place| self.get(place).map(|winner| (place, winner)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paid-set entry, keyed by the normalized chain address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PaidEntry {
    /// Game wallet of the payer.
    pub wallet_address: String,
    /// Transaction identifier.
    pub tx_hash: String,
    /// Recording time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

/// Parameters of new cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleParams {
    /// Cycle duration.
    pub duration: Duration,
    /// Target points.
    pub target_points: u64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            duration: DEFAULT_CYCLE_DURATION,
            target_points: DEFAULT_TARGET_POINTS,
        }
    }
}

/// A competition cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Cycle {
    /// Cycle number, from 1.
    pub cycle_number: u64,
    /// Start time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub start_time: OffsetDateTime,
    /// End time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub end_time: OffsetDateTime,
    /// Points required to place.
    pub target_points: u64,
    /// Winner slots.
    #[cfg_attr(feature = "serde", serde(default))]
    pub winners: Winners,
    /// Paid-set, keyed by normalized chain address.
    #[cfg_attr(feature = "serde", serde(default))]
    pub paid: BTreeMap<String, PaidEntry>,
    /// Set on archived cycles only.
    #[cfg_attr(feature = "serde", serde(default))]
    pub completed: bool,
}

impl Cycle {
    /// Create cycle `cycle_number` starting at `now`.
    pub fn new(cycle_number: u64, now: OffsetDateTime, params: &CycleParams) -> Self {
        Self {
            cycle_number,
            start_time: now,
            end_time: now + params.duration,
            target_points: params.target_points,
            winners: Winners::default(),
            paid: BTreeMap::new(),
            completed: false,
        }
    }

    /// The first cycle.
    pub fn first(now: OffsetDateTime, params: &CycleParams) -> Self {
        Self::new(1, now, params)
    }

    /// The successor of this cycle, starting at `now`.
    pub fn successor(&self, now: OffsetDateTime, params: &CycleParams) -> Self {
        Self::new(self.cycle_number + 1, now, params)
    }

    /// Returns whether the cycle has expired at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.end_time
    }

    /// Returns whether this cycle must be superseded at `now`.
    pub fn is_over(&self, now: OffsetDateTime) -> bool {
        self.is_expired(now) || self.winners.is_full()
    }

    /// Time left at `now`.
    pub fn remaining(&self, now: OffsetDateTime) -> Duration {
        crate::utils::elapsed(self.end_time, now)
    }

    /// The archived form of this cycle.
    pub fn into_archived(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Merge another archived copy of this cycle into this one.
    ///
    /// Winner slots and the paid-set only grow while a cycle is current, so
    /// merging copies read at different times yields the most recent one.
    pub fn merge_archived(&mut self, other: &Cycle) {
        for place in [Place::First, Place::Second, Place::Third] {
            let slot = self.winners.slot_mut(place);
            if slot.is_none() {
                *slot = other.winners.get(place).cloned();
            }
        }
        for (chain_address, entry) in &other.paid {
            self.paid
                .entry(chain_address.clone())
                .or_insert_with(|| entry.clone());
        }
        if other.start_time > self.start_time {
            self.start_time = other.start_time;
            self.end_time = other.end_time;
            self.target_points = other.target_points;
        }
        self.completed = true;
    }

    /// Restart timing and target, keeping the number, winners and paid-set.
    pub fn restart(&mut self, now: OffsetDateTime, params: &CycleParams) {
        self.start_time = now;
        self.end_time = now + params.duration;
        self.target_points = params.target_points;
    }

    /// Key of this cycle in the history.
    pub fn history_key(&self) -> String {
        cycle_key(self.cycle_number)
    }

    /// Returns whether the normalized chain address is in the paid-set.
    pub fn has_paid(&self, chain_address: &str) -> bool {
        self.paid.contains_key(chain_address)
    }
}
