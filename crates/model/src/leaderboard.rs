use std::cmp::Ordering;

use time::{Duration, OffsetDateTime, Time};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{cycle::Place, player::Player};

/// Default leaderboard size.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

/// Default minimum points for the [`Period::All`] leaderboard.
pub const DEFAULT_MIN_POINTS: u64 = 10;

/// Trend between the two most recent games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Trend {
    /// Last game earned more.
    Up,
    /// Last game earned less.
    Down,
    /// Same points.
    Stable,
}

impl Trend {
    /// Trend from `previous` to `last`.
    pub fn between(previous: u64, last: u64) -> Self {
        match last.cmp(&previous) {
            Ordering::Greater => Self::Up,
            Ordering::Less => Self::Down,
            Ordering::Equal => Self::Stable,
        }
    }
}

/// Leaderboard period.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Period {
    /// Everyone above the minimum points.
    #[default]
    All,
    /// Played since the start of the current UTC day.
    Today,
    /// Played during the last week.
    Week,
}

impl Period {
    /// Earliest last-played time included, `None` for no bound.
    pub fn since(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        match self {
            Self::All => None,
            Self::Today => Some(start_of_day(now)),
            Self::Week => Some(start_of_day(now) - Duration::days(7)),
        }
    }
}

/// Start of the UTC day containing `now`.
pub fn start_of_day(now: OffsetDateTime) -> OffsetDateTime {
    now.to_offset(time::UtcOffset::UTC).replace_time(Time::MIDNIGHT)
}

/// A ranked player.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LeaderboardEntry {
    /// Username.
    pub username: String,
    /// Game wallet address.
    pub address: String,
    /// Points in the current cycle.
    pub points: u64,
    /// Rank, from 1.
    pub rank: usize,
    /// Games played.
    pub games_played: u64,
    /// Average points per game.
    pub average_points: f64,
    /// Time of the last game.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub last_played: OffsetDateTime,
    /// Trend.
    pub trend: Trend,
}

impl LeaderboardEntry {
    fn from_player(player: &Player, cycle_number: u64) -> Self {
        let points = player.points_in(cycle_number);
        Self {
            username: player.username.clone(),
            address: player.wallet_address.clone(),
            points,
            rank: 0,
            games_played: player.games_played,
            average_points: points as f64 / player.games_played.max(1) as f64,
            last_played: player.last_played(),
            trend: player.trend(),
        }
    }
}

/// Today's best player.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TopPlayer {
    /// Username.
    pub username: String,
    /// Points.
    pub points: u64,
}

/// Aggregate stats over all players.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GameStats {
    /// Players with points.
    pub total_players: u64,
    /// Registered players.
    pub total_registered: u64,
    /// Sum of points.
    pub total_points: u64,
    /// `total_points / total_players`, rounded.
    pub average_points_per_player: u64,
    /// Best player among those who played today.
    pub top_player_today: Option<TopPlayer>,
    /// Games recorded since the start of the day.
    pub games_played_today: u64,
}

/// A winner notification for the recent-winner feed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WinnerAlert {
    /// Username.
    pub username: String,
    /// Game wallet address.
    pub address: String,
    /// Points when placed.
    pub points: u64,
    /// Slot taken.
    pub place: Place,
    /// Cycle of the placement.
    pub cycle_number: u64,
    /// Placement time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

/// Rank every player by points in `cycle_number`, highest first.
///
/// Ties are ordered by address.
pub fn rank_players<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    cycle_number: u64,
) -> Vec<LeaderboardEntry> {
    let mut entries = players
        .into_iter()
        .map(|player| LeaderboardEntry::from_player(player, cycle_number))
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.address.cmp(&b.address))
    });
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = idx + 1;
    }
    entries
}

/// The top `size` players of `period`.
///
/// [`Period::All`] only counts players with at least `min_points`.
pub fn leaderboard<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    period: Period,
    cycle_number: u64,
    now: OffsetDateTime,
    size: usize,
    min_points: u64,
) -> Vec<LeaderboardEntry> {
    let since = period.since(now);
    let mut entries = rank_players(players, cycle_number)
        .into_iter()
        .filter(|entry| match since {
            Some(since) => entry.last_played >= since,
            None => entry.points >= min_points,
        })
        .take(size)
        .collect::<Vec<_>>();
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = idx + 1;
    }
    entries
}

/// The player just outside the top five, among players with points.
pub fn sixth_place<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    cycle_number: u64,
) -> Option<LeaderboardEntry> {
    rank_players(players, cycle_number)
        .into_iter()
        .filter(|entry| entry.points > 0)
        .nth(DEFAULT_LEADERBOARD_SIZE)
        .map(|mut entry| {
            entry.rank = DEFAULT_LEADERBOARD_SIZE + 1;
            entry
        })
}

/// Aggregate stats.
pub fn game_stats<'a>(
    players: impl IntoIterator<Item = &'a Player>,
    cycle_number: u64,
    now: OffsetDateTime,
) -> GameStats {
    let today = start_of_day(now);
    let mut stats = GameStats::default();
    for player in players {
        let points = player.points_in(cycle_number);
        stats.total_registered += 1;
        stats.total_points += points;
        if points > 0 {
            stats.total_players += 1;
        }
        let games_today = player
            .game_history
            .iter()
            .filter(|record| record.timestamp >= today)
            .count() as u64;
        stats.games_played_today += games_today;
        let played_today = player.last_updated.is_some_and(|at| at >= today);
        if played_today
            && stats
                .top_player_today
                .as_ref()
                .map_or(true, |top| points > top.points)
        {
            stats.top_player_today = Some(TopPlayer {
                username: player.username.clone(),
                points,
            });
        }
    }
    if stats.total_players > 0 {
        stats.average_points_per_player =
            (stats.total_points as f64 / stats.total_players as f64).round() as u64;
    }
    stats
}

/// The most recent alert.
pub fn recent_winner<'a>(alerts: impl IntoIterator<Item = &'a WinnerAlert>) -> Option<WinnerAlert> {
    alerts
        .into_iter()
        .max_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.cycle_number.cmp(&b.cycle_number))
                .then_with(|| a.place.cmp(&b.place))
        })
        .cloned()
}
