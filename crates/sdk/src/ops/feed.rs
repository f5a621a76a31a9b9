use std::{future::Future, time::Duration};

use luckyfive_model::{leaderboard, Cycle, GameStats, LeaderboardEntry, Period, Player, WinnerAlert};
use tokio::time::MissedTickBehavior;

use crate::{
    ops::{CycleOps, PlayerOps},
    store::{paths, DocumentStore, DocumentStoreExt},
    subscription::{projected, Subscription},
    Client,
};

/// A tick of the cycle expiry timer.
#[derive(Debug, Clone)]
pub enum CycleTick {
    /// The cycle is running.
    Active {
        /// The current cycle.
        cycle: Cycle,
        /// Time left.
        remaining: Duration,
    },
    /// The cycle observed on the previous tick has been superseded.
    Expired {
        /// Number of the superseded cycle.
        expired: u64,
        /// The new current cycle.
        current: Cycle,
    },
}

/// Read-side queries and push feeds.
///
/// Every `subscribe_*` feed yields the current value first, then a fresh
/// value after each committed change it depends on.
pub trait FeedOps {
    /// Top players of `period`.
    fn leaderboard(
        &self,
        period: Period,
    ) -> impl Future<Output = crate::Result<Vec<LeaderboardEntry>>> + Send;

    /// Every player, ranked.
    fn ranked_players(&self) -> impl Future<Output = crate::Result<Vec<LeaderboardEntry>>> + Send;

    /// Aggregate stats.
    fn game_stats(&self) -> impl Future<Output = crate::Result<GameStats>> + Send;

    /// The most recent winner alert.
    fn recent_winner(&self) -> impl Future<Output = crate::Result<Option<WinnerAlert>>> + Send;

    /// The player just outside the top five.
    fn sixth_place(
        &self,
    ) -> impl Future<Output = crate::Result<Option<LeaderboardEntry>>> + Send;

    /// Feed of [`FeedOps::leaderboard`].
    fn subscribe_leaderboard(&self, period: Period) -> Subscription<Vec<LeaderboardEntry>>;

    /// Feed of [`FeedOps::ranked_players`].
    fn subscribe_ranked_players(&self) -> Subscription<Vec<LeaderboardEntry>>;

    /// Feed of [`FeedOps::game_stats`].
    fn subscribe_game_stats(&self) -> Subscription<GameStats>;

    /// Feed of [`FeedOps::recent_winner`].
    fn subscribe_recent_winner(&self) -> Subscription<Option<WinnerAlert>>;

    /// Feed of the current cycle.
    fn subscribe_current_cycle(&self) -> Subscription<Cycle>;

    /// Feed of the cycle history, most recent first.
    fn subscribe_cycle_history(&self) -> Subscription<Vec<Cycle>>;

    /// Feed of one player.
    fn subscribe_player(&self, wallet_address: &str) -> Subscription<Option<Player>>;

    /// Check the current cycle every `period`, rolling it over once it is over.
    ///
    /// The first tick is immediate.
    fn watch_cycle_expiry(&self, period: Duration) -> Subscription<CycleTick>;
}

impl<S: DocumentStore + 'static> FeedOps for Client<S> {
    async fn leaderboard(&self, period: Period) -> crate::Result<Vec<LeaderboardEntry>> {
        let cycle = self.current_cycle().await?;
        let players = self.players().await?;
        let options = self.options();
        Ok(leaderboard::leaderboard(
            &players,
            period,
            cycle.cycle_number,
            self.now(),
            options.leaderboard_size,
            options.leaderboard_min_points,
        ))
    }

    async fn ranked_players(&self) -> crate::Result<Vec<LeaderboardEntry>> {
        let cycle = self.current_cycle().await?;
        let players = self.players().await?;
        Ok(leaderboard::rank_players(&players, cycle.cycle_number))
    }

    async fn game_stats(&self) -> crate::Result<GameStats> {
        let cycle = self.current_cycle().await?;
        let players = self.players().await?;
        Ok(leaderboard::game_stats(&players, cycle.cycle_number, self.now()))
    }

    async fn recent_winner(&self) -> crate::Result<Option<WinnerAlert>> {
        let alerts = self.store().list_as::<WinnerAlert>(paths::WINNERS).await?;
        Ok(leaderboard::recent_winner(alerts.iter().map(|(_, alert)| alert)))
    }

    async fn sixth_place(&self) -> crate::Result<Option<LeaderboardEntry>> {
        let cycle = self.current_cycle().await?;
        let players = self.players().await?;
        Ok(leaderboard::sixth_place(&players, cycle.cycle_number))
    }

    fn subscribe_leaderboard(&self, period: Period) -> Subscription<Vec<LeaderboardEntry>> {
        projected(
            self.clone(),
            vec![paths::USERS.to_string(), paths::CURRENT_CYCLE.to_string()],
            move |client| async move { client.leaderboard(period).await },
        )
    }

    fn subscribe_ranked_players(&self) -> Subscription<Vec<LeaderboardEntry>> {
        projected(
            self.clone(),
            vec![paths::USERS.to_string(), paths::CURRENT_CYCLE.to_string()],
            |client| async move { client.ranked_players().await },
        )
    }

    fn subscribe_game_stats(&self) -> Subscription<GameStats> {
        projected(
            self.clone(),
            vec![paths::USERS.to_string(), paths::CURRENT_CYCLE.to_string()],
            |client| async move { client.game_stats().await },
        )
    }

    fn subscribe_recent_winner(&self) -> Subscription<Option<WinnerAlert>> {
        projected(
            self.clone(),
            vec![paths::WINNERS.to_string()],
            |client| async move { client.recent_winner().await },
        )
    }

    fn subscribe_current_cycle(&self) -> Subscription<Cycle> {
        projected(
            self.clone(),
            vec![paths::CURRENT_CYCLE.to_string()],
            |client| async move { client.current_cycle().await },
        )
    }

    fn subscribe_cycle_history(&self) -> Subscription<Vec<Cycle>> {
        projected(
            self.clone(),
            vec![paths::CYCLE_HISTORY.to_string()],
            |client| async move { client.cycle_history().await },
        )
    }

    fn subscribe_player(&self, wallet_address: &str) -> Subscription<Option<Player>> {
        let path = paths::user(wallet_address);
        let wallet_address = wallet_address.to_string();
        projected(self.clone(), vec![path], move |client| {
            let wallet_address = wallet_address.clone();
            async move { client.player(&wallet_address).await }
        })
    }

    fn watch_cycle_expiry(&self, period: Duration) -> Subscription<CycleTick> {
        let client = self.clone();
        let stream = async_stream::try_stream! {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = None;
            loop {
                interval.tick().await;
                let cycle = client.current_cycle().await?;
                let tick = match last.replace(cycle.cycle_number) {
                    Some(expired) if expired != cycle.cycle_number => {
                        tracing::info!(expired, current = cycle.cycle_number, "cycle expired");
                        CycleTick::Expired {
                            expired,
                            current: cycle,
                        }
                    }
                    _ => CycleTick::Active {
                        remaining: cycle.remaining(client.now()),
                        cycle,
                    },
                };
                yield tick;
            }
        };
        Subscription::new(stream)
    }
}
