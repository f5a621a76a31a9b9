use std::future::Future;

use luckyfive_model::{
    validation::{validate_username, validate_wallet_address},
    Player,
};

use crate::{
    ops::CycleOps,
    store::{paths, Decision, DocumentStore, DocumentStoreExt},
    Error,
};

/// Operations on player records.
pub trait PlayerOps {
    /// Register a player. An existing profile is returned unchanged.
    fn register_player(
        &self,
        username: &str,
        wallet_address: &str,
    ) -> impl Future<Output = crate::Result<Player>> + Send;

    /// Get a player.
    fn player(
        &self,
        wallet_address: &str,
    ) -> impl Future<Output = crate::Result<Option<Player>>> + Send;

    /// Get every player.
    fn players(&self) -> impl Future<Output = crate::Result<Vec<Player>>> + Send;

    /// Set or clear the in-progress flag.
    fn set_game_in_progress(
        &self,
        wallet_address: &str,
        in_progress: bool,
    ) -> impl Future<Output = crate::Result<Player>> + Send;
}

impl<S: DocumentStore> PlayerOps for crate::Client<S> {
    async fn register_player(&self, username: &str, wallet_address: &str) -> crate::Result<Player> {
        let username = validate_username(username)?;
        let wallet_address = validate_wallet_address(wallet_address)?;
        let cycle = self.current_cycle().await?;
        let now = self.now();
        let (player, created) = self
            .store()
            .transaction(&paths::user(wallet_address), |current: Option<Player>| {
                Ok(match current {
                    Some(existing) => Decision::Abort((existing, false)),
                    None => {
                        let player =
                            Player::new(username, wallet_address, cycle.cycle_number, now);
                        Decision::Write(player.clone(), (player, true))
                    }
                })
            })
            .await?;
        if created {
            tracing::info!(%wallet_address, %username, cycle = cycle.cycle_number, "player registered");
        } else {
            tracing::debug!(%wallet_address, "player already registered");
        }
        Ok(player)
    }

    async fn player(&self, wallet_address: &str) -> crate::Result<Option<Player>> {
        self.store().get_as(&paths::user(wallet_address)).await
    }

    async fn players(&self) -> crate::Result<Vec<Player>> {
        let players = self.store().list_as::<Player>(paths::USERS).await?;
        Ok(players.into_iter().map(|(_, player)| player).collect())
    }

    async fn set_game_in_progress(
        &self,
        wallet_address: &str,
        in_progress: bool,
    ) -> crate::Result<Player> {
        self.store()
            .transaction(&paths::user(wallet_address), |current: Option<Player>| {
                let mut player =
                    current.ok_or_else(|| Error::PlayerNotFound(wallet_address.to_string()))?;
                if player.game_in_progress == in_progress {
                    return Ok(Decision::Abort(player));
                }
                player.game_in_progress = in_progress;
                Ok(Decision::Write(player.clone(), player))
            })
            .await
    }
}
