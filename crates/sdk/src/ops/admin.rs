use std::future::Future;

use luckyfive_model::{leaderboard::rank_players, Cycle, PointDeduction};

use crate::{
    ops::{CycleOps, LedgerOps, PlayerOps, Rollover},
    store::{paths, Decision, DocumentStore, DocumentStoreExt},
};

/// Administrative operations.
pub trait AdminOps {
    /// End the current cycle now and start the next one.
    fn force_new_cycle(&self) -> impl Future<Output = crate::Result<Cycle>> + Send;

    /// Restart the timing and target of the current cycle, keeping its number,
    /// winners and paid-set.
    fn reset_current_cycle(&self) -> impl Future<Output = crate::Result<Cycle>> + Send;

    /// Deduct the configured amount from the current leader.
    ///
    /// Returns `None` when no player has points.
    fn deduct_from_leader(
        &self,
    ) -> impl Future<Output = crate::Result<Option<PointDeduction>>> + Send;
}

impl<S: DocumentStore> AdminOps for crate::Client<S> {
    async fn force_new_cycle(&self) -> crate::Result<Cycle> {
        let Some(cycle) = self.peek_cycle().await? else {
            return self.current_cycle().await;
        };
        tracing::info!(cycle = cycle.cycle_number, "forcing a new cycle");
        match self.rollover(cycle.cycle_number).await? {
            Rollover::Advanced { current, .. } => Ok(current),
            Rollover::AlreadyAdvanced => self.current_cycle().await,
        }
    }

    async fn reset_current_cycle(&self) -> crate::Result<Cycle> {
        let current = self.current_cycle().await?;
        let params = self.options().cycle_params();
        let now = self.now();
        let cycle = self
            .store()
            .transaction(paths::CURRENT_CYCLE, |stored: Option<Cycle>| {
                let mut cycle = match stored {
                    Some(cycle) if cycle.cycle_number == current.cycle_number => cycle,
                    _ => return Err(crate::Error::custom("the current cycle changed during reset")),
                };
                cycle.restart(now, &params);
                Ok(Decision::Write(cycle.clone(), cycle))
            })
            .await?;
        tracing::info!(
            cycle = cycle.cycle_number,
            end = %cycle.end_time,
            target = cycle.target_points,
            "cycle timing reset"
        );
        Ok(cycle)
    }

    async fn deduct_from_leader(&self) -> crate::Result<Option<PointDeduction>> {
        let cycle = self.current_cycle().await?;
        let players = self.players().await?;
        let Some(leader) = rank_players(&players, cycle.cycle_number)
            .into_iter()
            .find(|entry| entry.points > 0)
        else {
            tracing::info!(cycle = cycle.cycle_number, "no leader to deduct from");
            return Ok(None);
        };
        let deduction = self
            .deduct_points(&leader.address, self.options().leader_deduction)
            .await?;
        Ok(Some(deduction))
    }
}
