use std::future::Future;

use luckyfive_model::{Cycle, Place, Player, Winner, WinnerAlert};

use crate::{
    ops::CycleOps,
    store::{paths, Decision, DocumentStore, DocumentStoreExt},
};

/// A winner slot taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Slot taken.
    pub place: Place,
    /// Cycle of the slot.
    pub cycle_number: u64,
}

enum Ranked {
    Placed(Placement),
    Missed,
    Full(u64),
}

/// Winner ranking operations.
pub trait RankingOps {
    /// Place `player` if `total` reaches the target of its cycle.
    ///
    /// Fills the first empty slot of the current cycle. Filling the third
    /// slot rolls the cycle over. The same player may take several slots.
    fn check_and_rank(
        &self,
        player: &Player,
        total: u64,
    ) -> impl Future<Output = crate::Result<Option<Placement>>> + Send;
}

impl<S: DocumentStore> RankingOps for crate::Client<S> {
    async fn check_and_rank(&self, player: &Player, total: u64) -> crate::Result<Option<Placement>> {
        let now = self.now();
        let ranked = self
            .store()
            .transaction(paths::CURRENT_CYCLE, |current: Option<Cycle>| {
                let Some(mut cycle) = current else {
                    return Ok(Decision::Abort(Ranked::Missed));
                };
                if cycle.cycle_number != player.cycle_number
                    || cycle.is_expired(now)
                    || total < cycle.target_points
                {
                    return Ok(Decision::Abort(Ranked::Missed));
                }
                let winner = Winner {
                    username: player.username.clone(),
                    address: player.wallet_address.clone(),
                    timestamp: now,
                };
                let Some(place) = cycle.winners.assign(winner) else {
                    return Ok(Decision::Abort(Ranked::Full(cycle.cycle_number)));
                };
                let placement = Placement {
                    place,
                    cycle_number: cycle.cycle_number,
                };
                Ok(Decision::Write(cycle, Ranked::Placed(placement)))
            })
            .await?;

        let placement = match ranked {
            Ranked::Placed(placement) => placement,
            Ranked::Missed => return Ok(None),
            Ranked::Full(cycle_number) => {
                tracing::debug!(cycle = cycle_number, "winner slots already full");
                self.rollover(cycle_number).await?;
                return Ok(None);
            }
        };

        tracing::info!(
            address = %player.wallet_address,
            place = %placement.place,
            cycle = placement.cycle_number,
            points = total,
            "winner placed"
        );
        let alert = WinnerAlert {
            username: player.username.clone(),
            address: player.wallet_address.clone(),
            points: total,
            place: placement.place,
            cycle_number: placement.cycle_number,
            timestamp: now,
        };
        self.store().push_as(paths::WINNERS, &alert).await?;

        if placement.place == Place::Third {
            self.rollover(placement.cycle_number).await?;
        }
        Ok(Some(placement))
    }
}
