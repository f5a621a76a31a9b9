use std::future::Future;

use futures_util::{stream, StreamExt, TryStreamExt};
use luckyfive_model::{Cycle, Player};

use crate::{
    store::{paths, Commit, Decision, DocumentStore, DocumentStoreExt, MAX_TRANSACTION_ATTEMPTS},
    Error,
};

const RESET_CONCURRENCY: usize = 16;

/// Outcome of a rollover.
#[derive(Debug, Clone)]
pub enum Rollover {
    /// This call advanced the cycle.
    Advanced {
        /// The archived cycle.
        archived: Cycle,
        /// The new current cycle.
        current: Cycle,
    },
    /// The expected cycle was no longer current.
    AlreadyAdvanced,
}

/// Cycle manager operations.
pub trait CycleOps {
    /// Get the current cycle, creating the first one or rolling over an
    /// expired or completed one.
    fn current_cycle(&self) -> impl Future<Output = crate::Result<Cycle>> + Send;

    /// Read the stored current cycle as is.
    fn peek_cycle(&self) -> impl Future<Output = crate::Result<Option<Cycle>>> + Send;

    /// Replace cycle `expected` with its successor.
    ///
    /// Does nothing if `expected` is no longer the current cycle, so racing
    /// callers advance the cycle exactly once.
    fn rollover(&self, expected: u64) -> impl Future<Output = crate::Result<Rollover>> + Send;

    /// Archived cycles, most recent first.
    fn cycle_history(&self) -> impl Future<Output = crate::Result<Vec<Cycle>>> + Send;

    /// Reset every player still stamped with a cycle before `cycle_number`.
    ///
    /// Returns the number of players reset by this call.
    fn reset_players_for_cycle(
        &self,
        cycle_number: u64,
    ) -> impl Future<Output = crate::Result<usize>> + Send;
}

impl<S: DocumentStore> CycleOps for crate::Client<S> {
    async fn current_cycle(&self) -> crate::Result<Cycle> {
        let params = self.options().cycle_params();
        for _ in 0..MAX_TRANSACTION_ATTEMPTS {
            let now = self.now();
            let (cycle, created) = self
                .store()
                .transaction(paths::CURRENT_CYCLE, |current: Option<Cycle>| {
                    Ok(match current {
                        Some(cycle) => Decision::Abort((cycle, false)),
                        None => {
                            let first = Cycle::first(now, &params);
                            Decision::Write(first.clone(), (first, true))
                        }
                    })
                })
                .await?;
            if created {
                tracing::info!(cycle = cycle.cycle_number, end = %cycle.end_time, "cycle created");
            }
            if !cycle.is_over(now) {
                return Ok(cycle);
            }
            tracing::info!(
                cycle = cycle.cycle_number,
                expired = cycle.is_expired(now),
                "cycle is over"
            );
            if let Rollover::Advanced { current, .. } = self.rollover(cycle.cycle_number).await? {
                return Ok(current);
            }
        }
        Err(Error::Contention(paths::CURRENT_CYCLE.to_string()))
    }

    async fn peek_cycle(&self) -> crate::Result<Option<Cycle>> {
        self.store().get_as(paths::CURRENT_CYCLE).await
    }

    async fn rollover(&self, expected: u64) -> crate::Result<Rollover> {
        let params = self.options().cycle_params();
        let mut snapshot = self.store().get(paths::CURRENT_CYCLE).await?;
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let cycle = snapshot
                .value
                .take()
                .map(serde_json::from_value::<Cycle>)
                .transpose()?;
            let Some(expiring) = cycle.filter(|cycle| cycle.cycle_number == expected) else {
                tracing::debug!(expected, "cycle already advanced");
                return Ok(Rollover::AlreadyAdvanced);
            };

            // The archive must exist before the successor becomes visible.
            let archived = self.archive_cycle(&expiring).await?;
            let current = expiring.successor(self.now(), &params);
            let value = serde_json::to_value(&current)?;
            match self
                .store()
                .put_if(paths::CURRENT_CYCLE, &snapshot.revision, Some(value))
                .await?
            {
                Commit::Committed(_) => {
                    let reset = self.reset_players_for_cycle(current.cycle_number).await?;
                    tracing::info!(
                        archived = archived.cycle_number,
                        current = current.cycle_number,
                        winners = archived.winners.len(),
                        reset,
                        "cycle rolled over"
                    );
                    return Ok(Rollover::Advanced { archived, current });
                }
                Commit::Conflict(latest) => {
                    tracing::debug!(expected, attempt, "rollover conflict, retrying");
                    snapshot = latest;
                }
            }
        }
        Err(Error::Contention(paths::CURRENT_CYCLE.to_string()))
    }

    async fn cycle_history(&self) -> crate::Result<Vec<Cycle>> {
        let mut history = self
            .store()
            .list_as::<Cycle>(paths::CYCLE_HISTORY)
            .await?
            .into_iter()
            .map(|(_, cycle)| cycle)
            .collect::<Vec<_>>();
        history.sort_by(|a, b| b.cycle_number.cmp(&a.cycle_number));
        Ok(history)
    }

    async fn reset_players_for_cycle(&self, cycle_number: u64) -> crate::Result<usize> {
        let now = self.now();
        let stale = self
            .store()
            .list_as::<Player>(paths::USERS)
            .await?
            .into_iter()
            .filter(|(_, player)| player.cycle_number < cycle_number)
            .map(|(wallet_address, _)| wallet_address)
            .collect::<Vec<_>>();
        stream::iter(stale)
            .map(|wallet_address| async move {
                self.store()
                    .transaction(&paths::user(&wallet_address), |current: Option<Player>| {
                        let Some(mut player) = current else {
                            return Ok(Decision::Abort(false));
                        };
                        Ok(if player.reset_for_cycle(cycle_number, now) {
                            Decision::Write(player, true)
                        } else {
                            Decision::Abort(false)
                        })
                    })
                    .await
            })
            .buffer_unordered(RESET_CONCURRENCY)
            .try_fold(0, |count, reset| async move { Ok(count + usize::from(reset)) })
            .await
    }
}

impl<S: DocumentStore> crate::Client<S> {
    /// Write `cycle` to the history, merged with any copy already there.
    async fn archive_cycle(&self, cycle: &Cycle) -> crate::Result<Cycle> {
        let archived = cycle.clone().into_archived();
        self.store()
            .transaction(
                &paths::cycle_history(cycle.cycle_number),
                |existing: Option<Cycle>| {
                    let mut merged = archived.clone();
                    if let Some(existing) = existing {
                        merged.merge_archived(&existing);
                        if merged == existing {
                            return Ok(Decision::Abort(merged));
                        }
                    }
                    Ok(Decision::Write(merged.clone(), merged))
                },
            )
            .await
    }
}
