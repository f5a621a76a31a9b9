use std::future::Future;

use luckyfive_model::{Player, PointDeduction, SubmissionWindow};
use time::OffsetDateTime;

use crate::{
    ops::{CycleOps, Placement, PlayerOps, RankingOps},
    store::{paths, Decision, DocumentStore, DocumentStoreExt},
    Error,
};

/// Result of an award.
#[derive(Debug, Clone)]
pub struct Award {
    /// The player after the award.
    pub player: Player,
    /// Points awarded.
    pub points: u64,
    /// Winner slot taken by the award, if any.
    pub placement: Option<Placement>,
}

/// Points ledger operations.
///
/// These are the only writers of player points.
pub trait LedgerOps {
    /// Add `points` to a player and run the ranking protocol.
    ///
    /// Points, games played and history change in one conditional write.
    /// Fails with [`Error::RateLimitExceeded`] once the submission window is
    /// exhausted.
    fn award_points(
        &self,
        wallet_address: &str,
        points: u64,
    ) -> impl Future<Output = crate::Result<Award>> + Send;

    /// Remove up to `amount` points from a player and record an audit entry.
    ///
    /// Points never go below zero.
    fn deduct_points(
        &self,
        wallet_address: &str,
        amount: u64,
    ) -> impl Future<Output = crate::Result<PointDeduction>> + Send;
}

impl<S: DocumentStore> LedgerOps for crate::Client<S> {
    async fn award_points(&self, wallet_address: &str, points: u64) -> crate::Result<Award> {
        let cycle = self.current_cycle().await?;
        if self.player(wallet_address).await?.is_none() {
            return Err(Error::PlayerNotFound(wallet_address.to_string()));
        }

        let now = self.now();
        let options = self.options();
        let (limit, window) = (options.submission_limit, options.submission_window);
        let accepted = self
            .store()
            .transaction(
                &paths::rate_limit(wallet_address),
                |current: Option<SubmissionWindow>| {
                    let mut submissions = current.unwrap_or_else(|| SubmissionWindow::open(now));
                    Ok(match submissions.try_record(now, limit, window) {
                        Ok(()) => Decision::Write(submissions, Ok(())),
                        Err(err) => Decision::Abort(Err(err)),
                    })
                },
            )
            .await?;
        if let Err(err) = accepted {
            tracing::warn!(%wallet_address, %err, "award rejected");
            return Err(err.into());
        }

        let awarded = self
            .store()
            .transaction(&paths::user(wallet_address), |current: Option<Player>| {
                let mut player =
                    current.ok_or_else(|| Error::PlayerNotFound(wallet_address.to_string()))?;
                player.reset_for_cycle(cycle.cycle_number, now);
                player.record_game(points, now);
                Ok(Decision::Write(player.clone(), player))
            })
            .await;
        let player = match awarded {
            Ok(player) => player,
            Err(err) => {
                tracing::warn!(%wallet_address, %err, "award failed, releasing its submission");
                self.release_submission(wallet_address, now).await;
                return Err(err);
            }
        };
        tracing::debug!(
            %wallet_address,
            points,
            total = player.points,
            cycle = player.cycle_number,
            "points awarded"
        );

        let placement = self.check_and_rank(&player, player.points).await?;
        Ok(Award {
            player,
            points,
            placement,
        })
    }

    async fn deduct_points(
        &self,
        wallet_address: &str,
        amount: u64,
    ) -> crate::Result<PointDeduction> {
        let cycle = self.current_cycle().await?;
        let now = self.now();
        let deduction = self
            .store()
            .transaction(&paths::user(wallet_address), |current: Option<Player>| {
                let mut player =
                    current.ok_or_else(|| Error::PlayerNotFound(wallet_address.to_string()))?;
                player.reset_for_cycle(cycle.cycle_number, now);
                let previous_points = player.points;
                let deducted = amount.min(previous_points);
                player.points = previous_points - deducted;
                let deduction = PointDeduction {
                    wallet_address: player.wallet_address.clone(),
                    username: player.username.clone(),
                    requested: amount,
                    deducted,
                    previous_points,
                    cycle_number: cycle.cycle_number,
                    timestamp: now,
                };
                Ok(Decision::Write(player, deduction))
            })
            .await?;
        if deduction.is_clamped() {
            tracing::warn!(
                %wallet_address,
                requested = deduction.requested,
                deducted = deduction.deducted,
                "deduction clamped at zero"
            );
        } else {
            tracing::info!(%wallet_address, deducted = deduction.deducted, "points deducted");
        }
        self.store()
            .push_as(paths::POINT_DEDUCTIONS, &deduction)
            .await?;
        Ok(deduction)
    }
}

impl<S: DocumentStore> crate::Client<S> {
    async fn release_submission(&self, wallet_address: &str, recorded_at: OffsetDateTime) {
        let released = self
            .store()
            .transaction(
                &paths::rate_limit(wallet_address),
                |current: Option<SubmissionWindow>| {
                    Ok(match current {
                        Some(mut submissions) => {
                            if submissions.release(recorded_at) {
                                Decision::Write(submissions, ())
                            } else {
                                Decision::Abort(())
                            }
                        }
                        None => Decision::Abort(()),
                    })
                },
            )
            .await;
        if let Err(err) = released {
            tracing::warn!(%wallet_address, %err, "failed to release a submission");
        }
    }
}
