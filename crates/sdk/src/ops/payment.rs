use std::future::Future;

use luckyfive_model::{
    cycle::cycle_key, validation::normalize_payment_address, Cycle, PaidEntry, PaymentRecord,
    Player, ValidationError,
};

use crate::{
    ops::{CycleOps, PlayerOps},
    store::{paths, Decision, DocumentStore, DocumentStoreExt},
    wallet::WalletProvider,
    Error,
};

/// Payment gate operations.
pub trait PaymentOps {
    /// Record the entry payment of a player for the current cycle.
    ///
    /// `tx_hash` is not checked against chain state. Recording twice in the
    /// same cycle returns the first record.
    fn record_payment(
        &self,
        wallet_address: &str,
        chain_address: &str,
        tx_hash: &str,
    ) -> impl Future<Output = crate::Result<PaymentRecord>> + Send;

    /// Returns whether `chain_address` has paid for `cycle_number`.
    ///
    /// Only the live, unexpired cycle can have valid payments.
    fn has_valid_payment(
        &self,
        chain_address: &str,
        cycle_number: u64,
    ) -> impl Future<Output = crate::Result<bool>> + Send;

    /// Pay the entry amount through `wallet`, record it and verify it.
    ///
    /// A player who already paid for the current cycle gets the existing
    /// record and `wallet` is not charged again.
    ///
    /// Every failure is reported as [`Error::PaymentVerificationFailed`].
    fn pay_and_verify<W: WalletProvider>(
        &self,
        wallet_address: &str,
        chain_address: &str,
        wallet: W,
    ) -> impl Future<Output = crate::Result<PaymentRecord>> + Send;
}

impl<S: DocumentStore> PaymentOps for crate::Client<S> {
    async fn record_payment(
        &self,
        wallet_address: &str,
        chain_address: &str,
        tx_hash: &str,
    ) -> crate::Result<PaymentRecord> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(ValidationError::EmptyTransaction.into());
        }
        let chain_address = normalize_payment_address(chain_address)?;
        let cycle = self.current_cycle().await?;
        let cycle_number = cycle.cycle_number;
        let now = self.now();
        let amount = self.options().entry_amount.clone();

        let record = self
            .store()
            .transaction(&paths::user(wallet_address), |current: Option<Player>| {
                let mut player =
                    current.ok_or_else(|| Error::PlayerNotFound(wallet_address.to_string()))?;
                let reset = player.reset_for_cycle(cycle_number, now);
                if let Some(existing) = player.payment_for(cycle_number) {
                    let existing = existing.clone();
                    return Ok(if reset {
                        Decision::Write(player, existing)
                    } else {
                        Decision::Abort(existing)
                    });
                }
                let record = PaymentRecord {
                    tx_hash: tx_hash.to_string(),
                    amount: amount.clone(),
                    timestamp: now,
                    cycle_number,
                    eth_address: chain_address.clone(),
                    wallet_address: wallet_address.to_string(),
                };
                player.eth_address = Some(chain_address.clone());
                player
                    .payments
                    .insert(cycle_key(cycle_number), record.clone());
                Ok(Decision::Write(player, record))
            })
            .await?;

        let entry = PaidEntry {
            wallet_address: wallet_address.to_string(),
            tx_hash: record.tx_hash.clone(),
            timestamp: record.timestamp,
        };
        self.store()
            .transaction(paths::CURRENT_CYCLE, |current: Option<Cycle>| {
                let mut cycle = match current {
                    Some(cycle) if cycle.cycle_number == cycle_number => cycle,
                    _ => {
                        return Err(Error::PaymentVerificationFailed(format!(
                            "cycle {cycle_number} ended while recording the payment"
                        )))
                    }
                };
                if cycle.has_paid(&chain_address) {
                    return Ok(Decision::Abort(()));
                }
                cycle.paid.insert(chain_address.clone(), entry.clone());
                Ok(Decision::Write(cycle, ()))
            })
            .await?;

        tracing::info!(
            %wallet_address,
            %chain_address,
            cycle = cycle_number,
            tx = %record.tx_hash,
            "payment recorded"
        );
        Ok(record)
    }

    async fn has_valid_payment(&self, chain_address: &str, cycle_number: u64) -> crate::Result<bool> {
        let chain_address = normalize_payment_address(chain_address)?;
        let Some(cycle) = self.peek_cycle().await? else {
            return Ok(false);
        };
        if cycle.cycle_number != cycle_number || cycle.is_expired(self.now()) {
            return Ok(false);
        }
        if cycle.has_paid(&chain_address) {
            return Ok(true);
        }
        let found = self.players().await?.iter().any(|player| {
            player
                .payment_for(cycle_number)
                .is_some_and(|record| record.eth_address == chain_address)
        });
        Ok(found)
    }

    async fn pay_and_verify<W: WalletProvider>(
        &self,
        wallet_address: &str,
        chain_address: &str,
        wallet: W,
    ) -> crate::Result<PaymentRecord> {
        let verified: crate::Result<PaymentRecord> = async {
            let cycle = self.current_cycle().await?;
            let player = self
                .player(wallet_address)
                .await?
                .ok_or_else(|| Error::PlayerNotFound(wallet_address.to_string()))?;
            if let Some(existing) = player.payment_for(cycle.cycle_number) {
                tracing::info!(
                    %wallet_address,
                    cycle = cycle.cycle_number,
                    tx = %existing.tx_hash,
                    "already paid for this cycle"
                );
                return Ok(existing.clone());
            }
            let options = self.options();
            let tx_hash = wallet
                .pay(&options.entry_amount, &options.payment_receiver)
                .await?;
            let record = self
                .record_payment(wallet_address, chain_address, &tx_hash)
                .await?;
            if !self
                .has_valid_payment(&record.eth_address, record.cycle_number)
                .await?
            {
                return Err(Error::PaymentVerificationFailed(format!(
                    "no payment found for cycle {}",
                    record.cycle_number
                )));
            }
            Ok(record)
        }
        .await;
        verified.map_err(|err| {
            tracing::warn!(%wallet_address, %err, "payment flow failed");
            match err {
                Error::PaymentVerificationFailed(_) => err,
                other => Error::PaymentVerificationFailed(other.to_string()),
            }
        })
    }
}
