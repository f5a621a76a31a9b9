use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Proof that a wallet paid the entry amount for one cycle.
///
/// The transaction hash is an opaque client-asserted proof; it is never
/// checked against chain state here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PaymentRecord {
    /// Transaction identifier returned by the wallet.
    pub tx_hash: String,
    /// Amount paid, as a decimal string in the chain's native unit.
    pub amount: String,
    /// Recording time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// The cycle this payment is scoped to.
    pub cycle_number: u64,
    /// Normalized payer chain address.
    pub eth_address: String,
    /// Game wallet of the payer.
    pub wallet_address: String,
}

/// Audit entry for an administrative point deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PointDeduction {
    /// Affected player.
    pub wallet_address: String,
    /// Username at deduction time.
    pub username: String,
    /// Requested deduction.
    pub requested: u64,
    /// Actually deducted, lower than `requested` when clamped at zero.
    pub deducted: u64,
    /// Points before the deduction.
    pub previous_points: u64,
    /// Cycle during which the deduction happened.
    pub cycle_number: u64,
    /// Deduction time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl PointDeduction {
    /// Returns whether the deduction was clamped at zero.
    pub fn is_clamped(&self) -> bool {
        self.deducted < self.requested
    }
}
