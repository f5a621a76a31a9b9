/// Player registry.
pub mod player;

/// Cycle manager.
pub mod cycle;

/// Winner ranking.
pub mod ranking;

/// Points ledger.
pub mod ledger;

/// Payment gate.
pub mod payment;

/// Administrative operations.
pub mod admin;

/// Push feeds.
pub mod feed;

pub use self::{
    admin::AdminOps,
    cycle::{CycleOps, Rollover},
    feed::{CycleTick, FeedOps},
    ledger::{Award, LedgerOps},
    payment::PaymentOps,
    player::PlayerOps,
    ranking::{Placement, RankingOps},
};
