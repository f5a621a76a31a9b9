#![deny(missing_docs)]
#![deny(unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! # LuckyFive SDK
//!
//! The consistency core of the game: a [`Client`] over a shared
//! [`DocumentStore`](store::DocumentStore), with one `*Ops` trait per
//! concern. Every write goes through a conditional read-modify-write on a
//! single document, so any number of clients may share one store.

/// Error type.
pub mod error;

/// Clock.
pub mod clock;

/// Document stores.
pub mod store;

/// Client options.
pub mod options;

/// Client.
pub mod client;

/// Operations.
pub mod ops;

/// Subscriptions.
pub mod subscription;

/// Rate/anomaly guard.
pub mod guard;

/// Game session.
pub mod game;

/// Wallet provider.
pub mod wallet;

pub use crate::{
    client::Client,
    error::Error,
    options::{ClientOptions, GuardOptions},
    subscription::Subscription,
};

pub use luckyfive_model as model;

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
