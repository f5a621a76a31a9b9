use luckyfive_sdk::{
    model::ValidationError,
    ops::{AdminOps, CycleOps, PaymentOps, PlayerOps},
    Error,
};

use crate::core_test::setup::{Harness, TestWallet, PAST_CYCLE_END};

#[tokio::test]
async fn recorded_payments_are_valid_for_the_live_cycle_only() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();

    let record = harness
        .client
        .record_payment(&player.wallet_address, &eth, "0xabc")
        .await?;
    assert_eq!(record.cycle_number, 1);
    assert_eq!(record.amount, "0.003");
    assert_eq!(record.eth_address, eth);

    assert!(harness.client.has_valid_payment(&eth, 1).await?);
    assert!(!harness.client.has_valid_payment(&eth, 0).await?);
    assert!(!harness.client.has_valid_payment(&eth, 2).await?);
    assert!(!harness.client.has_valid_payment(&harness.eth(), 1).await?);

    let cycle = harness.client.current_cycle().await?;
    let paid = cycle.paid.get(&eth).expect("in the paid-set");
    assert_eq!(paid.wallet_address, player.wallet_address);
    assert_eq!(paid.tx_hash, "0xabc");

    let stored = harness
        .client
        .player(&player.wallet_address)
        .await?
        .expect("must exist");
    assert_eq!(stored.eth_address.as_deref(), Some(eth.as_str()));
    assert_eq!(stored.payment_for(1), Some(&record));
    Ok(())
}

#[tokio::test]
async fn payments_fail_closed_on_expiry() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();
    harness
        .client
        .record_payment(&player.wallet_address, &eth, "0xabc")
        .await?;

    // No read has rolled the cycle over yet.
    harness.advance(PAST_CYCLE_END);
    assert!(!harness.client.has_valid_payment(&eth, 1).await?);

    let cycle = harness.client.current_cycle().await?;
    assert_eq!(cycle.cycle_number, 2);
    assert!(!harness.client.has_valid_payment(&eth, 1).await?);
    assert!(!harness.client.has_valid_payment(&eth, 2).await?);
    Ok(())
}

#[tokio::test]
async fn addresses_are_matched_case_insensitively() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = "0x4B2CD2688CC3A86AFF6254C8512B2FC969008093";
    harness
        .client
        .record_payment(&player.wallet_address, eth, "0xabc")
        .await?;
    assert!(
        harness
            .client
            .has_valid_payment(&eth.to_lowercase(), 1)
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn recording_twice_keeps_the_first_record() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();
    let first = harness
        .client
        .record_payment(&player.wallet_address, &eth, "0x01")
        .await?;
    let second = harness
        .client
        .record_payment(&player.wallet_address, &eth, "0x02")
        .await?;
    assert_eq!(first, second);
    assert_eq!(second.tx_hash, "0x01");
    Ok(())
}

#[tokio::test]
async fn malformed_payments_are_rejected() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();

    let err = harness
        .client
        .record_payment(&player.wallet_address, &eth, "  ")
        .await
        .expect_err("empty transaction");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::EmptyTransaction)
    ));

    let err = harness
        .client
        .record_payment(&player.wallet_address, "0x1234", "0xabc")
        .await
        .expect_err("short address");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidPaymentAddress(_))
    ));

    let err = harness
        .client
        .record_payment(&harness.wallet(), &eth, "0xabc")
        .await
        .expect_err("unknown player");
    assert!(matches!(err, Error::PlayerNotFound(_)));
    assert!(!harness.client.has_valid_payment(&eth, 1).await?);
    Ok(())
}

#[tokio::test]
async fn pay_and_verify_records_the_payment() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();
    let wallet = TestWallet::default();

    let record = harness
        .client
        .pay_and_verify(&player.wallet_address, &eth, &wallet)
        .await?;
    assert_eq!(wallet.payments(), 1);
    assert!(
        harness
            .client
            .has_valid_payment(&eth, record.cycle_number)
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn paying_twice_in_a_cycle_charges_once() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();
    let wallet = TestWallet::default();

    let first = harness
        .client
        .pay_and_verify(&player.wallet_address, &eth, &wallet)
        .await?;
    let second = harness
        .client
        .pay_and_verify(&player.wallet_address, &eth, &wallet)
        .await?;
    assert_eq!(wallet.payments(), 1);
    assert_eq!(first, second);

    harness.advance(PAST_CYCLE_END);
    let next = harness
        .client
        .pay_and_verify(&player.wallet_address, &eth, &wallet)
        .await?;
    assert_eq!(wallet.payments(), 2);
    assert_eq!(next.cycle_number, first.cycle_number + 1);
    Ok(())
}

#[tokio::test]
async fn refused_payments_fail_verification() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();

    let err = harness
        .client
        .pay_and_verify(&player.wallet_address, &eth, TestWallet::refusing())
        .await
        .expect_err("refused");
    assert!(matches!(err, Error::PaymentVerificationFailed(_)));
    assert!(!harness.client.has_valid_payment(&eth, 1).await?);
    Ok(())
}

#[tokio::test]
async fn forced_rollover_moves_payments_to_history() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("payer").await?;
    let eth = harness.eth();
    harness
        .client
        .record_payment(&player.wallet_address, &eth, "0xabc")
        .await?;
    harness.client.force_new_cycle().await?;

    let stored = harness
        .client
        .player(&player.wallet_address)
        .await?
        .expect("must exist");
    assert!(stored.payment_for(1).is_none());
    assert!(stored.payment_history.contains_key("cycle_1"));
    assert!(!harness.client.has_valid_payment(&eth, 2).await?);
    Ok(())
}
