use std::time::Duration;

use luckyfive_sdk::{
    game::SessionState,
    guard::MemoryGuardStorage,
    model::{ActionClass, RateLimited, ValidationError},
    ops::{LedgerOps, PaymentOps, PlayerOps},
    Error,
};

use crate::core_test::setup::{Harness, TestWallet, PAST_CYCLE_END};

const COOLDOWN: Duration = Duration::from_secs(21);

#[tokio::test]
async fn a_paid_game_is_scored_and_awarded() -> eyre::Result<()> {
    let harness = Harness::new();
    let span = tracing::info_span!("a_paid_game_is_scored_and_awarded");
    let _enter = span.enter();

    let player = harness.player("gamer").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;
    assert_eq!(session.state(), SessionState::Unpaid);

    let wallet = TestWallet::default();
    let record = session.pay(&wallet).await?;
    assert_eq!(
        session.state(),
        SessionState::Ready {
            cycle_number: record.cycle_number
        }
    );

    session.start_with(vec![1, 2, 3, 4, 5]).await?;
    assert!(
        harness
            .client
            .player(&player.wallet_address)
            .await?
            .expect("must exist")
            .game_in_progress
    );

    for (idx, input) in ["1", " 2", "3", "10", "20"].into_iter().enumerate() {
        // Irregular spacing keeps the pattern detector quiet.
        harness.advance(COOLDOWN + Duration::from_millis(137 * idx as u64));
        session.add_number(input)?;
    }
    assert_eq!(
        session.state(),
        SessionState::Playing {
            cycle_number: 1,
            selected: vec![1, 2, 3, 10, 20],
        }
    );

    let outcome = session.submit().await?;
    assert_eq!(outcome.matches, 3);
    assert_eq!(outcome.points, 30);
    assert_eq!(outcome.system_numbers, [1, 2, 3, 4, 5]);
    assert_eq!(outcome.award.player.points, 30);
    assert!(!outcome.award.player.game_in_progress);
    assert_eq!(session.state(), SessionState::Ready { cycle_number: 1 });
    Ok(())
}

#[tokio::test]
async fn games_require_a_payment() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("freeloader").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;

    let err = session.start().await.expect_err("unpaid");
    assert!(matches!(err, Error::PaymentVerificationFailed(_)));

    // A payment recorded elsewhere is picked up.
    harness
        .client
        .record_payment(&player.wallet_address, &eth, "0xabc")
        .await?;
    session.start().await?;
    assert!(matches!(session.state(), SessionState::Playing { .. }));
    Ok(())
}

#[tokio::test]
async fn refused_payments_leave_the_session_unpaid() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("broke").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;
    let err = session
        .pay(TestWallet::refusing())
        .await
        .expect_err("refused");
    assert!(matches!(err, Error::PaymentVerificationFailed(_)));
    assert_eq!(session.state(), SessionState::Unpaid);
    Ok(())
}

#[tokio::test]
async fn invalid_numbers_are_rejected_locally() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("typo").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;

    let err = session.add_number("7").expect_err("not started");
    assert!(matches!(err, Error::GameNotStarted));

    session.pay(TestWallet::default()).await?;
    session.start_with(vec![5, 6, 7, 8, 9]).await?;

    for input in ["abc", "0", "101", "", "4.5"] {
        let err = session.add_number(input).expect_err("invalid");
        assert!(
            matches!(err, Error::Validation(ValidationError::InvalidNumber(_))),
            "{input}: {err}"
        );
    }

    session.add_number("42")?;
    harness.advance(COOLDOWN);
    let err = session.add_number("42").expect_err("duplicate");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::DuplicateNumber(42))
    ));

    let err = session.submit().await.expect_err("incomplete");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::IncompleteSelection {
            expected: 5,
            got: 1
        })
    ));
    Ok(())
}

#[tokio::test]
async fn fast_additions_are_rate_limited() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("speedy").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;
    session.pay(TestWallet::default()).await?;
    session.start().await?;

    session.add_number("1")?;
    harness.advance(Duration::from_millis(300));
    let err = session.add_number("2").expect_err("too fast");
    assert!(matches!(
        err,
        Error::RateLimitExceeded(RateLimited::AddTooFast)
    ));

    harness.advance(Duration::from_secs(1));
    let err = session.add_number("2").expect_err("cooling down");
    assert!(err.is_rate_limited());
    let remaining = session
        .remaining_cooldown(ActionClass::AddNumber)
        .expect("cooling down");
    assert!(remaining <= Duration::from_secs(19));

    harness.advance(remaining);
    session.add_number("2")?;
    Ok(())
}

#[tokio::test]
async fn sessions_do_not_pay_twice_for_a_cycle() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("thrifty").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;
    let wallet = TestWallet::default();

    let first = session.pay(&wallet).await?;
    let second = session.pay(&wallet).await?;
    assert_eq!(wallet.payments(), 1);
    assert_eq!(first.tx_hash, second.tx_hash);
    assert_eq!(
        session.state(),
        SessionState::Ready {
            cycle_number: first.cycle_number
        }
    );
    Ok(())
}

#[tokio::test]
async fn rejected_submissions_do_not_start_the_cooldown() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("eager").await?;
    let eth = harness.eth();
    for _ in 0..20 {
        harness
            .client
            .award_points(&player.wallet_address, 0)
            .await?;
    }

    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;
    session.pay(TestWallet::default()).await?;
    session.start_with(vec![1, 2, 3, 4, 5]).await?;
    for (idx, input) in ["5", "6", "7", "8", "9"].into_iter().enumerate() {
        harness.advance(COOLDOWN + Duration::from_millis(173 * idx as u64));
        session.add_number(input)?;
    }

    let err = session.submit().await.expect_err("window exhausted");
    assert!(matches!(
        err,
        Error::RateLimitExceeded(RateLimited::SubmissionWindow { .. })
    ));
    assert_eq!(session.remaining_cooldown(ActionClass::SubmitGame), None);
    assert!(matches!(session.state(), SessionState::Playing { .. }));

    // Once the window has elapsed the same game goes through.
    harness.advance(Duration::from_secs(200));
    let outcome = session.submit().await?;
    assert_eq!(outcome.matches, 1);
    assert!(session
        .remaining_cooldown(ActionClass::SubmitGame)
        .is_some());
    Ok(())
}

#[tokio::test]
async fn expired_cycles_stop_running_games() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("slowpoke").await?;
    let eth = harness.eth();
    let mut session =
        harness
            .client
            .game_session(&player.wallet_address, &eth, MemoryGuardStorage::default())?;
    session.pay(TestWallet::default()).await?;
    session.start_with(vec![1, 2, 3, 4, 5]).await?;
    for input in ["1", "2", "3", "4", "5"] {
        harness.advance(COOLDOWN);
        session.add_number(input)?;
    }

    harness.advance(PAST_CYCLE_END);
    let err = session.submit().await.expect_err("expired");
    assert!(matches!(err, Error::CycleExpiredMidGame(1)));
    assert_eq!(session.state(), SessionState::Unpaid);

    let stored = harness
        .client
        .player(&player.wallet_address)
        .await?
        .expect("must exist");
    assert_eq!(stored.points, 0);
    assert!(!stored.game_in_progress);

    // The old payment does not carry over.
    let err = session.start().await.expect_err("unpaid");
    assert!(matches!(err, Error::PaymentVerificationFailed(_)));
    Ok(())
}

#[tokio::test]
async fn sessions_validate_their_addresses() -> eyre::Result<()> {
    let harness = Harness::new();
    let err = harness
        .client
        .game_session("not-a-wallet", &harness.eth(), MemoryGuardStorage::default())
        .expect_err("bad wallet");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidWalletAddress(_))
    ));
    let err = harness
        .client
        .game_session(&harness.wallet(), "0xzz", MemoryGuardStorage::default())
        .expect_err("bad payment address");
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidPaymentAddress(_))
    ));
    Ok(())
}
