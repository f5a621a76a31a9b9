use std::time::Duration;

use luckyfive_sdk::{
    model::{Cycle, PointDeduction, RateLimited, SubmissionWindow},
    ops::{CycleOps, FeedOps, LedgerOps, PlayerOps},
    store::{paths, DocumentStoreExt},
    Error,
};

use crate::core_test::setup::Harness;

#[tokio::test]
async fn points_are_the_sum_of_awards() -> eyre::Result<()> {
    let harness = Harness::new();
    let span = tracing::info_span!("points_are_the_sum_of_awards");
    let _enter = span.enter();

    let player = harness.player("alice").await?;
    let deltas = [10, 0, 30, 50, 20];
    for delta in deltas {
        harness.advance(Duration::from_secs(3));
        let award = harness
            .client
            .award_points(&player.wallet_address, delta)
            .await?;
        assert_eq!(award.points, delta);
        assert!(award.placement.is_none());
    }

    let player = harness
        .client
        .player(&player.wallet_address)
        .await?
        .expect("must exist");
    assert_eq!(player.points, deltas.iter().sum::<u64>());
    assert_eq!(player.games_played, deltas.len() as u64);
    assert_eq!(player.game_history.len(), deltas.len());
    assert_eq!(
        player
            .game_history
            .iter()
            .map(|record| record.points)
            .collect::<Vec<_>>(),
        deltas
    );
    assert!(!player.game_in_progress);
    Ok(())
}

#[tokio::test]
async fn awards_to_unknown_players_fail() -> eyre::Result<()> {
    let harness = Harness::new();
    let wallet = harness.wallet();
    let err = harness
        .client
        .award_points(&wallet, 10)
        .await
        .expect_err("must fail");
    assert!(matches!(err, Error::PlayerNotFound(address) if address == wallet));
    Ok(())
}

#[tokio::test]
async fn twenty_first_award_in_window_is_rejected() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("bob").await?;
    let wallet = &player.wallet_address;

    for _ in 0..20 {
        harness.client.award_points(wallet, 10).await?;
        harness.advance(Duration::from_secs(1));
    }
    let err = harness
        .client
        .award_points(wallet, 10)
        .await
        .expect_err("must be rate limited");
    assert!(err.is_rate_limited());
    assert!(matches!(
        err,
        Error::RateLimitExceeded(RateLimited::SubmissionWindow { limit: 20, .. })
    ));

    // Rejected awards leave the player untouched.
    let stored = harness.client.player(wallet).await?.expect("must exist");
    assert_eq!(stored.points, 200);
    assert_eq!(stored.games_played, 20);

    // 20s have passed since the first award.
    harness.advance(Duration::from_secs(5 * 60 + 1 - 20));
    let award = harness.client.award_points(wallet, 10).await?;
    assert_eq!(award.player.points, 210);
    Ok(())
}

#[tokio::test]
async fn failed_awards_give_back_their_submission() -> eyre::Result<()> {
    let harness = Harness::faulty();
    let player = harness.player("unlucky").await?;
    let wallet = player.wallet_address.as_str();
    harness.client.award_points(wallet, 10).await?;

    harness.store.fail_writes(&paths::user(wallet), 1);
    let failed = harness.client.award_points(wallet, 10).await;
    assert!(matches!(failed, Err(Error::Store(_))), "{failed:?}");
    let submissions = harness
        .store
        .get_as::<SubmissionWindow>(&paths::rate_limit(wallet))
        .await?
        .expect("must exist");
    assert_eq!(submissions.count, 1);

    let award = harness.client.award_points(wallet, 10).await?;
    assert_eq!(award.player.points, 20);
    assert_eq!(award.player.games_played, 2);
    Ok(())
}

#[tokio::test]
async fn windows_are_per_player() -> eyre::Result<()> {
    let harness = Harness::new();
    let alice = harness.player("alice").await?;
    let bob = harness.player("bob").await?;
    for _ in 0..20 {
        harness
            .client
            .award_points(&alice.wallet_address, 10)
            .await?;
    }
    assert!(harness
        .client
        .award_points(&alice.wallet_address, 10)
        .await
        .is_err());
    harness.client.award_points(&bob.wallet_address, 10).await?;
    Ok(())
}

#[tokio::test]
async fn stale_points_are_reset_before_an_award() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("carol").await?;
    harness
        .client
        .award_points(&player.wallet_address, 50)
        .await?;

    // Advance the cycle without resetting players.
    let cycle = harness.client.current_cycle().await?;
    let next = cycle.successor(harness.client.now(), &harness.client.options().cycle_params());
    harness
        .store
        .set_as::<Cycle>(paths::CURRENT_CYCLE, &next)
        .await?;

    let ranked = harness.client.ranked_players().await?;
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].points, 0);

    let award = harness
        .client
        .award_points(&player.wallet_address, 10)
        .await?;
    assert_eq!(award.player.points, 10);
    assert_eq!(award.player.cycle_number, next.cycle_number);
    assert_eq!(award.player.games_played, 2);
    Ok(())
}

#[tokio::test]
async fn deductions_saturate_at_zero() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("dave").await?;
    let wallet = &player.wallet_address;
    harness.client.award_points(wallet, 30).await?;

    let deduction = harness.client.deduct_points(wallet, 1000).await?;
    assert_eq!(deduction.previous_points, 30);
    assert_eq!(deduction.deducted, 30);
    assert!(deduction.is_clamped());
    assert_eq!(
        harness.client.player(wallet).await?.expect("must exist").points,
        0
    );

    let audit = harness
        .store
        .list_as::<PointDeduction>(paths::POINT_DEDUCTIONS)
        .await?;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].1, deduction);
    Ok(())
}
