use std::time::Duration;

use luckyfive_sdk::{
    model::{Cycle, Place},
    ops::{AdminOps, CycleOps, FeedOps, LedgerOps, PaymentOps, PlayerOps, Rollover},
    store::{paths, DocumentStoreExt},
    ClientOptions, Error,
};

use crate::core_test::setup::{Harness, PAST_CYCLE_END, T0};

#[tokio::test]
async fn first_read_creates_the_first_cycle() -> eyre::Result<()> {
    let harness = Harness::new();
    assert!(harness.client.peek_cycle().await?.is_none());

    let cycle = harness.client.current_cycle().await?;
    assert_eq!(cycle.cycle_number, 1);
    assert_eq!(cycle.target_points, 2000);
    assert_eq!(cycle.start_time, T0);
    assert_eq!(cycle.end_time, T0 + Duration::from_secs(4 * 60 * 60));
    assert!(cycle.winners.is_empty());
    assert!(!cycle.completed);

    harness.advance(Duration::from_secs(60));
    assert_eq!(harness.client.current_cycle().await?, cycle);
    assert!(harness.client.cycle_history().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_rollovers_advance_once() -> eyre::Result<()> {
    let harness = Harness::new();
    let first = harness.client.current_cycle().await?;
    harness.advance(PAST_CYCLE_END);

    let (a, b) = tokio::join!(
        harness.client.current_cycle(),
        harness.client.current_cycle()
    );
    let (a, b) = (a?, b?);
    assert_eq!(a.cycle_number, first.cycle_number + 1);
    assert_eq!(a, b);

    let history = harness.client.cycle_history().await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].cycle_number, first.cycle_number);
    assert!(history[0].completed);

    assert!(matches!(
        harness.client.rollover(first.cycle_number).await?,
        Rollover::AlreadyAdvanced
    ));
    assert_eq!(
        harness.client.current_cycle().await?.cycle_number,
        first.cycle_number + 1
    );
    Ok(())
}

#[tokio::test]
async fn spawned_rollovers_advance_once() -> eyre::Result<()> {
    let harness = Harness::new();
    harness.client.current_cycle().await?;
    harness.advance(PAST_CYCLE_END);

    let tasks = (0..8)
        .map(|_| {
            let client = harness.client.clone();
            tokio::spawn(async move { client.rollover(1).await })
        })
        .collect::<Vec<_>>();
    let mut advanced = 0;
    for task in tasks {
        if let Rollover::Advanced { current, .. } = task.await?? {
            assert_eq!(current.cycle_number, 2);
            advanced += 1;
        }
    }
    assert_eq!(advanced, 1);
    assert_eq!(harness.client.cycle_history().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn expiry_archives_winners_and_resets_players() -> eyre::Result<()> {
    let harness = Harness::with_options(ClientOptions::builder().target_points(50).build());
    let alice = harness.player("alice").await?;
    let bob = harness.player("bob").await?;
    let eth = harness.eth();
    harness
        .client
        .record_payment(&bob.wallet_address, &eth, "0xfeed")
        .await?;
    harness
        .client
        .award_points(&alice.wallet_address, 50)
        .await?;
    harness.client.award_points(&bob.wallet_address, 20).await?;
    let before = harness.client.current_cycle().await?;
    assert_eq!(
        before.winners.get(Place::First).map(|w| w.address.as_str()),
        Some(alice.wallet_address.as_str())
    );

    harness.advance(PAST_CYCLE_END);
    // Any read performs the rollover.
    let ranked = harness.client.ranked_players().await?;
    assert!(ranked.iter().all(|entry| entry.points == 0));

    let history = harness.client.cycle_history().await?;
    assert_eq!(history.len(), 1);
    let archived = &history[0];
    assert_eq!(archived.cycle_number, 1);
    assert!(archived.completed);
    assert_eq!(archived.winners, before.winners);
    assert_eq!(archived.paid, before.paid);

    let current = harness.client.current_cycle().await?;
    assert_eq!(current.cycle_number, 2);
    assert!(current.winners.is_empty());
    assert!(current.paid.is_empty());
    assert_eq!(current.start_time, T0 + PAST_CYCLE_END);

    let bob = harness
        .client
        .player(&bob.wallet_address)
        .await?
        .expect("must exist");
    assert_eq!(bob.points, 0);
    assert_eq!(bob.cycle_number, 2);
    assert!(bob.payments.is_empty());
    assert!(bob.payment_history.contains_key("cycle_1"));
    assert_eq!(bob.games_played, 1);
    Ok(())
}

#[tokio::test]
async fn failed_archive_write_keeps_the_expired_cycle_current() -> eyre::Result<()> {
    let harness = Harness::faulty();
    let alice = harness.player("alice").await?;
    harness
        .client
        .award_points(&alice.wallet_address, 2000)
        .await?;
    let before = harness.client.current_cycle().await?;
    assert_eq!(before.winners.len(), 1);

    harness.advance(PAST_CYCLE_END);
    harness.store.fail_writes(paths::CYCLE_HISTORY, 1);
    let failed = harness.client.current_cycle().await;
    assert!(matches!(failed, Err(Error::Store(_))), "{failed:?}");
    assert_eq!(
        harness.client.peek_cycle().await?.map(|cycle| cycle.cycle_number),
        Some(1)
    );
    assert!(harness.client.cycle_history().await?.is_empty());

    let current = harness.client.current_cycle().await?;
    assert_eq!(current.cycle_number, 2);
    let history = harness.client.cycle_history().await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].cycle_number, 1);
    assert!(history[0].completed);
    assert_eq!(history[0].winners, before.winners);
    Ok(())
}

#[tokio::test]
async fn history_is_most_recent_first() -> eyre::Result<()> {
    let harness = Harness::new();
    for _ in 0..3 {
        harness.client.current_cycle().await?;
        harness.advance(PAST_CYCLE_END);
    }
    let current = harness.client.current_cycle().await?;
    assert_eq!(current.cycle_number, 4);
    let numbers = harness
        .client
        .cycle_history()
        .await?
        .iter()
        .map(|cycle| cycle.cycle_number)
        .collect::<Vec<_>>();
    assert_eq!(numbers, [3, 2, 1]);
    Ok(())
}

#[tokio::test]
async fn admin_can_force_and_reset_cycles() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("erin").await?;
    harness
        .client
        .award_points(&player.wallet_address, 40)
        .await?;

    let forced = harness.client.force_new_cycle().await?;
    assert_eq!(forced.cycle_number, 2);
    assert_eq!(
        harness
            .client
            .player(&player.wallet_address)
            .await?
            .expect("must exist")
            .points,
        0
    );

    harness.advance(Duration::from_secs(60 * 60));
    let reset = harness.client.reset_current_cycle().await?;
    assert_eq!(reset.cycle_number, 2);
    assert_eq!(reset.start_time, T0 + Duration::from_secs(60 * 60));
    assert_eq!(reset.end_time, reset.start_time + Duration::from_secs(4 * 60 * 60));
    assert_eq!(
        harness.store.get_as::<Cycle>(paths::CURRENT_CYCLE).await?,
        Some(reset)
    );
    Ok(())
}

#[tokio::test]
async fn leader_deduction_targets_the_leader() -> eyre::Result<()> {
    let harness = Harness::new();
    assert!(harness.client.deduct_from_leader().await?.is_none());

    let alice = harness.player("alice").await?;
    let bob = harness.player("bob").await?;
    for _ in 0..3 {
        harness
            .client
            .award_points(&alice.wallet_address, 50)
            .await?;
    }
    harness.client.award_points(&bob.wallet_address, 40).await?;

    let deduction = harness
        .client
        .deduct_from_leader()
        .await?
        .expect("has a leader");
    assert_eq!(deduction.wallet_address, alice.wallet_address);
    assert_eq!(deduction.requested, 1000);
    assert_eq!(deduction.deducted, 150);
    Ok(())
}
