use std::time::Duration;

use luckyfive_sdk::{
    model::{Period, Place},
    ops::{CycleOps, CycleTick, FeedOps, LedgerOps},
    ClientOptions,
};
use time::macros::datetime;

use crate::core_test::setup::{next_matching, Harness, PAST_CYCLE_END};

#[tokio::test]
async fn leaderboard_feed_follows_awards() -> eyre::Result<()> {
    let harness = Harness::new();
    let alice = harness.player("alice").await?;
    let bob = harness.player("bob").await?;

    let mut feed = harness.client.subscribe_leaderboard(Period::All);
    let initial = next_matching(&mut feed, |_| true).await?;
    assert!(initial.is_empty());

    harness
        .client
        .award_points(&alice.wallet_address, 20)
        .await?;
    harness.client.award_points(&bob.wallet_address, 40).await?;

    let board = next_matching(&mut feed, |board| board.len() == 2).await?;
    assert_eq!(board[0].address, bob.wallet_address);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].address, alice.wallet_address);
    assert_eq!(board[1].rank, 2);
    feed.unsubscribe();
    Ok(())
}

#[tokio::test]
async fn leaderboard_periods_filter_players() -> eyre::Result<()> {
    let harness = Harness::new();
    harness.clock.set(datetime!(2024-05-10 22:00 UTC));
    let low = harness.player("low").await?;
    let old = harness.player("old").await?;
    let fresh = harness.player("fresh").await?;

    harness.client.award_points(&low.wallet_address, 0).await?;
    harness.client.award_points(&old.wallet_address, 30).await?;
    // Past midnight, still within the cycle.
    harness.advance(Duration::from_secs(3 * 60 * 60));
    harness
        .client
        .award_points(&fresh.wallet_address, 10)
        .await?;

    let all = harness.client.leaderboard(Period::All).await?;
    assert_eq!(
        all.iter().map(|e| e.username.as_str()).collect::<Vec<_>>(),
        ["old", "fresh"]
    );

    let today = harness.client.leaderboard(Period::Today).await?;
    assert_eq!(
        today.iter().map(|e| e.username.as_str()).collect::<Vec<_>>(),
        ["fresh"]
    );
    assert_eq!(today[0].rank, 1);

    let week = harness.client.leaderboard(Period::Week).await?;
    assert_eq!(week.len(), 3);
    Ok(())
}

#[tokio::test]
async fn leaderboard_shows_top_five_and_sixth_place() -> eyre::Result<()> {
    let harness = Harness::new();
    let mut players = Vec::new();
    for idx in 0..7u64 {
        let player = harness.player(&format!("p{idx}")).await?;
        harness
            .client
            .award_points(&player.wallet_address, 10 * (idx + 1))
            .await?;
        players.push(player);
    }
    let idle = harness.player("idle").await?;

    let board = harness.client.leaderboard(Period::All).await?;
    assert_eq!(board.len(), 5);
    assert_eq!(board[0].username, "p6");
    assert_eq!(board[4].username, "p2");

    let sixth = harness.client.sixth_place().await?.expect("has a sixth");
    assert_eq!(sixth.username, "p1");
    assert_eq!(sixth.rank, 6);

    let ranked = harness.client.ranked_players().await?;
    assert_eq!(ranked.len(), 8);
    assert_eq!(
        ranked.last().map(|e| e.address.as_str()),
        Some(idle.wallet_address.as_str())
    );
    Ok(())
}

#[tokio::test]
async fn game_stats_aggregate_players() -> eyre::Result<()> {
    let harness = Harness::new();
    let alice = harness.player("alice").await?;
    let bob = harness.player("bob").await?;
    harness.player("carol").await?;

    let mut feed = harness.client.subscribe_game_stats();
    let initial = next_matching(&mut feed, |_| true).await?;
    assert_eq!(initial.total_registered, 3);
    assert_eq!(initial.total_players, 0);

    harness
        .client
        .award_points(&alice.wallet_address, 10)
        .await?;
    harness
        .client
        .award_points(&alice.wallet_address, 20)
        .await?;
    harness.client.award_points(&bob.wallet_address, 15).await?;

    let stats = next_matching(&mut feed, |stats| stats.games_played_today == 3).await?;
    assert_eq!(stats.total_players, 2);
    assert_eq!(stats.total_points, 45);
    assert_eq!(stats.average_points_per_player, 23);
    let top = stats.top_player_today.expect("someone played");
    assert_eq!(top.username, "alice");
    assert_eq!(top.points, 30);
    Ok(())
}

#[tokio::test]
async fn recent_winner_feed_reports_placements() -> eyre::Result<()> {
    let harness = Harness::with_options(ClientOptions::builder().target_points(50).build());
    let player = harness.player("winner").await?;

    let mut feed = harness.client.subscribe_recent_winner();
    assert!(next_matching(&mut feed, |_| true).await?.is_none());

    harness
        .client
        .award_points(&player.wallet_address, 50)
        .await?;
    let alert = next_matching(&mut feed, Option::is_some)
        .await?
        .expect("matched");
    assert_eq!(alert.address, player.wallet_address);
    assert_eq!(alert.place, Place::First);
    assert_eq!(alert.points, 50);
    Ok(())
}

#[tokio::test]
async fn player_and_cycle_feeds_follow_rollovers() -> eyre::Result<()> {
    let harness = Harness::new();
    let player = harness.player("follower").await?;
    harness
        .client
        .award_points(&player.wallet_address, 40)
        .await?;

    let mut player_feed = harness.client.subscribe_player(&player.wallet_address);
    let mut cycle_feed = harness.client.subscribe_current_cycle();
    let mut history_feed = harness.client.subscribe_cycle_history();

    let initial = next_matching(&mut player_feed, |_| true).await?;
    assert_eq!(initial.map(|p| p.points), Some(40));
    assert_eq!(next_matching(&mut cycle_feed, |_| true).await?.cycle_number, 1);
    assert!(next_matching(&mut history_feed, |_| true).await?.is_empty());

    harness.advance(PAST_CYCLE_END);
    harness.client.current_cycle().await?;
    let cycle = next_matching(&mut cycle_feed, |cycle| cycle.cycle_number == 2).await?;
    assert_eq!(cycle.cycle_number, 2);

    let history = next_matching(&mut history_feed, |history| !history.is_empty()).await?;
    assert_eq!(history[0].cycle_number, 1);

    let reset = next_matching(&mut player_feed, |p| {
        p.as_ref().is_some_and(|p| p.cycle_number == 2)
    })
    .await?;
    assert_eq!(reset.map(|p| p.points), Some(0));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn expiry_timer_rolls_the_cycle_over() -> eyre::Result<()> {
    let harness = Harness::new();
    let mut ticks = harness.client.watch_cycle_expiry(Duration::from_secs(1));

    let Some(CycleTick::Active { cycle, remaining }) = ticks.next().await.transpose()? else {
        eyre::bail!("expected an active tick");
    };
    assert_eq!(cycle.cycle_number, 1);
    assert_eq!(remaining, Duration::from_secs(4 * 60 * 60));

    harness.advance(PAST_CYCLE_END);
    let Some(CycleTick::Expired { expired, current }) = ticks.next().await.transpose()? else {
        eyre::bail!("expected an expiry tick");
    };
    assert_eq!(expired, 1);
    assert_eq!(current.cycle_number, 2);

    let Some(CycleTick::Active { cycle, .. }) = ticks.next().await.transpose()? else {
        eyre::bail!("expected an active tick");
    };
    assert_eq!(cycle.cycle_number, 2);
    ticks.unsubscribe();
    Ok(())
}
