use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use luckyfive_sdk::{
    clock::ManualClock,
    game::{GameOutcome, GameSession},
    guard::{GuardStorage, MemoryGuardStorage},
    ops::{CycleOps, FeedOps, PlayerOps},
    store::{DocumentStore, MemoryStore},
    wallet::WalletProvider,
    Client, Error,
};
use serde_json::json;
use time::OffsetDateTime;

use crate::config::DisplayOptions;

/// Play simulated games against an in-memory store.
///
/// Time is simulated, so a run covering several cycles finishes at once.
#[derive(Debug, clap::Args)]
pub struct Simulate {
    /// Number of players.
    #[arg(long, default_value_t = 8)]
    players: usize,
    /// Games per player.
    #[arg(long, default_value_t = 20)]
    games: usize,
    /// Override the target points.
    #[arg(long)]
    target_points: Option<u64>,
}

/// Pays instantly with made-up transactions.
#[derive(Debug, Default)]
struct SimulatedWallet {
    seq: AtomicU64,
}

impl WalletProvider for SimulatedWallet {
    async fn pay(&self, _amount: &str, _receiver: &str) -> luckyfive_sdk::Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("0x{seq:064x}"))
    }
}

/// Advances the clock past the guard cooldown with an irregular spacing.
struct Pacer {
    clock: ManualClock,
    step: u64,
}

impl Pacer {
    fn tick(&mut self) {
        self.step += 1;
        let jitter = Duration::from_millis((self.step * 311) % 1000);
        self.clock.advance(Duration::from_secs(21) + jitter);
    }
}

fn simulated_wallet(idx: usize) -> String {
    format!("rSim{}", format!("{:022}", idx + 1).replace('0', "z"))
}

fn pick_numbers() -> Vec<String> {
    let mut rng = rand::thread_rng();
    rand::seq::index::sample(&mut rng, 100, 5)
        .iter()
        .map(|idx| (idx + 1).to_string())
        .collect()
}

async fn play_game<S, G>(
    session: &mut GameSession<S, G>,
    wallet: &SimulatedWallet,
    pacer: &mut Pacer,
) -> luckyfive_sdk::Result<GameOutcome>
where
    S: DocumentStore,
    G: GuardStorage,
{
    if !session.refresh_payment().await? {
        session.pay(wallet).await?;
    }
    session.start().await?;
    for input in pick_numbers() {
        pacer.tick();
        session.add_number(&input)?;
    }
    pacer.tick();
    session.submit().await
}

#[derive(Debug, Default)]
struct Tally {
    games: u64,
    placements: u64,
    expired: u64,
    throttled: u64,
}

impl super::Command for Simulate {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let mut options = ctx.config().options()?;
        if let Some(target_points) = self.target_points {
            options.target_points = target_points;
        }
        let output = ctx.config().output();
        let clock = ManualClock::new(OffsetDateTime::now_utc());
        let client =
            Client::new_with_options(MemoryStore::new(), options).with_clock(clock.clone());
        let mut pacer = Pacer { clock, step: 0 };
        let wallet = SimulatedWallet::default();

        let mut sessions = Vec::with_capacity(self.players);
        for idx in 0..self.players {
            let address = simulated_wallet(idx);
            client
                .register_player(&format!("player{}", idx + 1), &address)
                .await?;
            let eth = format!("0x{:040x}", idx + 1);
            sessions.push(client.game_session(&address, &eth, MemoryGuardStorage::default())?);
        }

        let mut tally = Tally::default();
        for _ in 0..self.games {
            for session in sessions.iter_mut() {
                match play_game(session, &wallet, &mut pacer).await {
                    Ok(outcome) => {
                        tally.games += 1;
                        if let Some(placement) = outcome.award.placement {
                            tally.placements += 1;
                            tracing::info!(
                                wallet_address = %session.wallet_address(),
                                place = %placement.place,
                                cycle = placement.cycle_number,
                                "simulated player placed"
                            );
                        }
                    }
                    Err(Error::CycleExpiredMidGame(cycle)) => {
                        tally.expired += 1;
                        tracing::debug!(cycle, "simulated game outlived its cycle");
                    }
                    Err(err) if err.is_rate_limited() => {
                        tally.throttled += 1;
                        tracing::debug!(%err, "simulated game throttled");
                        session.cancel().await?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        let cycle = client.current_cycle().await?;
        println!(
            "{}",
            output.display_one(
                json!({
                    "games": tally.games,
                    "placements": tally.placements,
                    "expired": tally.expired,
                    "throttled": tally.throttled,
                    "cycle_number": cycle.cycle_number,
                }),
                DisplayOptions::table_projection([
                    ("games", "Games"),
                    ("placements", "Placements"),
                    ("expired", "Expired Mid-Game"),
                    ("throttled", "Throttled"),
                    ("cycle_number", "Current Cycle"),
                ]),
            )?
        );
        let ranked = client.ranked_players().await?;
        println!(
            "{}",
            output.display_many(
                ranked.iter().map(super::leaderboard_row),
                super::leaderboard_projection(),
            )?
        );
        let history = client.cycle_history().await?;
        println!(
            "{}",
            output.display_many(
                history.iter().map(|cycle| super::cycle_row(cycle, None)),
                super::cycle_projection(false),
            )?
        );
        Ok(())
    }
}
