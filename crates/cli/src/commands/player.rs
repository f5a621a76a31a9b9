use eyre::OptionExt;
use luckyfive_sdk::{
    game::GameOutcome,
    guard::MemoryGuardStorage,
    model::ActionClass,
    ops::{FeedOps, PlayerOps},
    wallet::WalletProvider,
};
use serde_json::json;

use crate::config::DisplayOptions;

/// Player commands.
#[derive(Debug, clap::Args)]
pub struct Player {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Register a player.
    Register {
        /// Username.
        username: String,
        /// Game wallet address.
        wallet: String,
    },
    /// Show a player.
    Show {
        /// Game wallet address.
        wallet: String,
    },
    /// List all players.
    List,
    /// Play one game.
    Play {
        /// Game wallet address.
        wallet: String,
        /// Address the entry payment is made from.
        #[arg(long)]
        eth: String,
        /// Transaction to record as the entry payment if the current cycle is unpaid.
        #[arg(long)]
        tx: Option<String>,
        /// The five numbers, each in 1..=100.
        #[arg(num_args = 5, required = true)]
        numbers: Vec<String>,
    },
}

/// A payment made outside of this program.
struct ExternalPayment<'a>(&'a str);

impl WalletProvider for ExternalPayment<'_> {
    async fn pay(&self, amount: &str, receiver: &str) -> luckyfive_sdk::Result<String> {
        tracing::info!(%amount, %receiver, tx = %self.0, "recording the provided entry payment");
        Ok(self.0.to_string())
    }
}

fn outcome_row(outcome: &GameOutcome) -> serde_json::Value {
    json!({
        "user_numbers": outcome.user_numbers,
        "system_numbers": outcome.system_numbers,
        "matches": outcome.matches,
        "points": outcome.points,
        "total": outcome.award.player.points,
        "place": outcome.award.placement.map(|p| p.place.to_string()),
    })
}

impl super::Command for Player {
    fn is_client_required(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let client = ctx.client()?;
        let output = client.output();
        match &self.command {
            Command::Register { username, wallet } => {
                let player = client.register_player(username, wallet).await?;
                println!(
                    "{}",
                    output.display_one(super::player_row(&player), super::player_projection())?
                );
            }
            Command::Show { wallet } => {
                let player = client
                    .player(wallet)
                    .await?
                    .ok_or_eyre("player not found")?;
                println!(
                    "{}",
                    output.display_one(super::player_row(&player), super::player_projection())?
                );
            }
            Command::List => {
                let players = client.ranked_players().await?;
                println!(
                    "{}",
                    output.display_many(
                        players.iter().map(super::leaderboard_row),
                        super::leaderboard_projection(),
                    )?
                );
            }
            Command::Play {
                wallet,
                eth,
                tx,
                numbers,
            } => {
                let mut session =
                    client.game_session(wallet, eth, MemoryGuardStorage::default())?;
                if !session.refresh_payment().await? {
                    let tx = tx.as_deref().ok_or_eyre(
                        "the current cycle is unpaid, pass `--tx` to record the entry payment",
                    )?;
                    session.pay(ExternalPayment(tx)).await?;
                }
                session.start().await?;
                for input in numbers {
                    if let Some(remaining) = session.remaining_cooldown(ActionClass::AddNumber) {
                        tracing::info!(
                            "cooling down for {}",
                            humantime::format_duration(remaining)
                        );
                        tokio::time::sleep(remaining).await;
                    }
                    let number = session.add_number(input)?;
                    tracing::info!(number, "number added");
                }
                let outcome = session.submit().await?;
                println!(
                    "{}",
                    output.display_one(
                        outcome_row(&outcome),
                        DisplayOptions::table_projection([
                            ("user_numbers", "Your Numbers"),
                            ("system_numbers", "Drawn"),
                            ("matches", "Matches"),
                            ("points", "Points"),
                            ("total", "Total"),
                            ("place", "Place"),
                        ]),
                    )?
                );
            }
        }
        Ok(())
    }
}
