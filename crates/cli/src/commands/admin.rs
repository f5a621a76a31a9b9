use luckyfive_sdk::{
    model::PointDeduction,
    ops::{AdminOps, LedgerOps},
};
use serde_json::json;

use crate::config::DisplayOptions;

/// Administrative commands.
#[derive(Debug, clap::Args)]
pub struct Admin {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Deduct the configured amount from the current leader.
    DeductLeader,
    /// Deduct points from a player.
    Deduct {
        /// Game wallet address.
        wallet: String,
        /// Points to deduct.
        amount: u64,
    },
}

fn display(output: crate::config::OutputFormat, deduction: &PointDeduction) -> eyre::Result<String> {
    output.display_one(
        json!({
            "username": deduction.username,
            "wallet_address": deduction.wallet_address,
            "requested": deduction.requested,
            "deducted": deduction.deducted,
            "previous_points": deduction.previous_points,
            "cycle_number": deduction.cycle_number,
        }),
        DisplayOptions::table_projection([
            ("username", "Player"),
            ("wallet_address", "Wallet"),
            ("requested", "Requested"),
            ("deducted", "Deducted"),
            ("previous_points", "Previous"),
            ("cycle_number", "Cycle"),
        ]),
    )
}

impl super::Command for Admin {
    fn is_client_required(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let client = ctx.client()?;
        let output = client.output();
        match &self.command {
            Command::DeductLeader => match client.deduct_from_leader().await? {
                Some(deduction) => println!("{}", display(output, &deduction)?),
                None => tracing::info!("no player has points"),
            },
            Command::Deduct { wallet, amount } => {
                let deduction = client.deduct_points(wallet, *amount).await?;
                println!("{}", display(output, &deduction)?);
            }
        }
        Ok(())
    }
}
