use luckyfive_sdk::ops::{CycleOps, PaymentOps};
use serde_json::json;

use crate::config::DisplayOptions;

/// Entry payment commands.
#[derive(Debug, clap::Args)]
pub struct Payment {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Record an entry payment for the current cycle.
    Record {
        /// Game wallet address of the player.
        wallet: String,
        /// Address the payment was made from.
        eth: String,
        /// Transaction of the payment.
        tx: String,
    },
    /// Check whether an address has paid for a cycle.
    Check {
        /// Address the payment was made from.
        eth: String,
        /// Cycle number, defaults to the current cycle.
        #[arg(long)]
        cycle: Option<u64>,
    },
}

impl super::Command for Payment {
    fn is_client_required(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let client = ctx.client()?;
        let output = client.output();
        match &self.command {
            Command::Record { wallet, eth, tx } => {
                let record = client.record_payment(wallet, eth, tx).await?;
                println!(
                    "{}",
                    output.display_one(
                        json!({
                            "cycle_number": record.cycle_number,
                            "wallet_address": record.wallet_address,
                            "eth_address": record.eth_address,
                            "amount": record.amount,
                            "tx_hash": record.tx_hash,
                            "timestamp": super::format_time(record.timestamp),
                        }),
                        DisplayOptions::table_projection([
                            ("cycle_number", "Cycle"),
                            ("wallet_address", "Wallet"),
                            ("eth_address", "Payment Address"),
                            ("amount", "Amount"),
                            ("tx_hash", "Transaction"),
                            ("timestamp", "Time"),
                        ]),
                    )?
                );
            }
            Command::Check { eth, cycle } => {
                let cycle_number = match cycle {
                    Some(cycle_number) => *cycle_number,
                    None => client.current_cycle().await?.cycle_number,
                };
                let paid = client.has_valid_payment(eth, cycle_number).await?;
                println!("{}", output.display_value_with_label("paid", paid)?);
            }
        }
        Ok(())
    }
}
