use std::time::Duration;

use luckyfive_sdk::ops::{AdminOps, CycleOps, CycleTick, FeedOps};
use serde_json::json;

use crate::config::DisplayOptions;

/// Cycle commands.
#[derive(Debug, clap::Args)]
pub struct Cycle {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Show the current cycle, rolling it over if it has ended.
    Show,
    /// List archived cycles, newest first.
    History,
    /// End the current cycle now and start the next one.
    ForceNew,
    /// Restart the timing of the current cycle.
    ResetTiming,
    /// Watch the cycle timer, rolling the cycle over when it ends.
    Watch {
        /// Tick period.
        #[arg(long, default_value = "1s")]
        period: humantime::Duration,
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<usize>,
    },
}

impl super::Command for Cycle {
    fn is_client_required(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let client = ctx.client()?;
        let output = client.output();
        match &self.command {
            Command::Show => {
                let cycle = client.current_cycle().await?;
                println!(
                    "{}",
                    output.display_one(
                        super::cycle_row(&cycle, Some(client.now())),
                        super::cycle_projection(true),
                    )?
                );
            }
            Command::History => {
                let history = client.cycle_history().await?;
                println!(
                    "{}",
                    output.display_many(
                        history.iter().map(|cycle| super::cycle_row(cycle, None)),
                        super::cycle_projection(false),
                    )?
                );
            }
            Command::ForceNew => {
                let cycle = client.force_new_cycle().await?;
                println!(
                    "{}",
                    output.display_one(
                        super::cycle_row(&cycle, Some(client.now())),
                        super::cycle_projection(true),
                    )?
                );
            }
            Command::ResetTiming => {
                let cycle = client.reset_current_cycle().await?;
                println!(
                    "{}",
                    output.display_one(
                        super::cycle_row(&cycle, Some(client.now())),
                        super::cycle_projection(true),
                    )?
                );
            }
            Command::Watch { period, ticks } => {
                let mut stream = client.watch_cycle_expiry(Duration::from(*period));
                let mut seen = 0;
                while ticks.map_or(true, |ticks| seen < ticks) {
                    let Some(tick) = stream.next().await.transpose()? else {
                        break;
                    };
                    seen += 1;
                    let row = match tick {
                        CycleTick::Active { cycle, remaining } => json!({
                            "event": "active",
                            "cycle_number": cycle.cycle_number,
                            "remaining": super::format_remaining(remaining),
                        }),
                        CycleTick::Expired { expired, current } => json!({
                            "event": "expired",
                            "cycle_number": current.cycle_number,
                            "expired": expired,
                        }),
                    };
                    println!(
                        "{}",
                        output.display_one(
                            row,
                            DisplayOptions::table_projection([
                                ("event", "Event"),
                                ("cycle_number", "Cycle"),
                                ("remaining", "Remaining"),
                                ("expired", "Expired"),
                            ]),
                        )?
                    );
                }
            }
        }
        Ok(())
    }
}
