use luckyfive_sdk::{model::Period, ops::FeedOps};
use serde_json::json;

use crate::config::DisplayOptions;

/// Leaderboard and stats.
#[derive(Debug, clap::Args)]
pub struct Leaderboard {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Top players of a period.
    Top {
        #[arg(long, value_enum, default_value_t)]
        period: Period,
    },
    /// Every player, ranked.
    All,
    /// Aggregate stats.
    Stats,
    /// The player just outside the leaderboard.
    Sixth,
    /// The most recent winner.
    Recent,
    /// Follow the leaderboard.
    Watch {
        #[arg(long, value_enum, default_value_t)]
        period: Period,
        /// Stop after this many updates.
        #[arg(long)]
        updates: Option<usize>,
    },
}

impl super::Command for Leaderboard {
    fn is_client_required(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let client = ctx.client()?;
        let output = client.output();
        match &self.command {
            Command::Top { period } => {
                let board = client.leaderboard(*period).await?;
                println!(
                    "{}",
                    output.display_many(
                        board.iter().map(super::leaderboard_row),
                        super::leaderboard_projection(),
                    )?
                );
            }
            Command::All => {
                let ranked = client.ranked_players().await?;
                println!(
                    "{}",
                    output.display_many(
                        ranked.iter().map(super::leaderboard_row),
                        super::leaderboard_projection(),
                    )?
                );
            }
            Command::Stats => {
                let stats = client.game_stats().await?;
                println!(
                    "{}",
                    output.display_one(
                        json!({
                            "total_players": stats.total_players,
                            "total_registered": stats.total_registered,
                            "total_points": stats.total_points,
                            "average_points_per_player": stats.average_points_per_player,
                            "games_played_today": stats.games_played_today,
                            "top_player_today": stats.top_player_today.map(|top| {
                                format!("{} ({})", top.username, top.points)
                            }),
                        }),
                        DisplayOptions::table_projection([
                            ("total_players", "Players"),
                            ("total_registered", "Registered"),
                            ("total_points", "Points"),
                            ("average_points_per_player", "Average"),
                            ("games_played_today", "Games Today"),
                            ("top_player_today", "Top Today"),
                        ]),
                    )?
                );
            }
            Command::Sixth => match client.sixth_place().await? {
                Some(entry) => println!(
                    "{}",
                    output.display_one(
                        super::leaderboard_row(&entry),
                        super::leaderboard_projection()
                    )?
                ),
                None => println!("{}", output.display_value_with_label("sixth", None::<()>)?),
            },
            Command::Recent => match client.recent_winner().await? {
                Some(alert) => println!(
                    "{}",
                    output.display_one(
                        json!({
                            "username": alert.username,
                            "address": alert.address,
                            "points": alert.points,
                            "place": alert.place.to_string(),
                            "cycle_number": alert.cycle_number,
                            "timestamp": super::format_time(alert.timestamp),
                        }),
                        DisplayOptions::table_projection([
                            ("username", "Player"),
                            ("address", "Wallet"),
                            ("points", "Points"),
                            ("place", "Place"),
                            ("cycle_number", "Cycle"),
                            ("timestamp", "Time"),
                        ]),
                    )?
                ),
                None => println!("{}", output.display_value_with_label("winner", None::<()>)?),
            },
            Command::Watch { period, updates } => {
                let mut feed = client.subscribe_leaderboard(*period);
                let mut seen = 0;
                while updates.map_or(true, |updates| seen < updates) {
                    let Some(board) = feed.next().await.transpose()? else {
                        break;
                    };
                    seen += 1;
                    println!(
                        "{}",
                        output.display_many(
                            board.iter().map(super::leaderboard_row),
                            super::leaderboard_projection(),
                        )?
                    );
                }
            }
        }
        Ok(())
    }
}
