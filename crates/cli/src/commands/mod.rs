use std::{ops::Deref, path::Path};

use admin::Admin;
use cycle::Cycle;
use enum_dispatch::enum_dispatch;
use eyre::OptionExt;
use init_config::InitConfig;
use leaderboard::Leaderboard;
use luckyfive_sdk::{
    model::{self, LeaderboardEntry, Place},
    Client,
};
use payment::Payment;
use player::Player;
use serde_json::{json, Value};
use simulate::Simulate;
use time::OffsetDateTime;

use crate::{
    config::{Config, DisplayOptions, OutputFormat},
    store::AnyStore,
};

mod admin;
mod cycle;
mod init_config;
mod leaderboard;
mod payment;
mod player;
mod simulate;

/// Commands.
#[enum_dispatch(Command)]
#[derive(Debug, clap::Subcommand)]
pub(crate) enum Commands {
    /// Initialize config file.
    InitConfig(InitConfig),
    /// Player commands.
    Player(Player),
    /// Cycle commands.
    Cycle(Cycle),
    /// Entry payment commands.
    Payment(Payment),
    /// Leaderboard and stats.
    Leaderboard(Leaderboard),
    /// Administrative commands.
    Admin(Admin),
    /// Play simulated games against an in-memory store.
    Simulate(Simulate),
}

#[enum_dispatch]
pub(crate) trait Command {
    fn is_client_required(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: Context<'_>) -> eyre::Result<()>;
}

pub(crate) struct Context<'a> {
    config_path: &'a Path,
    config: &'a Config,
    client: Option<&'a CommandClient>,
}

impl<'a> Context<'a> {
    pub(super) fn new(
        config_path: &'a Path,
        config: &'a Config,
        client: Option<&'a CommandClient>,
    ) -> Self {
        Self {
            config_path,
            config,
            client,
        }
    }

    pub(crate) fn config_path(&self) -> &Path {
        self.config_path
    }

    pub(crate) fn config(&self) -> &Config {
        self.config
    }

    pub(crate) fn client(&self) -> eyre::Result<&CommandClient> {
        self.client.ok_or_eyre("client is not provided")
    }
}

pub(crate) struct CommandClient {
    client: Client<AnyStore>,
    output_format: OutputFormat,
}

impl CommandClient {
    pub(crate) fn new(config: &Config, store: AnyStore) -> eyre::Result<Self> {
        Ok(Self {
            client: Client::new_with_options(store, config.options()?),
            output_format: config.output(),
        })
    }

    pub(crate) fn output(&self) -> OutputFormat {
        self.output_format
    }
}

impl Deref for CommandClient {
    type Target = Client<AnyStore>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

fn format_time(at: OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| at.to_string())
}

fn format_remaining(remaining: std::time::Duration) -> String {
    // Second precision is enough for display.
    humantime::format_duration(std::time::Duration::from_secs(remaining.as_secs())).to_string()
}

/// Flatten a cycle for display.
fn cycle_row(cycle: &model::Cycle, now: Option<OffsetDateTime>) -> Value {
    let winner = |place: Place| cycle.winners.get(place).map(|w| w.username.clone());
    json!({
        "cycle_number": cycle.cycle_number,
        "start_time": format_time(cycle.start_time),
        "end_time": format_time(cycle.end_time),
        "target_points": cycle.target_points,
        "remaining": now.map(|now| format_remaining(cycle.remaining(now))),
        "first": winner(Place::First),
        "second": winner(Place::Second),
        "third": winner(Place::Third),
        "paid": cycle.paid.len(),
        "completed": cycle.completed,
    })
}

fn cycle_projection(live: bool) -> DisplayOptions {
    let mut columns = vec![
        ("cycle_number", "Cycle"),
        ("start_time", "Start"),
        ("end_time", "End"),
        ("target_points", "Target"),
    ];
    if live {
        columns.push(("remaining", "Remaining"));
    }
    columns.extend([
        ("first", "First"),
        ("second", "Second"),
        ("third", "Third"),
        ("paid", "Paid"),
    ]);
    DisplayOptions::table_projection(columns)
}

fn leaderboard_row(entry: &LeaderboardEntry) -> Value {
    json!({
        "rank": entry.rank,
        "username": entry.username,
        "address": entry.address,
        "points": entry.points,
        "games_played": entry.games_played,
        "average_points": format!("{:.1}", entry.average_points),
        "last_played": format_time(entry.last_played),
        "trend": entry.trend.to_string(),
    })
}

fn leaderboard_projection() -> DisplayOptions {
    DisplayOptions::table_projection([
        ("rank", "#"),
        ("username", "Player"),
        ("address", "Wallet"),
        ("points", "Points"),
        ("games_played", "Games"),
        ("average_points", "Avg"),
        ("trend", "Trend"),
        ("last_played", "Last Played"),
    ])
}

fn player_row(player: &model::Player) -> Value {
    json!({
        "username": player.username,
        "wallet_address": player.wallet_address,
        "points": player.points,
        "games_played": player.games_played,
        "cycle_number": player.cycle_number,
        "eth_address": player.eth_address,
        "paid_cycles": player.payments.values().map(|p| p.cycle_number).collect::<Vec<_>>(),
        "game_in_progress": player.game_in_progress,
        "created_at": format_time(player.created_at),
        "last_updated": player.last_updated.map(format_time),
    })
}

fn player_projection() -> DisplayOptions {
    DisplayOptions::table_projection([
        ("username", "Username"),
        ("wallet_address", "Wallet"),
        ("points", "Points"),
        ("games_played", "Games"),
        ("cycle_number", "Cycle"),
        ("eth_address", "Payment Address"),
        ("paid_cycles", "Paid Cycles"),
        ("game_in_progress", "In Game"),
        ("created_at", "Created"),
        ("last_updated", "Updated"),
    ])
}
