use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use luckyfive_sdk::{ClientOptions, GuardOptions};
use prettytable::{format::FormatBuilder, Cell, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default config file.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "~/.config/luckyfive/config.toml";

/// Default store file.
pub(crate) const DEFAULT_STORE_FILE: &str = "~/.local/share/luckyfive/store.json";

const ENV_PREFIX: &str = "LUCKYFIVE_";

/// Expand `~` and environment variables in `path`.
pub(crate) fn expand_path(path: &str) -> eyre::Result<PathBuf> {
    Ok(PathBuf::from(shellexpand::full(path)?.into_owned()))
}

fn parse_duration(field: &str, value: &str) -> eyre::Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|err| eyre::eyre!("invalid duration `{value}` for `{field}`: {err}"))
}

fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

/// Config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    output: OutputFormat,
    store: StoreConfig,
    game: GameConfig,
    guard: GuardConfig,
}

impl Config {
    /// Load the config at `path`, merged with `LUCKYFIVE_` environment variables.
    ///
    /// A missing file yields the defaults.
    pub(crate) fn load(path: &Path) -> eyre::Result<Self> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    pub(crate) fn to_toml(&self) -> eyre::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub(crate) fn output(&self) -> OutputFormat {
        self.output
    }

    pub(crate) fn set_output(&mut self, output: OutputFormat) {
        self.output = output;
    }

    pub(crate) fn store(&self) -> &StoreConfig {
        &self.store
    }

    pub(crate) fn set_store(&mut self, store: StoreConfig) {
        self.store = store;
    }

    /// Client options.
    pub(crate) fn options(&self) -> eyre::Result<ClientOptions> {
        let game = &self.game;
        let guard = &self.guard;
        let guard = GuardOptions::builder()
            .input_interval(parse_duration("guard.input_interval", &guard.input_interval)?)
            .add_interval(parse_duration("guard.add_interval", &guard.add_interval)?)
            .cooldown(parse_duration("guard.cooldown", &guard.cooldown)?)
            .build();
        let options = ClientOptions::builder()
            .cycle_duration(parse_duration("game.cycle_duration", &game.cycle_duration)?)
            .target_points(game.target_points)
            .submission_limit(game.submission_limit)
            .submission_window(parse_duration(
                "game.submission_window",
                &game.submission_window,
            )?)
            .entry_amount(game.entry_amount.clone())
            .payment_receiver(game.payment_receiver.clone())
            .leader_deduction(game.leader_deduction)
            .leaderboard_size(game.leaderboard_size)
            .leaderboard_min_points(game.leaderboard_min_points)
            .guard(guard)
            .build();
        Ok(options)
    }
}

/// Store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub(crate) enum StoreConfig {
    /// In-memory, discarded on exit.
    Memory,
    /// In-memory, loaded from and saved to a JSON file.
    File {
        /// Path of the file.
        path: String,
    },
    /// Firebase Realtime Database.
    Http {
        /// Database URL.
        url: String,
        /// Database secret or ID token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::File {
            path: DEFAULT_STORE_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct GameConfig {
    cycle_duration: String,
    target_points: u64,
    submission_limit: u32,
    submission_window: String,
    entry_amount: String,
    payment_receiver: String,
    leader_deduction: u64,
    leaderboard_size: usize,
    leaderboard_min_points: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        let options = ClientOptions::default();
        Self {
            cycle_duration: format_duration(options.cycle_duration),
            target_points: options.target_points,
            submission_limit: options.submission_limit,
            submission_window: format_duration(options.submission_window),
            entry_amount: options.entry_amount,
            payment_receiver: options.payment_receiver,
            leader_deduction: options.leader_deduction,
            leaderboard_size: options.leaderboard_size,
            leaderboard_min_points: options.leaderboard_min_points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct GuardConfig {
    input_interval: String,
    add_interval: String,
    cooldown: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        let options = GuardOptions::default();
        Self {
            input_interval: format_duration(options.input_interval),
            add_interval: format_duration(options.add_interval),
            cooldown: format_duration(options.cooldown),
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum OutputFormat {
    /// Table.
    #[default]
    Table,
    /// JSON.
    Json,
}

/// Display options.
#[derive(Debug, Clone, Default)]
pub(crate) struct DisplayOptions {
    projection: Vec<(String, String)>,
}

impl DisplayOptions {
    /// Show the given `(key, header)` columns. Nested keys are `.`-separated.
    pub(crate) fn table_projection(
        projection: impl IntoIterator<Item = (impl ToString, impl ToString)>,
    ) -> Self {
        Self {
            projection: projection
                .into_iter()
                .map(|(key, header)| (key.to_string(), header.to_string()))
                .collect(),
        }
    }
}

fn lookup<'a>(item: &'a Value, key: &str) -> Option<&'a Value> {
    item.pointer(&format!("/{}", key.replace('.', "/")))
}

fn to_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| to_cell(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .column_separator(' ')
            .padding(0, 2)
            .build(),
    );
    table
}

impl OutputFormat {
    /// Display a list of items.
    pub(crate) fn display_many(
        &self,
        items: impl IntoIterator<Item = Value>,
        options: DisplayOptions,
    ) -> eyre::Result<String> {
        let items = items.into_iter().collect::<Vec<_>>();
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(&items)?),
            Self::Table => {
                if items.is_empty() {
                    return Ok("(empty)".to_string());
                }
                let mut table = table();
                table.set_titles(Row::new(
                    options
                        .projection
                        .iter()
                        .map(|(_, header)| Cell::new(header))
                        .collect(),
                ));
                for item in &items {
                    table.add_row(Row::new(
                        options
                            .projection
                            .iter()
                            .map(|(key, _)| Cell::new(&to_cell(lookup(item, key))))
                            .collect(),
                    ));
                }
                Ok(table.to_string())
            }
        }
    }

    /// Display one item as a two-column table.
    pub(crate) fn display_one(&self, item: Value, options: DisplayOptions) -> eyre::Result<String> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(&item)?),
            Self::Table => {
                let mut table = table();
                for (key, header) in &options.projection {
                    table.add_row(Row::new(vec![
                        Cell::new(header),
                        Cell::new(&to_cell(lookup(&item, key))),
                    ]));
                }
                Ok(table.to_string())
            }
        }
    }

    /// Display a labeled value.
    pub(crate) fn display_value_with_label(
        &self,
        label: &str,
        value: impl Serialize,
    ) -> eyre::Result<String> {
        let value = serde_json::to_value(value)?;
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                label: value
            }))?),
            Self::Table => Ok(format!("{label}: {}", to_cell(Some(&value)))),
        }
    }
}
