use std::path::PathBuf;

use clap::Parser;
use commands::{Command, CommandClient, Commands, Context};
use config::{Config, OutputFormat, StoreConfig, DEFAULT_CONFIG_PATH};
use store::OpenedStore;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod store;

/// Command-line interface for LuckyFive.
#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the config file.
    #[arg(long, short, env = "LUCKYFIVE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Output format, overriding the config.
    #[arg(long, short, value_enum)]
    output: Option<OutputFormat>,
    /// Use this store file, overriding the config.
    #[arg(long, group = "store")]
    store_file: Option<String>,
    /// Use the database at this URL, overriding the config.
    #[arg(long, group = "store")]
    store_url: Option<String>,
    /// Use a throwaway in-memory store.
    #[arg(long, group = "store")]
    in_memory: bool,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config_path(&self) -> eyre::Result<PathBuf> {
        config::expand_path(&self.config)
    }

    fn load_config(&self, path: &std::path::Path) -> eyre::Result<Config> {
        let mut config = Config::load(path)?;
        if let Some(output) = self.output {
            config.set_output(output);
        }
        if let Some(path) = &self.store_file {
            config.set_store(StoreConfig::File { path: path.clone() });
        } else if let Some(url) = &self.store_url {
            let auth = match config.store() {
                StoreConfig::Http { auth, .. } => auth.clone(),
                _ => None,
            };
            config.set_store(StoreConfig::Http {
                url: url.clone(),
                auth,
            });
        } else if self.in_memory {
            config.set_store(StoreConfig::Memory);
        }
        Ok(config)
    }

    async fn execute(&self) -> eyre::Result<()> {
        let config_path = self.config_path()?;
        let config = self.load_config(&config_path)?;
        tracing::debug!(path = %config_path.display(), ?config, "loaded config");

        if !self.command.is_client_required() {
            return self
                .command
                .execute(Context::new(&config_path, &config, None))
                .await;
        }

        let opened = OpenedStore::open(config.store()).await?;
        let client = CommandClient::new(&config, opened.store())?;
        let result = self
            .command
            .execute(Context::new(&config_path, &config, Some(&client)))
            .await;
        // Keep partial progress of a failed command.
        opened.persist().await?;
        result
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::parse().execute().await
}
