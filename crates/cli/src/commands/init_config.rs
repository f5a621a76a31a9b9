use eyre::OptionExt;

/// Initialize config file.
#[derive(Debug, clap::Args)]
pub struct InitConfig {
    /// Overwrite an existing config file.
    #[arg(long)]
    force: bool,
}

impl super::Command for InitConfig {
    async fn execute(&self, ctx: super::Context<'_>) -> eyre::Result<()> {
        let path = ctx.config_path();
        if !self.force && tokio::fs::try_exists(path).await? {
            eyre::bail!(
                "config file `{}` already exists, use `--force` to overwrite it",
                path.display()
            );
        }
        let parent = path.parent().ok_or_eyre("invalid config path")?;
        tokio::fs::create_dir_all(parent).await?;
        tokio::fs::write(path, ctx.config().to_toml()?).await?;
        tracing::info!(path = %path.display(), "config file written");
        Ok(())
    }
}
