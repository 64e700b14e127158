use std::sync::Arc;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;

/// Load configuration for `cli` and run the selected command.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    config.validate()?;
    tracing::debug!(config = %config.config_path.display(), "configuration loaded");

    let config = Arc::new(config);
    match cli.command {
        Commands::Start => crate::transport::start_bot(config).await?,
        Commands::Doctor => crate::transport::doctor(config).await?,
    }
    Ok(())
}
