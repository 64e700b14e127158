use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `pdfbinder` - Telegram bot that binds the images you send into one PDF.
#[derive(Parser, Debug)]
#[command(name = "pdfbinder")]
#[command(version)]
#[command(about = "Collects images per chat and turns them into a PDF.", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.pdfbinder/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Start the bot (long-polls Telegram until Ctrl-C)
    Start,

    /// Check that the configured bot token reaches Telegram
    Doctor,
}
