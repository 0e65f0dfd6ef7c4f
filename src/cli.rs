use clap::Parser;

/// reviewbot — pull-request review trigger bot
#[derive(Parser, Debug)]
#[command(name = "reviewbot", version, about)]
pub struct Cli {
    /// Path to config file
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,

    /// The bot's own platform login
    #[arg(long, default_value = "reviewbot")]
    pub bot_name: String,
}
