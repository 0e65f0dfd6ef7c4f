use std::path::Path;

use clap::Parser;
use tracing::info;

use reviewbot::cli::Cli;
use reviewbot::config::Configuration;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    info!("reviewbot starting");

    let config = match Configuration::load(Path::new(&cli.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        items = config.config_items.len(),
        bot_name = %cli.bot_name,
        "configuration loaded"
    );

    if cli.check {
        println!("configuration ok");
        return;
    }

    info!("no webhook transport configured — exiting");
}
