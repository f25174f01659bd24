mod cli;
mod platform;

use clap::Parser;

use crate::cli::Cli;
use crate::platform::config::AppConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let level = match cli.log_level.as_deref() {
        Some(name) => archive_logging::parse_level(name)
            .ok_or_else(|| anyhow::anyhow!("unknown log level {name:?}"))?,
        None => config.level_filter(),
    };
    platform::logging::initialize(config.log_destination, level, &config.log_file);

    platform::app::run(cli.command, &config)
}
