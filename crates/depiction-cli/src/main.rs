//! Depiction CLI: the `depiction` command.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Geo {
            lat,
            lon,
            alt,
            radius,
            json,
        } => commands::geo::run(lat, lon, alt, radius, json),

        Commands::Tiles {
            lat,
            lon,
            zoom,
            radius,
            json,
        } => commands::tiles::run(lat, lon, zoom, radius, json),

        Commands::Load {
            store,
            config,
            json,
        } => commands::load::run(store, config, json),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}
