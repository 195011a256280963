use clap::{Parser, Subcommand};
use depiction_math::tile::MAX_NEIGHBOUR_RADIUS;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

#[derive(Parser)]
#[command(
    name = "depiction",
    about = "Depiction: double-precision geo math and datasource ledger tooling",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize a geo coordinate and place it on a sphere
    Geo {
        /// Latitude in degrees (clamped to [-90, 90])
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees (wrapped to (-180, 180])
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Altitude above the sphere, in metres
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        alt: f64,

        /// Sphere radius in metres
        #[arg(long, default_value_t = EARTH_RADIUS)]
        radius: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the Web-Mercator tiles around a geo coordinate
    Tiles {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Zoom level
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=30))]
        zoom: u8,

        /// Tiles on each side of the centre tile
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(0..=MAX_NEIGHBOUR_RADIUS as i64)
        )]
        radius: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a JSONL store through the ledger, reload, and report what stayed
    Load {
        /// Path to the entity JSONL store
        #[arg(long)]
        store: String,

        /// Datasource TOML config (defaults: every entity, all capabilities)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
