//! wcsconv: pixel/world conversions driven by a FITS header
//!
//! Reads the WCS from a header file (80-column cards, with or without
//! newlines) and converts coordinate pairs given on the command line or on
//! stdin.

mod cli;
mod convert;
mod footprint;
mod info;
mod input;

use clap::Parser;
use cli::{Cli, Commands};
use log::LevelFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match &cli.command {
        Commands::Info(args) => info::run(args, &cli),
        Commands::Pix2world(args) => convert::pix2world(args, &cli),
        Commands::World2pix(args) => convert::world2pix(args, &cli),
        Commands::Footprint(args) => footprint::run(args, &cli),
    }
}
