//! CLI argument definitions for wcsconv

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wcsconv")]
#[command(about = "FITS WCS pixel/world coordinate conversion")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG still applies)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarise the WCS described by a header
    Info(InfoArgs),

    /// Convert pixel coordinates to world coordinates
    Pix2world(ConvertArgs),

    /// Convert world coordinates to pixel coordinates
    World2pix(World2pixArgs),

    /// World coordinates of the four image corners
    Footprint(FootprintArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Header file
    pub header: PathBuf,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Header file
    pub header: PathBuf,

    /// Coordinate pairs; read from stdin when omitted
    #[arg(allow_negative_numbers = true)]
    pub coords: Vec<f64>,

    /// Pixel origin: 0 for array indexing, 1 for FITS
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(i64).range(0..=1))]
    pub origin: i64,

    /// Ignore distortion and use the core transformation only
    #[arg(long)]
    pub core: bool,
}

#[derive(Args)]
pub struct World2pixArgs {
    #[command(flatten)]
    pub convert: ConvertArgs,

    /// Required accuracy of the distortion inversion, in pixels
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Maximum number of inversion iterations
    #[arg(long, default_value = "20")]
    pub max_iter: usize,

    /// Report best solutions instead of failing on non-convergence
    #[arg(long)]
    pub quiet: bool,

    /// Keep iterating when corrections grow
    #[arg(long)]
    pub no_divergence_check: bool,
}

#[derive(Args)]
pub struct FootprintArgs {
    /// Header file
    pub header: PathBuf,

    /// Ignore distortion when computing the corners
    #[arg(long)]
    pub core: bool,
}
