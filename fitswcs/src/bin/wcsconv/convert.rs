//! `pix2world` and `world2pix`

use anyhow::Context;
use fitswcs::SolverConfig;

use crate::cli::{Cli, ConvertArgs, World2pixArgs};
use crate::input::{load_wcs, origin, print_pairs, read_pairs};

pub fn pix2world(args: &ConvertArgs, cli: &Cli) -> anyhow::Result<()> {
    let wcs = load_wcs(&args.header)?;
    let origin = origin(args.origin)?;
    let pixels = read_pairs(&args.coords)?;

    let world = if args.core {
        wcs.wcs_pix2world_many(&pixels, origin)
    } else {
        wcs.all_pix2world_many(&pixels, origin)
    }
    .context("pixel to world conversion")?;

    print_pairs(&pixels, &world, cli.json)
}

pub fn world2pix(args: &World2pixArgs, cli: &Cli) -> anyhow::Result<()> {
    let convert = &args.convert;
    let wcs = load_wcs(&convert.header)?;
    let origin = origin(convert.origin)?;
    let world = read_pairs(&convert.coords)?;

    let pixels = if convert.core {
        wcs.wcs_world2pix_many(&world, origin)
    } else {
        let config = SolverConfig::new()
            .with_tolerance(args.tolerance)
            .with_max_iter(args.max_iter)
            .with_detect_divergence(!args.no_divergence_check)
            .with_quiet(args.quiet);
        wcs.all_world2pix_many_with(&world, origin, &config)
    }
    .context("world to pixel conversion")?;

    print_pairs(&world, &pixels, cli.json)
}
