//! `footprint`: image corners on the sky

use anyhow::Context;
use serde::Serialize;

use crate::cli::{Cli, FootprintArgs};
use crate::input::load_wcs;

#[derive(Serialize)]
struct Footprint {
    corners: [[f64; 2]; 4],
}

pub fn run(args: &FootprintArgs, cli: &Cli) -> anyhow::Result<()> {
    let wcs = load_wcs(&args.header)?;
    let corners = wcs
        .calc_footprint(!args.core)
        .context("footprint needs NAXIS1 and NAXIS2")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&Footprint { corners })?);
    } else {
        for [lon, lat] in corners {
            println!("{:.10} {:.10}", lon, lat);
        }
    }
    Ok(())
}
