//! `info`: human or JSON summary of a header's WCS

use fitswcs::{CoordType, SolverConfig};
use serde::Serialize;

use crate::cli::{Cli, InfoArgs};
use crate::input::load_wcs;

#[derive(Serialize)]
struct InfoReport {
    ctype: [String; 2],
    projection: &'static str,
    coord_type: CoordType,
    crpix: [f64; 2],
    crval: [f64; 2],
    cd: [[f64; 2]; 2],
    pixel_scales: [f64; 2],
    image_shape: Option<[usize; 2]>,
    sip: bool,
    lookup_tables: bool,
    solver: SolverConfig,
}

pub fn run(args: &InfoArgs, cli: &Cli) -> anyhow::Result<()> {
    let wcs = load_wcs(&args.header)?;

    if !cli.json {
        println!("{}", wcs);
        return Ok(());
    }

    let report = InfoReport {
        ctype: wcs.ctypes(),
        projection: wcs.projection_code(),
        coord_type: wcs.coord_type(),
        crpix: wcs.crpix(),
        crval: wcs.crval(),
        cd: wcs.cd_matrix(),
        pixel_scales: wcs.pixel_scales(),
        image_shape: wcs.image_shape(),
        sip: wcs.has_sip(),
        lookup_tables: wcs.has_lookup_tables(),
        solver: *wcs.solver_config(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
