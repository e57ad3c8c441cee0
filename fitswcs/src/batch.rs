//! Slice-at-a-time transforms.
//!
//! Points are processed in parallel on the rayon global pool. A point that
//! falls outside a projection's domain or onto a singularity yields
//! `[NaN, NaN]` instead of failing the whole batch; any other error aborts
//! it.

use rayon::prelude::*;

use crate::coordinate::Origin;
use crate::error::WcsResult;
use crate::solver::{PointSolution, SolverConfig};
use crate::wcs::Wcs;

const INVALID: [f64; 2] = [f64::NAN, f64::NAN];

fn nan_on_invalid(result: WcsResult<[f64; 2]>) -> WcsResult<[f64; 2]> {
    match result {
        Err(e) if e.is_invalid_coordinate() => Ok(INVALID),
        other => other,
    }
}

impl Wcs {
    pub fn all_pix2world_many(
        &self,
        pixels: &[[f64; 2]],
        origin: Origin,
    ) -> WcsResult<Vec<[f64; 2]>> {
        pixels
            .par_iter()
            .map(|&[x, y]| nan_on_invalid(self.all_pix2world(x, y, origin)))
            .collect()
    }

    pub fn wcs_pix2world_many(
        &self,
        pixels: &[[f64; 2]],
        origin: Origin,
    ) -> WcsResult<Vec<[f64; 2]>> {
        pixels
            .par_iter()
            .map(|&[x, y]| nan_on_invalid(self.wcs_pix2world(x, y, origin)))
            .collect()
    }

    pub fn wcs_world2pix_many(
        &self,
        world: &[[f64; 2]],
        origin: Origin,
    ) -> WcsResult<Vec<[f64; 2]>> {
        world
            .par_iter()
            .map(|&[lon, lat]| nan_on_invalid(self.wcs_world2pix(lon, lat, origin)))
            .collect()
    }

    pub fn all_world2pix_many(
        &self,
        world: &[[f64; 2]],
        origin: Origin,
    ) -> WcsResult<Vec<[f64; 2]>> {
        self.all_world2pix_many_with(world, origin, &self.solver)
    }

    /// Distortion-inverting world to pixel over a slice. Points that fail to
    /// converge are reported together in one `NoConvergence` error, indexed
    /// by their position in `world`, unless `config.quiet` is set.
    pub fn all_world2pix_many_with(
        &self,
        world: &[[f64; 2]],
        origin: Origin,
        config: &SolverConfig,
    ) -> WcsResult<Vec<[f64; 2]>> {
        config.validate()?;
        let solutions = world
            .par_iter()
            .map(|&[lon, lat]| match self.core_world_to_pixel(lon, lat) {
                Ok(focal) => Ok(self.solve_foc2pix(focal, config)),
                Err(e) if e.is_invalid_coordinate() => Ok(PointSolution::invalid()),
                Err(e) => Err(e),
            })
            .collect::<WcsResult<Vec<_>>>()?;
        self.finish_solutions(solutions, config, origin)
    }

    pub fn pix2foc_many(&self, pixels: &[[f64; 2]], origin: Origin) -> Vec<[f64; 2]> {
        pixels
            .par_iter()
            .map(|&[x, y]| self.pix2foc(x, y, origin))
            .collect()
    }

    pub fn foc2pix_many(&self, focal: &[[f64; 2]], origin: Origin) -> WcsResult<Vec<[f64; 2]>> {
        let solutions = focal
            .par_iter()
            .map(|&[x, y]| self.solve_foc2pix(origin.to_fits(x, y), &self.solver))
            .collect();
        self.finish_solutions(solutions, &self.solver, origin)
    }

    /// World coordinates for `(row, col)` array indices.
    pub fn array_index_to_world_many(&self, indices: &[[f64; 2]]) -> WcsResult<Vec<[f64; 2]>> {
        indices
            .par_iter()
            .map(|&[row, col]| nan_on_invalid(self.array_index_to_world(row, col)))
            .collect()
    }
}
