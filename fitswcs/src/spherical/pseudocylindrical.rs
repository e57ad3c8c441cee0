use std::f64::consts::SQRT_2;

use crate::angle::constants::{HALF_PI, PI, RAD_TO_DEG};
use crate::common::{asin_safe, native_coord_from_radians, newton_raphson_1d, NewtonConfig};
use crate::coordinate::{IntermediateCoord, NativeCoord};
use crate::error::{WcsError, WcsResult};

const EDGE_TOL: f64 = 1e-12;

#[inline]
fn plane(x_rad: f64, y_rad: f64) -> IntermediateCoord {
    IntermediateCoord::new(x_rad * RAD_TO_DEG, y_rad * RAD_TO_DEG)
}

/// Rejects native longitudes recovered outside [-180, 180]; these come from
/// points beyond the projection's outer meridians.
fn within_meridians(phi: f64, code: &str) -> WcsResult<()> {
    if phi.abs() > PI + EDGE_TOL {
        return Err(WcsError::out_of_bounds(format!(
            "{}: point beyond the outer meridian",
            code
        )));
    }
    Ok(())
}

pub(crate) fn project_sfl(native: NativeCoord) -> IntermediateCoord {
    let theta = native.theta().radians();
    plane(native.phi().radians() * theta.cos(), theta)
}

pub(crate) fn deproject_sfl(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let theta = inter.y_rad();
    if theta.abs() > HALF_PI + EDGE_TOL {
        return Err(WcsError::out_of_bounds("SFL: |y| beyond 90 degrees"));
    }
    let cos_theta = theta.cos();
    let phi = if cos_theta.abs() < 1e-12 {
        if inter.x_rad().abs() > EDGE_TOL {
            return Err(WcsError::out_of_bounds("SFL: point beyond the pole"));
        }
        0.0
    } else {
        inter.x_rad() / cos_theta
    };
    within_meridians(phi, "SFL")?;
    Ok(native_coord_from_radians(phi, theta.clamp(-HALF_PI, HALF_PI)))
}

pub(crate) fn project_par(native: NativeCoord) -> IntermediateCoord {
    let theta = native.theta().radians();
    let x = native.phi().radians() * (2.0 * (2.0 * theta / 3.0).cos() - 1.0);
    plane(x, PI * (theta / 3.0).sin())
}

pub(crate) fn deproject_par(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let s = inter.y_rad() / PI;
    if s.abs() > 1.0 + EDGE_TOL {
        return Err(WcsError::out_of_bounds("PAR: |y| beyond 180 degrees"));
    }
    let theta = 3.0 * asin_safe(s);

    // 2cos(2θ/3) - 1 = 1 - 4sin²(θ/3)
    let scale = 1.0 - 4.0 * s.clamp(-1.0, 1.0).powi(2);
    let phi = if scale.abs() < 1e-12 {
        if inter.x_rad().abs() > EDGE_TOL {
            return Err(WcsError::out_of_bounds("PAR: point beyond the pole"));
        }
        0.0
    } else {
        inter.x_rad() / scale
    };
    within_meridians(phi, "PAR")?;
    Ok(native_coord_from_radians(phi, theta.clamp(-HALF_PI, HALF_PI)))
}

/// Auxiliary angle γ of the Mollweide projection: 2γ + sin 2γ = π sin θ.
fn mollweide_gamma(theta: f64) -> WcsResult<f64> {
    if theta.abs() >= HALF_PI - 1e-10 {
        return Ok(theta.signum() * HALF_PI);
    }
    const CONFIG: NewtonConfig = NewtonConfig::new((-HALF_PI, HALF_PI), "MOL");
    newton_raphson_1d(
        theta,
        PI * theta.sin(),
        |g| 2.0 * g + (2.0 * g).sin(),
        |g| 2.0 + 2.0 * (2.0 * g).cos(),
        &CONFIG,
    )
}

pub(crate) fn project_mol(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let gamma = mollweide_gamma(native.theta().radians())?;
    let (sin_gamma, cos_gamma) = gamma.sin_cos();
    let x = 2.0 * SQRT_2 / PI * native.phi().radians() * cos_gamma;
    Ok(plane(x, SQRT_2 * sin_gamma))
}

pub(crate) fn deproject_mol(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let sin_gamma = inter.y_rad() / SQRT_2;
    if sin_gamma.abs() > 1.0 + EDGE_TOL {
        return Err(WcsError::out_of_bounds("MOL: |y| beyond the projection edge"));
    }
    let gamma = asin_safe(sin_gamma);
    let cos_gamma = gamma.cos();

    let phi = if cos_gamma < 1e-12 {
        if inter.x_rad().abs() > EDGE_TOL {
            return Err(WcsError::out_of_bounds("MOL: point beyond the pole"));
        }
        0.0
    } else {
        PI * inter.x_rad() / (2.0 * SQRT_2 * cos_gamma)
    };
    within_meridians(phi, "MOL")?;

    let theta = asin_safe((2.0 * gamma + (2.0 * gamma).sin()) / PI);
    Ok(native_coord_from_radians(phi, theta))
}

pub(crate) fn project_ait(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let (sin_theta, cos_theta) = native.theta().sin_cos();
    let (sin_half_phi, cos_half_phi) = (native.phi().radians() / 2.0).sin_cos();

    let denom = 1.0 + cos_theta * cos_half_phi;
    if denom < 1e-10 {
        return Err(WcsError::singularity("AIT: undefined at the antipode"));
    }
    let gamma = libm::sqrt(2.0 / denom);
    Ok(plane(
        2.0 * gamma * cos_theta * sin_half_phi,
        gamma * sin_theta,
    ))
}

pub(crate) fn deproject_ait(inter: IntermediateCoord) -> WcsResult<NativeCoord> {
    let x = inter.x_rad();
    let y = inter.y_rad();

    let z_sq = 1.0 - (x / 4.0).powi(2) - (y / 2.0).powi(2);
    if z_sq < 0.5 - EDGE_TOL {
        return Err(WcsError::out_of_bounds("AIT: point outside the ellipse"));
    }
    let z = libm::sqrt(z_sq.max(0.5));

    let phi = 2.0 * (z * x / 2.0).atan2(2.0 * z * z - 1.0);
    let theta = asin_safe(y * z);
    Ok(native_coord_from_radians(phi, theta))
}
