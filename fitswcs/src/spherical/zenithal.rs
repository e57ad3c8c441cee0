use crate::angle::constants::{DEG_TO_RAD, HALF_PI, PI, RAD_TO_DEG};
use crate::common::{
    asin_safe, intermediate_to_polar, native_coord_from_radians, pole_native_coord,
    radial_to_intermediate,
};
use crate::coordinate::{IntermediateCoord, NativeCoord};
use crate::error::{WcsError, WcsResult};

const LIMIT_TOL: f64 = 1e-12;

/// Zenithal projections whose plane radius depends on θ alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Radial {
    /// TAN
    Gnomonic,
    /// ARC
    Equidistant,
    /// STG
    Stereographic,
    /// ZEA
    EqualArea,
}

impl Radial {
    /// R(θ) in radians.
    fn radius(self, theta: f64) -> WcsResult<f64> {
        let (sin_theta, cos_theta) = theta.sin_cos();
        match self {
            Self::Gnomonic => {
                if sin_theta <= 0.0 {
                    return Err(WcsError::singularity("TAN: undefined for theta <= 0"));
                }
                Ok(cos_theta / sin_theta)
            }
            Self::Equidistant => Ok(HALF_PI - theta),
            Self::Stereographic => {
                let denom = 1.0 + sin_theta;
                if denom < LIMIT_TOL {
                    return Err(WcsError::singularity("STG: undefined at theta = -90"));
                }
                Ok(2.0 * cos_theta / denom)
            }
            Self::EqualArea => Ok(libm::sqrt(2.0 * (1.0 - sin_theta))),
        }
    }

    /// θ(R) in radians.
    fn latitude(self, r: f64) -> WcsResult<f64> {
        match self {
            Self::Gnomonic => Ok(1.0_f64.atan2(r)),
            Self::Equidistant => {
                if r > PI + LIMIT_TOL {
                    return Err(WcsError::out_of_bounds("ARC: radius beyond 180 degrees"));
                }
                Ok((HALF_PI - r).max(-HALF_PI))
            }
            Self::Stereographic => Ok(HALF_PI - 2.0 * (r / 2.0).atan()),
            Self::EqualArea => {
                let half = r / 2.0;
                if half > 1.0 + LIMIT_TOL {
                    return Err(WcsError::out_of_bounds("ZEA: point outside the projection"));
                }
                Ok(HALF_PI - 2.0 * asin_safe(half))
            }
        }
    }
}

pub(crate) fn project_zenithal(native: NativeCoord, radial: Radial) -> WcsResult<IntermediateCoord> {
    let r = radial.radius(native.theta().radians())?;
    Ok(radial_to_intermediate(r, native.phi().radians()))
}

pub(crate) fn deproject_zenithal(inter: IntermediateCoord, radial: Radial) -> WcsResult<NativeCoord> {
    let (phi, r, is_pole) = intermediate_to_polar(inter.x_rad(), inter.y_rad());
    if is_pole {
        return Ok(pole_native_coord());
    }
    Ok(native_coord_from_radians(phi, radial.latitude(r)?))
}

/// Slant orthographic. With ξ = η = 0 this is the plain orthographic
/// projection, defined on the near hemisphere only.
pub(crate) fn project_sin(native: NativeCoord, xi: f64, eta: f64) -> WcsResult<IntermediateCoord> {
    let phi = native.phi().radians();
    let theta = native.theta().radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    let horizon = -(xi * sin_phi - eta * cos_phi).atan();
    if theta < horizon - LIMIT_TOL {
        return Err(WcsError::out_of_bounds("SIN: point on the far side of the sphere"));
    }

    let (sin_theta, cos_theta) = theta.sin_cos();
    let z = 1.0 - sin_theta;
    let x = cos_theta * sin_phi + xi * z;
    let y = -cos_theta * cos_phi + eta * z;
    Ok(IntermediateCoord::new(x * RAD_TO_DEG, y * RAD_TO_DEG))
}

pub(crate) fn deproject_sin(inter: IntermediateCoord, xi: f64, eta: f64) -> WcsResult<NativeCoord> {
    let x = inter.x_rad();
    let y = inter.y_rad();

    if xi == 0.0 && eta == 0.0 {
        let (phi, r, is_pole) = intermediate_to_polar(x, y);
        if is_pole {
            return Ok(pole_native_coord());
        }
        if r > 1.0 + LIMIT_TOL {
            return Err(WcsError::out_of_bounds("SIN: point outside the unit circle"));
        }
        return Ok(native_coord_from_radians(phi, r.min(1.0).acos()));
    }

    // sin θ solves a·s² + 2b·s + c = 0; the larger root is on the near side
    let a = xi * xi + eta * eta + 1.0;
    let b = xi * (x - xi) + eta * (y - eta);
    let c = (x - xi).powi(2) + (y - eta).powi(2) - 1.0;
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return Err(WcsError::out_of_bounds("SIN: point outside the projection"));
    }

    let sin_theta = (-b + libm::sqrt(discriminant)) / a;
    if sin_theta.abs() > 1.0 + LIMIT_TOL {
        return Err(WcsError::out_of_bounds("SIN: point outside the projection"));
    }
    let sin_theta = sin_theta.clamp(-1.0, 1.0);
    let z = 1.0 - sin_theta;
    let phi = (x - xi * z).atan2(-(y - eta * z));
    Ok(native_coord_from_radians(phi, sin_theta.asin()))
}

/// Zenithal perspective with source distance μ (sphere radii) and plane
/// tilt γ (degrees).
pub(crate) fn project_azp(native: NativeCoord, mu: f64, gamma: f64) -> WcsResult<IntermediateCoord> {
    let phi = native.phi().radians();
    let theta = native.theta().radians();

    if mu.abs() > 1.0 && theta < (-1.0 / mu).asin() - LIMIT_TOL {
        return Err(WcsError::out_of_bounds("AZP: point hidden behind the limb"));
    }

    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_gamma, cos_gamma) = (gamma * DEG_TO_RAD).sin_cos();

    let denom = mu + sin_theta + cos_theta * cos_phi * sin_gamma / cos_gamma;
    if denom.abs() < LIMIT_TOL {
        return Err(WcsError::singularity("AZP: point projects to infinity"));
    }

    let r = (mu + 1.0) * cos_theta / denom;
    let x = r * sin_phi;
    let y = -r * cos_phi / cos_gamma;
    Ok(IntermediateCoord::new(x * RAD_TO_DEG, y * RAD_TO_DEG))
}

pub(crate) fn deproject_azp(inter: IntermediateCoord, mu: f64, gamma: f64) -> WcsResult<NativeCoord> {
    let x = inter.x_rad();
    let y = inter.y_rad();
    let (sin_gamma, cos_gamma) = (gamma * DEG_TO_RAD).sin_cos();

    let y_cos = y * cos_gamma;
    let r = libm::hypot(x, y_cos);
    if r == 0.0 {
        return Ok(pole_native_coord());
    }
    let phi = x.atan2(-y_cos);

    let denom = mu + 1.0 + y * sin_gamma;
    if denom.abs() < LIMIT_TOL {
        return Err(WcsError::singularity("AZP: degenerate deprojection"));
    }
    let rho = r / denom;
    let s = rho * mu / libm::sqrt(rho * rho + 1.0);
    if s.abs() > 1.0 + LIMIT_TOL {
        return Err(WcsError::out_of_bounds("AZP: point outside the projection"));
    }

    let theta = 1.0_f64.atan2(rho) - asin_safe(s);
    if !(-HALF_PI - LIMIT_TOL..=HALF_PI + LIMIT_TOL).contains(&theta) {
        return Err(WcsError::out_of_bounds("AZP: point outside the projection"));
    }
    Ok(native_coord_from_radians(phi, theta.clamp(-HALF_PI, HALF_PI)))
}
