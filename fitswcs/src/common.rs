use crate::angle::constants::RAD_TO_DEG;
use crate::angle::{normalize_longitude, Angle};
use crate::coordinate::{IntermediateCoord, NativeCoord};
use crate::error::{WcsError, WcsResult};

#[inline]
pub fn asin_safe(sin_value: f64) -> f64 {
    sin_value.clamp(-1.0, 1.0).asin()
}

#[inline]
pub fn pole_native_coord() -> NativeCoord {
    NativeCoord::new(Angle::ZERO, Angle::from_degrees(90.0))
}

/// Polar (R, φ) in radians to projection-plane (x, y) in degrees.
#[inline]
pub fn radial_to_intermediate(r_theta: f64, phi_rad: f64) -> IntermediateCoord {
    let (ps, pc) = phi_rad.sin_cos();
    IntermediateCoord::new(r_theta * ps * RAD_TO_DEG, -r_theta * pc * RAD_TO_DEG)
}

/// Projection-plane (x, y) in radians to (φ, R). The flag is set at the
/// origin, where φ is undefined and reported as zero.
#[inline]
pub fn intermediate_to_polar(x_rad: f64, y_rad: f64) -> (f64, f64, bool) {
    let r_theta = libm::hypot(x_rad, y_rad);
    let is_pole = r_theta == 0.0;
    let phi_rad = if is_pole { 0.0 } else { x_rad.atan2(-y_rad) };
    (phi_rad, r_theta, is_pole)
}

#[inline]
pub fn native_coord_from_radians(phi_rad: f64, theta_rad: f64) -> NativeCoord {
    NativeCoord::new(
        Angle::from_degrees(normalize_longitude(phi_rad * RAD_TO_DEG)),
        Angle::from_radians(theta_rad),
    )
}

/// Settings for the bounded 1-D Newton solver.
pub struct NewtonConfig {
    pub bounds: (f64, f64),
    pub max_iter: usize,
    pub tol: f64,
    pub context: &'static str,
}

impl NewtonConfig {
    pub const DEFAULT_MAX_ITER: usize = 50;
    pub const DEFAULT_TOL: f64 = 1e-12;

    pub const fn new(bounds: (f64, f64), context: &'static str) -> Self {
        Self {
            bounds,
            max_iter: Self::DEFAULT_MAX_ITER,
            tol: Self::DEFAULT_TOL,
            context,
        }
    }
}

pub fn newton_raphson_1d<F, FP>(
    initial: f64,
    target: f64,
    f: F,
    f_prime: FP,
    config: &NewtonConfig,
) -> WcsResult<f64>
where
    F: Fn(f64) -> f64,
    FP: Fn(f64) -> f64,
{
    let mut x = initial.clamp(config.bounds.0, config.bounds.1);

    for _ in 0..config.max_iter {
        let residual = f(x) - target;
        let slope = f_prime(x);

        if slope.abs() < 1e-15 {
            // flat spot: accept if we are already on target
            if residual.abs() < config.tol {
                return Ok(x);
            }
            return Err(WcsError::convergence_failure(format!(
                "{}: derivative too small",
                config.context
            )));
        }

        let delta = residual / slope;
        x = (x - delta).clamp(config.bounds.0, config.bounds.1);

        if delta.abs() < config.tol {
            return Ok(x);
        }
    }

    Err(WcsError::convergence_failure(format!(
        "{}: Newton-Raphson did not converge",
        config.context
    )))
}
