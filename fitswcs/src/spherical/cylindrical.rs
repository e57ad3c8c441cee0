use std::f64::consts::FRAC_PI_4;

use crate::angle::constants::{HALF_PI, RAD_TO_DEG};
use crate::common::{asin_safe, native_coord_from_radians};
use crate::coordinate::{IntermediateCoord, NativeCoord};
use crate::error::{WcsError, WcsResult};

// Cylindrical projections share x ∝ φ; only y(θ) differs.

#[inline]
fn plane(x_rad: f64, y_rad: f64) -> IntermediateCoord {
    IntermediateCoord::new(x_rad * RAD_TO_DEG, y_rad * RAD_TO_DEG)
}

pub(crate) fn project_car(native: NativeCoord) -> IntermediateCoord {
    IntermediateCoord::new(native.phi().degrees(), native.theta().degrees())
}

pub(crate) fn deproject_car(inter: IntermediateCoord) -> NativeCoord {
    native_coord_from_radians(inter.x_rad(), inter.y_rad())
}

pub(crate) fn project_mer(native: NativeCoord) -> WcsResult<IntermediateCoord> {
    let theta = native.theta().radians();
    if theta.abs() >= HALF_PI - 1e-10 {
        return Err(WcsError::singularity("MER: undefined at the poles"));
    }
    let y = (FRAC_PI_4 + theta / 2.0).tan().ln();
    Ok(plane(native.phi().radians(), y))
}

pub(crate) fn deproject_mer(inter: IntermediateCoord) -> NativeCoord {
    let theta = 2.0 * inter.y_rad().exp().atan() - HALF_PI;
    native_coord_from_radians(inter.x_rad(), theta)
}

pub(crate) fn project_cea(native: NativeCoord, lambda: f64) -> IntermediateCoord {
    plane(native.phi().radians(), native.theta().radians().sin() / lambda)
}

pub(crate) fn deproject_cea(inter: IntermediateCoord, lambda: f64) -> WcsResult<NativeCoord> {
    let sin_theta = lambda * inter.y_rad();
    if sin_theta.abs() > 1.0 + 1e-12 {
        return Err(WcsError::out_of_bounds("CEA: |y| beyond the projection edge"));
    }
    Ok(native_coord_from_radians(inter.x_rad(), asin_safe(sin_theta)))
}

/// Cylindrical perspective: x = λφ, y = (μ + λ) sin θ / (μ + cos θ).
pub(crate) fn project_cyp(native: NativeCoord, mu: f64, lambda: f64) -> WcsResult<IntermediateCoord> {
    let (sin_theta, cos_theta) = native.theta().sin_cos();
    let denom = mu + cos_theta;
    if denom.abs() < 1e-10 {
        return Err(WcsError::singularity("CYP: mu + cos(theta) = 0"));
    }
    Ok(plane(
        lambda * native.phi().radians(),
        (mu + lambda) * sin_theta / denom,
    ))
}

pub(crate) fn deproject_cyp(inter: IntermediateCoord, mu: f64, lambda: f64) -> WcsResult<NativeCoord> {
    let phi = inter.x_rad() / lambda;
    let eta = inter.y_rad() / (mu + lambda);

    let s = eta * mu / libm::sqrt(eta * eta + 1.0);
    if s.abs() > 1.0 + 1e-12 {
        return Err(WcsError::out_of_bounds("CYP: point outside the projection"));
    }
    let theta = eta.atan2(1.0) + asin_safe(s);
    if theta.abs() > HALF_PI + 1e-12 {
        return Err(WcsError::out_of_bounds("CYP: point outside the projection"));
    }
    Ok(native_coord_from_radians(phi, theta.clamp(-HALF_PI, HALF_PI)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::Angle;
    use crate::test_helpers::assert_close;

    fn native(phi: f64, theta: f64) -> NativeCoord {
        NativeCoord::new(Angle::from_degrees(phi), Angle::from_degrees(theta))
    }

    #[test]
    fn test_car_is_identity() {
        let inter = project_car(native(30.0, -20.0));
        assert_eq!((inter.x_deg(), inter.y_deg()), (30.0, -20.0));
        let n = deproject_car(IntermediateCoord::new(-45.0, 10.0));
        assert_close(n.phi().degrees(), -45.0, 1e-12);
        assert_close(n.theta().degrees(), 10.0, 1e-12);
    }

    #[test]
    fn test_mer_known_value() {
        let inter = project_mer(native(0.0, 45.0)).unwrap();
        let expected = (FRAC_PI_4 + FRAC_PI_4 / 2.0).tan().ln() * RAD_TO_DEG;
        assert_close(inter.y_deg(), expected, 1e-12);
    }

    #[test]
    fn test_mer_singular_at_pole() {
        assert!(matches!(
            project_mer(native(0.0, 90.0)),
            Err(WcsError::Singularity { .. })
        ));
    }

    #[test]
    fn test_mer_roundtrip() {
        for theta in [-80.0, -30.0, 0.0, 45.0, 75.0] {
            let n = deproject_mer(project_mer(native(120.0, theta)).unwrap());
            assert_close(n.phi().degrees(), 120.0, 1e-10);
            assert_close(n.theta().degrees(), theta, 1e-10);
        }
    }

    #[test]
    fn test_cea_equator_and_edge() {
        let inter = project_cea(native(0.0, 90.0), 1.0);
        assert_close(inter.y_deg(), RAD_TO_DEG, 1e-12);

        let beyond = IntermediateCoord::new(0.0, 1.1 * RAD_TO_DEG);
        assert!(matches!(
            deproject_cea(beyond, 1.0),
            Err(WcsError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_cea_roundtrip_with_lambda() {
        for theta in [-60.0, 0.0, 35.0] {
            let inter = project_cea(native(-70.0, theta), 0.5);
            let n = deproject_cea(inter, 0.5).unwrap();
            assert_close(n.phi().degrees(), -70.0, 1e-10);
            assert_close(n.theta().degrees(), theta, 1e-10);
        }
    }

    #[test]
    fn test_cyp_roundtrip() {
        for (mu, lambda) in [(1.0, 1.0), (1.0, 0.7071), (0.0, 1.0), (2.5, 0.5)] {
            for theta in [-60.0, -10.0, 0.0, 40.0, 80.0] {
                let inter = project_cyp(native(50.0, theta), mu, lambda).unwrap();
                let n = deproject_cyp(inter, mu, lambda).unwrap();
                assert_close(n.phi().degrees(), 50.0, 1e-9);
                assert_close(n.theta().degrees(), theta, 1e-9);
            }
        }
    }

    #[test]
    fn test_cyp_singularity() {
        assert!(matches!(
            project_cyp(native(0.0, 90.0), 0.0, 1.0),
            Err(WcsError::Singularity { .. })
        ));
    }
}
