//! Native spherical coordinates: projections and the rotation to celestial.
//!
//! A projection maps intermediate world coordinates (degrees on the plane of
//! projection) to native longitude/latitude (φ, θ). The [`SphericalRotation`]
//! then turns native coordinates into celestial (α, δ) given the reference
//! point and pole keywords.

use std::collections::HashMap;

use crate::angle::constants::{HALF_PI, RAD_TO_DEG};
use crate::angle::{normalize_longitude, wrap_0_360, Angle};
use crate::common::{asin_safe, native_coord_from_radians};
use crate::coordinate::{CelestialCoord, IntermediateCoord, NativeCoord};
use crate::error::{WcsError, WcsResult};

mod cylindrical;
mod pseudocylindrical;
mod zenithal;

use cylindrical::{deproject_car, deproject_cea, deproject_cyp, deproject_mer};
use cylindrical::{project_car, project_cea, project_cyp, project_mer};
use pseudocylindrical::{deproject_ait, deproject_mol, deproject_par, deproject_sfl};
use pseudocylindrical::{project_ait, project_mol, project_par, project_sfl};
use zenithal::{deproject_azp, deproject_sin, deproject_zenithal, project_azp, project_sin};
use zenithal::{project_zenithal, Radial};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalRotation {
    alpha_p: f64,
    delta_p: f64,
    phi_p: f64,
    sin_delta_p: f64,
    cos_delta_p: f64,
}

impl SphericalRotation {
    pub fn new(alpha_p: Angle, delta_p: Angle, phi_p: Angle) -> Self {
        let (sin_delta_p, cos_delta_p) = delta_p.sin_cos();
        Self {
            alpha_p: alpha_p.radians(),
            delta_p: delta_p.radians(),
            phi_p: phi_p.radians(),
            sin_delta_p,
            cos_delta_p,
        }
    }

    /// Default `LONPOLE`: 0° when the reference latitude reaches the native
    /// reference latitude, 180° otherwise.
    pub fn default_lonpole(delta_0: Angle, theta_0: Angle) -> Angle {
        if delta_0.radians() >= theta_0.radians() {
            Angle::ZERO
        } else {
            Angle::from_degrees(180.0)
        }
    }

    /// Derives the celestial pole from the reference point (`CRVAL`), the
    /// projection's native reference latitude θ₀ and the optional `LONPOLE` /
    /// `LATPOLE` keywords.
    pub fn from_crval(
        alpha_0: Angle,
        delta_0: Angle,
        theta_0: Angle,
        lonpole: Option<Angle>,
        latpole: Option<Angle>,
    ) -> WcsResult<Self> {
        let phi_p = lonpole.unwrap_or_else(|| Self::default_lonpole(delta_0, theta_0));
        let latpole_rad = latpole.map(Angle::radians).unwrap_or(HALF_PI);

        let sin_delta_0 = delta_0.sin_cos().0;
        let (sin_theta_0, cos_theta_0) = theta_0.sin_cos();
        let (sin_phi_p, cos_phi_p) = phi_p.sin_cos();

        let delta_p = solve_pole_latitude(
            sin_delta_0,
            sin_theta_0,
            cos_theta_0,
            sin_phi_p,
            cos_phi_p,
            latpole_rad,
        )?;

        // α_p follows from requiring (φ₀, θ₀) to land on (α₀, δ₀); when both
        // arguments vanish the reference point sits on the pole and α_p = α₀.
        let (sin_delta_p, cos_delta_p) = delta_p.sin_cos();
        let x = cos_theta_0 * sin_phi_p;
        let y = sin_theta_0 * cos_delta_p - cos_theta_0 * sin_delta_p * cos_phi_p;
        let alpha_p = if x.abs() < 1e-15 && y.abs() < 1e-15 {
            alpha_0.radians()
        } else {
            alpha_0.radians() - x.atan2(y)
        };

        Ok(Self::new(
            Angle::from_degrees(normalize_longitude(alpha_p * RAD_TO_DEG)),
            Angle::from_radians(delta_p),
            phi_p,
        ))
    }

    pub fn native_to_celestial(&self, native: NativeCoord) -> CelestialCoord {
        let (sin_theta, cos_theta) = native.theta().sin_cos();
        let d_phi = native.phi().radians() - self.phi_p;
        let (sin_d_phi, cos_d_phi) = d_phi.sin_cos();

        let sin_delta = sin_theta * self.sin_delta_p + cos_theta * self.cos_delta_p * cos_d_phi;
        let delta = asin_safe(sin_delta);

        let x = -cos_theta * sin_d_phi;
        let y = sin_theta * self.cos_delta_p - cos_theta * self.sin_delta_p * cos_d_phi;
        let alpha = self.alpha_p + x.atan2(y);

        CelestialCoord::new(
            Angle::from_degrees(wrap_0_360(alpha * RAD_TO_DEG)),
            Angle::from_radians(delta),
        )
    }

    pub fn celestial_to_native(&self, celestial: CelestialCoord) -> NativeCoord {
        let (sin_delta, cos_delta) = celestial.delta().sin_cos();
        let d_alpha = celestial.alpha().radians() - self.alpha_p;
        let (sin_d_alpha, cos_d_alpha) = d_alpha.sin_cos();

        let sin_theta = sin_delta * self.sin_delta_p + cos_delta * self.cos_delta_p * cos_d_alpha;
        let theta = asin_safe(sin_theta);

        let x = -cos_delta * sin_d_alpha;
        let y = sin_delta * self.cos_delta_p - cos_delta * self.sin_delta_p * cos_d_alpha;
        let phi = self.phi_p + x.atan2(y);

        native_coord_from_radians(phi, theta)
    }

    #[inline]
    pub fn alpha_p_degrees(&self) -> f64 {
        self.alpha_p * RAD_TO_DEG
    }

    #[inline]
    pub fn phi_p_degrees(&self) -> f64 {
        self.phi_p * RAD_TO_DEG
    }

    #[inline]
    pub fn delta_p_degrees(&self) -> f64 {
        self.delta_p * RAD_TO_DEG
    }
}

/// Celestial latitude of the native pole (Paper II eq. 9). Two solutions
/// exist in general; `LATPOLE` picks the closer one.
fn solve_pole_latitude(
    sin_delta_0: f64,
    sin_theta_0: f64,
    cos_theta_0: f64,
    sin_phi_p: f64,
    cos_phi_p: f64,
    latpole_rad: f64,
) -> WcsResult<f64> {
    let k = cos_theta_0 * sin_phi_p;
    let denom_sq = 1.0 - k * k;

    if denom_sq.abs() < 1e-15 {
        if sin_delta_0.abs() < 1e-15 {
            return Ok(latpole_rad);
        }
        return Err(WcsError::invalid_parameter(
            "no celestial pole satisfies CRVAL2 with this LONPOLE",
        ));
    }

    let arg = sin_delta_0 / denom_sq.sqrt();
    if arg.abs() > 1.0 + 1e-12 {
        return Err(WcsError::invalid_parameter(
            "no celestial pole satisfies CRVAL2 with this LONPOLE",
        ));
    }

    let base = sin_theta_0.atan2(cos_theta_0 * cos_phi_p);
    let spread = arg.clamp(-1.0, 1.0).acos();

    const BOUNDARY_TOL: f64 = 1e-12;
    let in_range = |v: f64| (-HALF_PI - BOUNDARY_TOL..=HALF_PI + BOUNDARY_TOL).contains(&v);

    let candidates = [base + spread, base - spread];
    let mut best: Option<f64> = None;
    for candidate in candidates.into_iter().filter(|v| in_range(*v)) {
        best = match best {
            Some(b) if (b - latpole_rad).abs() <= (candidate - latpole_rad).abs() => Some(b),
            _ => Some(candidate),
        };
    }

    best.map(|v| v.clamp(-HALF_PI, HALF_PI))
        .ok_or_else(|| WcsError::invalid_parameter("celestial pole latitude outside [-90, 90]"))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Tan,
    Sin { xi: f64, eta: f64 },
    Arc,
    Stg,
    Zea,
    Azp { mu: f64, gamma: f64 },
    Car,
    Mer,
    Cea { lambda: f64 },
    Cyp { mu: f64, lambda: f64 },
    Sfl,
    Par,
    Mol,
    Ait,
}

impl Projection {
    /// Builds a projection from its three-letter code and the `PV2_m`
    /// parameters (keyed by `m`), applying the standard defaults.
    pub fn from_code(code: &str, pv: &HashMap<u8, f64>) -> WcsResult<Self> {
        let param = |m: u8, default: f64| pv.get(&m).copied().unwrap_or(default);

        let projection = match code {
            "TAN" => Self::Tan,
            "SIN" => Self::Sin {
                xi: param(1, 0.0),
                eta: param(2, 0.0),
            },
            "ARC" => Self::Arc,
            "STG" => Self::Stg,
            "ZEA" => Self::Zea,
            "AZP" => Self::Azp {
                mu: param(1, 0.0),
                gamma: param(2, 0.0),
            },
            "CAR" => Self::Car,
            "MER" => Self::Mer,
            "CEA" => Self::Cea {
                lambda: param(1, 1.0),
            },
            "CYP" => Self::Cyp {
                mu: param(1, 1.0),
                lambda: param(2, 1.0),
            },
            "SFL" | "GLS" => Self::Sfl,
            "PAR" => Self::Par,
            "MOL" => Self::Mol,
            "AIT" => Self::Ait,
            other => return Err(WcsError::unsupported_projection(other)),
        };
        projection.validate()?;
        Ok(projection)
    }

    fn validate(&self) -> WcsResult<()> {
        match *self {
            Self::Azp { mu, gamma } => {
                if mu == -1.0 {
                    return Err(WcsError::invalid_parameter("AZP: PV2_1 (mu) cannot be -1"));
                }
                if gamma.abs() >= 90.0 {
                    return Err(WcsError::invalid_parameter(
                        "AZP: PV2_2 (gamma) must lie in (-90, 90)",
                    ));
                }
            }
            Self::Cea { lambda } => {
                if lambda <= 0.0 || lambda > 1.0 {
                    return Err(WcsError::invalid_parameter(
                        "CEA: PV2_1 (lambda) must lie in (0, 1]",
                    ));
                }
            }
            Self::Cyp { mu, lambda } => {
                if lambda == 0.0 || mu == -lambda {
                    return Err(WcsError::invalid_parameter(
                        "CYP: PV2_2 must be non-zero and mu + lambda non-zero",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Tan => "TAN",
            Self::Sin { .. } => "SIN",
            Self::Arc => "ARC",
            Self::Stg => "STG",
            Self::Zea => "ZEA",
            Self::Azp { .. } => "AZP",
            Self::Car => "CAR",
            Self::Mer => "MER",
            Self::Cea { .. } => "CEA",
            Self::Cyp { .. } => "CYP",
            Self::Sfl => "SFL",
            Self::Par => "PAR",
            Self::Mol => "MOL",
            Self::Ait => "AIT",
        }
    }

    /// `PV2_m` values that differ from the projection defaults.
    pub fn pv_params(&self) -> Vec<(u8, f64)> {
        match *self {
            Self::Sin { xi, eta } if xi != 0.0 || eta != 0.0 => vec![(1, xi), (2, eta)],
            Self::Azp { mu, gamma } if mu != 0.0 || gamma != 0.0 => vec![(1, mu), (2, gamma)],
            Self::Cea { lambda } if lambda != 1.0 => vec![(1, lambda)],
            Self::Cyp { mu, lambda } if mu != 1.0 || lambda != 1.0 => vec![(1, mu), (2, lambda)],
            _ => Vec::new(),
        }
    }

    /// Native coordinates (φ₀, θ₀) of the reference point, in degrees.
    pub fn native_reference(&self) -> (f64, f64) {
        if self.is_zenithal() {
            (0.0, 90.0)
        } else {
            (0.0, 0.0)
        }
    }

    pub fn is_zenithal(&self) -> bool {
        matches!(
            self,
            Self::Tan | Self::Sin { .. } | Self::Arc | Self::Stg | Self::Zea | Self::Azp { .. }
        )
    }

    pub fn project(&self, native: NativeCoord) -> WcsResult<IntermediateCoord> {
        match self {
            Self::Tan => project_zenithal(native, Radial::Gnomonic),
            Self::Sin { xi, eta } => project_sin(native, *xi, *eta),
            Self::Arc => project_zenithal(native, Radial::Equidistant),
            Self::Stg => project_zenithal(native, Radial::Stereographic),
            Self::Zea => project_zenithal(native, Radial::EqualArea),
            Self::Azp { mu, gamma } => project_azp(native, *mu, *gamma),
            Self::Car => Ok(project_car(native)),
            Self::Mer => project_mer(native),
            Self::Cea { lambda } => Ok(project_cea(native, *lambda)),
            Self::Cyp { mu, lambda } => project_cyp(native, *mu, *lambda),
            Self::Sfl => Ok(project_sfl(native)),
            Self::Par => Ok(project_par(native)),
            Self::Mol => project_mol(native),
            Self::Ait => project_ait(native),
        }
    }

    pub fn deproject(&self, inter: IntermediateCoord) -> WcsResult<NativeCoord> {
        match self {
            Self::Tan => deproject_zenithal(inter, Radial::Gnomonic),
            Self::Sin { xi, eta } => deproject_sin(inter, *xi, *eta),
            Self::Arc => deproject_zenithal(inter, Radial::Equidistant),
            Self::Stg => deproject_zenithal(inter, Radial::Stereographic),
            Self::Zea => deproject_zenithal(inter, Radial::EqualArea),
            Self::Azp { mu, gamma } => deproject_azp(inter, *mu, *gamma),
            Self::Car => Ok(deproject_car(inter)),
            Self::Mer => Ok(deproject_mer(inter)),
            Self::Cea { lambda } => deproject_cea(inter, *lambda),
            Self::Cyp { mu, lambda } => deproject_cyp(inter, *mu, *lambda),
            Self::Sfl => deproject_sfl(inter),
            Self::Par => deproject_par(inter),
            Self::Mol => deproject_mol(inter),
            Self::Ait => deproject_ait(inter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_ulp_lt;
    use crate::test_helpers::assert_close;

    fn native(phi: f64, theta: f64) -> NativeCoord {
        NativeCoord::new(Angle::from_degrees(phi), Angle::from_degrees(theta))
    }

    #[test]
    fn test_native_to_celestial_reference_point() {
        let rot = SphericalRotation::new(
            Angle::from_degrees(180.0),
            Angle::from_degrees(45.0),
            Angle::from_degrees(180.0),
        );
        let celestial = rot.native_to_celestial(native(0.0, 90.0));

        assert_ulp_lt!(celestial.alpha().degrees(), 180.0, 1);
        assert_ulp_lt!(celestial.delta().degrees(), 45.0, 1);
    }

    #[test]
    fn test_celestial_longitude_in_0_360() {
        let rot = SphericalRotation::from_crval(
            Angle::from_degrees(0.5),
            Angle::from_degrees(10.0),
            Angle::from_degrees(90.0),
            None,
            None,
        )
        .unwrap();
        // one degree either side of a reference point just east of RA = 0
        let a = rot.native_to_celestial(native(90.0, 89.0)).alpha().degrees();
        let b = rot.native_to_celestial(native(-90.0, 89.0)).alpha().degrees();
        assert!((0.0..360.0).contains(&a));
        assert!((0.0..360.0).contains(&b));
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        assert!(low < 2.0);
        assert!(high > 359.0);
    }

    #[test]
    fn test_spherical_rotation_roundtrip() {
        let rot = SphericalRotation::new(
            Angle::from_degrees(120.0),
            Angle::from_degrees(35.0),
            Angle::from_degrees(180.0),
        );

        let original = native(45.0, 60.0);
        let recovered = rot.celestial_to_native(rot.native_to_celestial(original));

        assert_close(original.phi().degrees(), recovered.phi().degrees(), 1e-10);
        assert_close(original.theta().degrees(), recovered.theta().degrees(), 1e-10);
    }

    #[test]
    fn test_from_crval_zenithal_maps_reference_point() {
        for (ra, dec) in [(180.0, 45.0), (10.0, -60.0), (300.0, 0.0), (0.0, 89.0)] {
            let rot = SphericalRotation::from_crval(
                Angle::from_degrees(ra),
                Angle::from_degrees(dec),
                Angle::from_degrees(90.0),
                None,
                None,
            )
            .unwrap();
            let celestial = rot.native_to_celestial(native(0.0, 90.0));
            assert_close(celestial.alpha().degrees(), ra, 1e-9);
            assert_close(celestial.delta().degrees(), dec, 1e-9);
        }
    }

    #[test]
    fn test_from_crval_cylindrical_maps_reference_point() {
        for (lon, lat) in [(266.4, -28.9), (45.0, 30.0), (120.0, -10.0)] {
            let rot = SphericalRotation::from_crval(
                Angle::from_degrees(lon),
                Angle::from_degrees(lat),
                Angle::ZERO,
                None,
                None,
            )
            .unwrap();
            let celestial = rot.native_to_celestial(native(0.0, 0.0));
            assert_close(celestial.alpha().degrees(), lon, 1e-9);
            assert_close(celestial.delta().degrees(), lat, 1e-9);
        }
    }

    #[test]
    fn test_from_crval_at_celestial_pole() {
        let rot = SphericalRotation::from_crval(
            Angle::from_degrees(0.0),
            Angle::from_degrees(90.0),
            Angle::from_degrees(90.0),
            Some(Angle::from_degrees(180.0)),
            None,
        )
        .unwrap();

        let celestial = rot.native_to_celestial(native(0.0, 90.0));
        assert_ulp_lt!(celestial.delta().degrees(), 90.0, 2);
    }

    #[test]
    fn test_default_lonpole() {
        let zen = SphericalRotation::default_lonpole(Angle::from_degrees(45.0), Angle::from_degrees(90.0));
        assert_eq!(zen.degrees(), 180.0);
        let cyl = SphericalRotation::default_lonpole(Angle::from_degrees(45.0), Angle::ZERO);
        assert_eq!(cyl.degrees(), 0.0);
    }

    #[test]
    fn test_explicit_lonpole_changes_orientation() {
        let default = SphericalRotation::from_crval(
            Angle::from_degrees(180.0),
            Angle::from_degrees(45.0),
            Angle::from_degrees(90.0),
            None,
            None,
        )
        .unwrap();
        let rotated = SphericalRotation::from_crval(
            Angle::from_degrees(180.0),
            Angle::from_degrees(45.0),
            Angle::from_degrees(90.0),
            Some(Angle::from_degrees(90.0)),
            None,
        )
        .unwrap();

        let a = default.native_to_celestial(native(30.0, 60.0));
        let b = rotated.native_to_celestial(native(30.0, 60.0));
        let diff = (a.alpha().degrees() - b.alpha().degrees()).abs()
            + (a.delta().degrees() - b.delta().degrees()).abs();
        assert!(diff > 0.1);
    }

    #[test]
    fn test_latpole_selects_pole_solution() {
        let north = SphericalRotation::from_crval(
            Angle::from_degrees(180.0),
            Angle::from_degrees(45.0),
            Angle::ZERO,
            None,
            Some(Angle::from_degrees(90.0)),
        )
        .unwrap();
        let south = SphericalRotation::from_crval(
            Angle::from_degrees(180.0),
            Angle::from_degrees(45.0),
            Angle::ZERO,
            None,
            Some(Angle::from_degrees(-90.0)),
        )
        .unwrap();

        assert!(north.delta_p_degrees() > 0.0);
        assert!(south.delta_p_degrees() < 0.0);

        for rot in [north, south] {
            let c = rot.native_to_celestial(native(0.0, 0.0));
            assert_close(c.alpha().degrees(), 180.0, 1e-9);
            assert_close(c.delta().degrees(), 45.0, 1e-9);
        }
    }

    #[test]
    fn test_from_code_defaults_and_params() {
        let pv = HashMap::new();
        assert_eq!(Projection::from_code("TAN", &pv).unwrap(), Projection::Tan);
        assert_eq!(
            Projection::from_code("SIN", &pv).unwrap(),
            Projection::Sin { xi: 0.0, eta: 0.0 }
        );
        assert_eq!(
            Projection::from_code("CYP", &pv).unwrap(),
            Projection::Cyp { mu: 1.0, lambda: 1.0 }
        );

        let pv: HashMap<u8, f64> = [(1, 0.5)].into_iter().collect();
        assert_eq!(
            Projection::from_code("CEA", &pv).unwrap(),
            Projection::Cea { lambda: 0.5 }
        );
        assert_eq!(Projection::from_code("GLS", &pv).unwrap(), Projection::Sfl);
    }

    #[test]
    fn test_from_code_rejects_unknown_and_bad_params() {
        let pv = HashMap::new();
        assert!(matches!(
            Projection::from_code("HPX", &pv),
            Err(WcsError::UnsupportedProjection { .. })
        ));

        let pv: HashMap<u8, f64> = [(1, 2.0)].into_iter().collect();
        assert!(Projection::from_code("CEA", &pv).is_err());
    }

    #[test]
    fn test_code_and_pv_params() {
        assert_eq!(Projection::Ait.code(), "AIT");
        assert!(Projection::Sin { xi: 0.0, eta: 0.0 }.pv_params().is_empty());
        assert_eq!(
            Projection::Sin { xi: 0.1, eta: 0.0 }.pv_params(),
            vec![(1, 0.1), (2, 0.0)]
        );
        assert_eq!(Projection::Cea { lambda: 0.5 }.pv_params(), vec![(1, 0.5)]);
    }

    #[test]
    fn test_native_reference() {
        assert_eq!(Projection::Tan.native_reference(), (0.0, 90.0));
        assert_eq!(Projection::Car.native_reference(), (0.0, 0.0));
        assert_eq!(Projection::Mol.native_reference(), (0.0, 0.0));
    }

    #[test]
    fn test_every_projection_roundtrips_near_reference() {
        let projections = [
            Projection::Tan,
            Projection::Sin { xi: 0.0, eta: 0.0 },
            Projection::Sin { xi: 0.1, eta: -0.05 },
            Projection::Arc,
            Projection::Stg,
            Projection::Zea,
            Projection::Azp { mu: 2.0, gamma: 0.0 },
            Projection::Azp { mu: 2.0, gamma: 30.0 },
            Projection::Car,
            Projection::Mer,
            Projection::Cea { lambda: 0.75 },
            Projection::Cyp { mu: 1.0, lambda: 0.7 },
            Projection::Sfl,
            Projection::Par,
            Projection::Mol,
            Projection::Ait,
        ];

        for proj in projections {
            let (_, theta_0) = proj.native_reference();
            for (dphi, dtheta) in [(10.0, -5.0), (-25.0, -20.0), (60.0, -15.0)] {
                let theta = if proj.is_zenithal() {
                    theta_0 + dtheta
                } else {
                    theta_0 - dtheta
                };
                let original = native(dphi, theta);
                let inter = proj.project(original).unwrap();
                let recovered = proj.deproject(inter).unwrap();
                assert_close(recovered.phi().degrees(), dphi, 1e-9);
                assert_close(recovered.theta().degrees(), theta, 1e-9);
            }
        }
    }
}
