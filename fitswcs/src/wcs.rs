use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::angle::Angle;
use crate::coordinate::{CelestialCoord, Origin, PixelCoord};
use crate::distortion::{DistortionPipeline, SipDistortion};
use crate::error::{WcsError, WcsResult};
use crate::header::WcsKeyword;
use crate::linear::LinearTransform;
use crate::solver::{self, PointSolution, SolverConfig};
use crate::spherical::{Projection, SphericalRotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordType {
    #[default]
    Equatorial,
    Galactic,
    Ecliptic,
    Helioecliptic,
    Supergalactic,
    Generic,
}

impl CoordType {
    pub fn from_ctype_prefix(prefix: &str) -> Self {
        match prefix {
            "RA" | "DEC" => Self::Equatorial,
            "GLON" | "GLAT" => Self::Galactic,
            "ELON" | "ELAT" => Self::Ecliptic,
            "HLON" | "HLAT" => Self::Helioecliptic,
            "SLON" | "SLAT" => Self::Supergalactic,
            _ => Self::Generic,
        }
    }

    /// `CTYPE` prefixes of the longitude and latitude axes.
    pub fn axis_prefixes(self) -> (&'static str, &'static str) {
        match self {
            Self::Equatorial => ("RA", "DEC"),
            Self::Galactic => ("GLON", "GLAT"),
            Self::Ecliptic => ("ELON", "ELAT"),
            Self::Helioecliptic => ("HLON", "HLAT"),
            Self::Supergalactic => ("SLON", "SLAT"),
            Self::Generic => ("XLON", "XLAT"),
        }
    }
}

/// A two-axis celestial WCS with optional distortion corrections.
///
/// Pixel arguments and results carry an [`Origin`]; world coordinates are
/// `(longitude, latitude)` in degrees with longitude in `[0, 360)`.
#[derive(Debug, Clone)]
pub struct Wcs {
    pub(crate) linear: LinearTransform,
    pub(crate) projection: Projection,
    pub(crate) rotation: SphericalRotation,
    pub(crate) coord_type: CoordType,
    pub(crate) axis_prefixes: [String; 2],
    pub(crate) crval: [f64; 2],
    pub(crate) latpole: Option<f64>,
    pub(crate) distortion: DistortionPipeline,
    pub(crate) image_shape: Option<[usize; 2]>,
    pub(crate) solver: SolverConfig,
}

impl Wcs {
    pub(crate) fn core_pixel_to_world(&self, pixel: PixelCoord) -> WcsResult<[f64; 2]> {
        if !pixel.x().is_finite() || !pixel.y().is_finite() {
            return Err(WcsError::out_of_bounds("non-finite pixel coordinate"));
        }
        let intermediate = self.linear.pixel_to_intermediate(pixel);
        let native = self.projection.deproject(intermediate)?;
        let celestial = self.rotation.native_to_celestial(native);
        Ok([celestial.alpha().degrees(), celestial.delta().degrees()])
    }

    pub(crate) fn core_world_to_pixel(&self, lon: f64, lat: f64) -> WcsResult<PixelCoord> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(WcsError::out_of_bounds("non-finite world coordinate"));
        }
        if lat.abs() > 90.0 {
            return Err(WcsError::out_of_bounds(format!("latitude {} outside [-90, 90]", lat)));
        }
        let celestial = CelestialCoord::from_degrees(lon, lat);
        let native = self.rotation.celestial_to_native(celestial);
        let intermediate = self.projection.project(native)?;
        Ok(self.linear.intermediate_to_pixel(intermediate))
    }

    fn pix2foc_fits(&self, pixel: PixelCoord) -> PixelCoord {
        let (x, y) = self.distortion.pix2foc(pixel.x(), pixel.y());
        PixelCoord::new(x, y)
    }

    /// Inverts the distortion pipeline at a 1-based focal-plane position.
    pub(crate) fn solve_foc2pix(&self, foc: PixelCoord, config: &SolverConfig) -> PointSolution {
        if self.distortion.is_empty() {
            return PointSolution::converged([foc.x(), foc.y()]);
        }
        solver::invert(
            [foc.x(), foc.y()],
            |p| {
                let (x, y) = self.distortion.pix2foc(p[0], p[1]);
                [x, y]
            },
            config,
        )
    }

    /// Moves solver results into `origin` and reports any that failed.
    pub(crate) fn finish_solutions(
        &self,
        mut solutions: Vec<PointSolution>,
        config: &SolverConfig,
        origin: Origin,
    ) -> WcsResult<Vec<[f64; 2]>> {
        for solution in &mut solutions {
            let [x, y] = solution.pixel;
            solution.pixel = origin.from_fits(PixelCoord::new(x, y));
        }
        solver::collect(solutions, config)
    }

    fn finish_single(
        &self,
        solution: PointSolution,
        config: &SolverConfig,
        origin: Origin,
    ) -> WcsResult<[f64; 2]> {
        let pixels = self.finish_solutions(vec![solution], config, origin)?;
        Ok(pixels.first().copied().unwrap_or([f64::NAN, f64::NAN]))
    }

    /// Pixel to world through the full pipeline: detector-to-image tables,
    /// SIP and lookup distortion, then the core transformation.
    pub fn all_pix2world(&self, x: f64, y: f64, origin: Origin) -> WcsResult<[f64; 2]> {
        let focal = self.pix2foc_fits(origin.to_fits(x, y));
        self.core_pixel_to_world(focal)
    }

    /// Pixel to world ignoring all distortion.
    pub fn wcs_pix2world(&self, x: f64, y: f64, origin: Origin) -> WcsResult<[f64; 2]> {
        self.core_pixel_to_world(origin.to_fits(x, y))
    }

    /// World to pixel ignoring all distortion.
    pub fn wcs_world2pix(&self, lon: f64, lat: f64, origin: Origin) -> WcsResult<[f64; 2]> {
        Ok(origin.from_fits(self.core_world_to_pixel(lon, lat)?))
    }

    /// World to pixel including distortion, inverted iteratively with the
    /// WCS's own [`SolverConfig`].
    pub fn all_world2pix(&self, lon: f64, lat: f64, origin: Origin) -> WcsResult<[f64; 2]> {
        self.all_world2pix_with(lon, lat, origin, &self.solver)
    }

    pub fn all_world2pix_with(
        &self,
        lon: f64,
        lat: f64,
        origin: Origin,
        config: &SolverConfig,
    ) -> WcsResult<[f64; 2]> {
        config.validate()?;
        let focal = self.core_world_to_pixel(lon, lat)?;
        let solution = self.solve_foc2pix(focal, config);
        self.finish_single(solution, config, origin)
    }

    /// Applies only the SIP polynomial. Without SIP the input is returned.
    pub fn sip_pix2foc(&self, x: f64, y: f64, origin: Origin) -> [f64; 2] {
        let p = origin.to_fits(x, y);
        let (fx, fy) = self.distortion.sip_pix2foc(p.x(), p.y());
        origin.from_fits(PixelCoord::new(fx, fy))
    }

    /// Inverse of [`sip_pix2foc`](Self::sip_pix2foc), using `AP`/`BP` when
    /// present and Newton iteration otherwise.
    pub fn sip_foc2pix(&self, x: f64, y: f64, origin: Origin) -> WcsResult<[f64; 2]> {
        let p = origin.to_fits(x, y);
        let (px, py) = match &self.distortion.sip {
            Some(sip) => sip.foc2pix(p.x(), p.y())?,
            None => (p.x(), p.y()),
        };
        Ok(origin.from_fits(PixelCoord::new(px, py)))
    }

    /// Applies only the `CPDIS` lookup tables.
    pub fn p4_pix2foc(&self, x: f64, y: f64, origin: Origin) -> [f64; 2] {
        let p = origin.to_fits(x, y);
        let (fx, fy) = self.distortion.p4_pix2foc(p.x(), p.y());
        origin.from_fits(PixelCoord::new(fx, fy))
    }

    /// Applies only the detector-to-image lookup tables.
    pub fn det2im(&self, x: f64, y: f64, origin: Origin) -> [f64; 2] {
        let p = origin.to_fits(x, y);
        let (fx, fy) = self.distortion.det2im(p.x(), p.y());
        origin.from_fits(PixelCoord::new(fx, fy))
    }

    pub fn pix2foc(&self, x: f64, y: f64, origin: Origin) -> [f64; 2] {
        origin.from_fits(self.pix2foc_fits(origin.to_fits(x, y)))
    }

    pub fn foc2pix(&self, x: f64, y: f64, origin: Origin) -> WcsResult<[f64; 2]> {
        let solution = self.solve_foc2pix(origin.to_fits(x, y), &self.solver);
        self.finish_single(solution, &self.solver, origin)
    }

    /// World coordinates of the array element `(row, col)` (0-based, row
    /// along the second image axis).
    pub fn array_index_to_world(&self, row: f64, col: f64) -> WcsResult<[f64; 2]> {
        let pixel = PixelCoord::from_array_index(row, col);
        self.core_pixel_to_world(self.pix2foc_fits(pixel))
    }

    /// Nearest array element `(row, col)` for a world position.
    pub fn world_to_array_index(&self, lon: f64, lat: f64) -> WcsResult<(usize, usize)> {
        let [x, y] = self.all_world2pix(lon, lat, Origin::One)?;
        PixelCoord::new(x, y).to_array_index()
    }

    /// 0-based Cartesian pixel to world, distortion included.
    pub fn pixel_to_world_values(&self, x: f64, y: f64) -> WcsResult<[f64; 2]> {
        self.all_pix2world(x, y, Origin::Zero)
    }

    /// World to 0-based Cartesian pixel, distortion included.
    pub fn world_to_pixel_values(&self, lon: f64, lat: f64) -> WcsResult<[f64; 2]> {
        self.all_world2pix(lon, lat, Origin::Zero)
    }

    /// World coordinates of the image corners, in the order
    /// `(1, 1)`, `(1, NAXIS2)`, `(NAXIS1, NAXIS2)`, `(NAXIS1, 1)`.
    pub fn calc_footprint(&self, undistort: bool) -> WcsResult<[[f64; 2]; 4]> {
        let [n1, n2] = self
            .image_shape
            .ok_or_else(|| WcsError::missing_keyword("NAXIS1/NAXIS2"))?;
        let (n1, n2) = (n1 as f64, n2 as f64);
        let corners = [[1.0, 1.0], [1.0, n2], [n1, n2], [n1, 1.0]];

        let mut footprint = [[0.0; 2]; 4];
        for (out, [x, y]) in footprint.iter_mut().zip(corners) {
            *out = if undistort {
                self.all_pix2world(x, y, Origin::One)?
            } else {
                self.wcs_pix2world(x, y, Origin::One)?
            };
        }
        Ok(footprint)
    }

    pub fn has_distortion(&self) -> bool {
        !self.distortion.is_empty()
    }

    pub fn has_sip(&self) -> bool {
        self.distortion.sip.is_some()
    }

    pub fn sip(&self) -> Option<&SipDistortion> {
        self.distortion.sip.as_ref()
    }

    pub fn has_lookup_tables(&self) -> bool {
        self.distortion.lookup.is_some() || self.distortion.det2im.is_some()
    }

    #[inline]
    pub fn projection_code(&self) -> &'static str {
        self.projection.code()
    }

    #[inline]
    pub fn coord_type(&self) -> CoordType {
        self.coord_type
    }

    #[inline]
    pub fn crpix(&self) -> [f64; 2] {
        self.linear.crpix()
    }

    #[inline]
    pub fn crval(&self) -> [f64; 2] {
        self.crval
    }

    #[inline]
    pub fn cd_matrix(&self) -> [[f64; 2]; 2] {
        self.linear.cd_matrix()
    }

    /// Geometric-mean pixel scale in degrees per pixel.
    #[inline]
    pub fn pixel_scale(&self) -> f64 {
        self.linear.pixel_scale()
    }

    #[inline]
    pub fn pixel_scales(&self) -> [f64; 2] {
        self.linear.pixel_scales()
    }

    #[inline]
    pub fn image_shape(&self) -> Option<[usize; 2]> {
        self.image_shape
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    #[inline]
    pub fn rotation(&self) -> &SphericalRotation {
        &self.rotation
    }

    #[inline]
    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver
    }

    /// Copy of this WCS whose distortion inversions use `config`.
    pub fn with_solver_config(mut self, config: SolverConfig) -> WcsResult<Self> {
        config.validate()?;
        self.solver = config;
        Ok(self)
    }

    pub fn ctypes(&self) -> [String; 2] {
        let suffix = if self.has_sip() { "-SIP" } else { "" };
        [
            format_ctype(&self.axis_prefixes[0], self.projection.code(), suffix),
            format_ctype(&self.axis_prefixes[1], self.projection.code(), suffix),
        ]
    }

    /// Header keywords describing this WCS. Lookup tables are not included
    /// because their data lives outside the header.
    pub fn to_keywords(&self) -> Vec<WcsKeyword> {
        let [ctype1, ctype2] = self.ctypes();
        let crpix = self.crpix();
        let cd = self.cd_matrix();

        let mut keywords = vec![WcsKeyword::integer("WCSAXES", 2)];
        if let Some([n1, n2]) = self.image_shape {
            keywords.push(WcsKeyword::integer("NAXIS1", n1 as i64));
            keywords.push(WcsKeyword::integer("NAXIS2", n2 as i64));
        }
        keywords.extend([
            WcsKeyword::string("CTYPE1", ctype1),
            WcsKeyword::string("CTYPE2", ctype2),
            WcsKeyword::real("CRPIX1", crpix[0]),
            WcsKeyword::real("CRPIX2", crpix[1]),
            WcsKeyword::real("CRVAL1", self.crval[0]),
            WcsKeyword::real("CRVAL2", self.crval[1]),
            WcsKeyword::real("CD1_1", cd[0][0]),
            WcsKeyword::real("CD1_2", cd[0][1]),
            WcsKeyword::real("CD2_1", cd[1][0]),
            WcsKeyword::real("CD2_2", cd[1][1]),
        ]);

        let (_, theta_0) = self.projection.native_reference();
        let default_lonpole = SphericalRotation::default_lonpole(
            Angle::from_degrees(self.crval[1]),
            Angle::from_degrees(theta_0),
        )
        .degrees();
        let lonpole = self.rotation.phi_p_degrees();
        if (lonpole - default_lonpole).abs() > 1e-10 {
            keywords.push(WcsKeyword::real("LONPOLE", lonpole));
        }
        if let Some(latpole) = self.latpole {
            keywords.push(WcsKeyword::real("LATPOLE", latpole));
        }

        keywords.extend(
            self.projection
                .pv_params()
                .into_iter()
                .map(|(m, v)| WcsKeyword::real(format!("PV2_{}", m), v)),
        );

        if let Some(sip) = &self.distortion.sip {
            keywords.extend(sip.to_keywords());
        }
        if self.has_lookup_tables() {
            debug!("lookup-table distortion omitted from exported keywords");
        }
        keywords
    }
}

fn format_ctype(prefix: &str, code: &str, suffix: &str) -> String {
    let dashes = "-".repeat(5usize.saturating_sub(prefix.len()).max(1));
    format!("{}{}{}{}", prefix, dashes, code, suffix)
}

impl fmt::Display for Wcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [ctype1, ctype2] = self.ctypes();
        let crpix = self.crpix();
        let cd = self.cd_matrix();

        writeln!(f, "WCS Keywords")?;
        writeln!(f)?;
        writeln!(f, "Number of WCS axes: 2")?;
        writeln!(f, "CTYPE : '{}'  '{}'", ctype1, ctype2)?;
        writeln!(f, "CRVAL : {}  {}", self.crval[0], self.crval[1])?;
        writeln!(f, "CRPIX : {}  {}", crpix[0], crpix[1])?;
        writeln!(f, "CD1_1 CD1_2 : {:e}  {:e}", cd[0][0], cd[0][1])?;
        writeln!(f, "CD2_1 CD2_2 : {:e}  {:e}", cd[1][0], cd[1][1])?;
        writeln!(
            f,
            "LONPOLE LATPOLE : {}  {}",
            self.rotation.phi_p_degrees(),
            self.rotation.delta_p_degrees()
        )?;
        match self.image_shape {
            Some([n1, n2]) => writeln!(f, "NAXIS : {}  {}", n1, n2)?,
            None => writeln!(f, "NAXIS : 0  0")?,
        }

        let mut parts = Vec::new();
        if self.distortion.det2im.is_some() {
            parts.push("det2im");
        }
        if self.has_sip() {
            parts.push("SIP");
        }
        if self.distortion.lookup.is_some() {
            parts.push("lookup");
        }
        if parts.is_empty() {
            write!(f, "Distortion : none")
        } else {
            write!(f, "Distortion : {}", parts.join(" + "))
        }
    }
}
