use std::collections::HashMap;

use log::{debug, warn};

use crate::angle::Angle;
use crate::distortion::{
    DistortionPipeline, LookupDistortion, LookupTableSource, SipDistortion, TableKind,
};
use crate::error::{WcsError, WcsResult};
use crate::header::KeywordProvider;
use crate::linear::LinearTransform;
use crate::solver::SolverConfig;
use crate::spherical::{Projection, SphericalRotation};
use crate::wcs::{CoordType, Wcs};

#[derive(Debug, Clone, PartialEq, Default)]
enum MatrixSpec {
    #[default]
    None,
    Cd([[f64; 2]; 2]),
    PcCdelt {
        pc: [[f64; 2]; 2],
        cdelt: [f64; 2],
    },
    Crota {
        cdelt: [f64; 2],
        crota: f64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct WcsBuilder {
    crpix: Option<[f64; 2]>,
    crval: Option<[f64; 2]>,
    matrix: MatrixSpec,
    projection: Option<Projection>,
    proj_code: Option<String>,
    lonpole: Option<f64>,
    latpole: Option<f64>,
    pv_params: HashMap<(u8, u8), f64>,
    coord_type: Option<CoordType>,
    axis_prefixes: Option<[String; 2]>,
    image_shape: Option<[usize; 2]>,
    sip: Option<SipDistortion>,
    lookup: Option<LookupDistortion>,
    det2im: Option<LookupDistortion>,
    solver: SolverConfig,
}

impl WcsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crpix(mut self, x: f64, y: f64) -> Self {
        self.crpix = Some([x, y]);
        self
    }

    pub fn crval(mut self, lon: f64, lat: f64) -> Self {
        self.crval = Some([lon, lat]);
        self
    }

    pub fn cd_matrix(mut self, cd: [[f64; 2]; 2]) -> Self {
        self.matrix = MatrixSpec::Cd(cd);
        self
    }

    pub fn pc_cdelt(mut self, pc: [[f64; 2]; 2], cdelt: [f64; 2]) -> Self {
        self.matrix = MatrixSpec::PcCdelt { pc, cdelt };
        self
    }

    /// Legacy `CDELTi` + `CROTA2` rotation, angle in degrees.
    pub fn crota(mut self, cdelt: [f64; 2], crota: f64) -> Self {
        self.matrix = MatrixSpec::Crota { cdelt, crota };
        self
    }

    pub fn projection(mut self, proj: Projection) -> Self {
        self.projection = Some(proj);
        self
    }

    pub fn lonpole(mut self, lonpole: f64) -> Self {
        self.lonpole = Some(lonpole);
        self
    }

    pub fn latpole(mut self, latpole: f64) -> Self {
        self.latpole = Some(latpole);
        self
    }

    /// `PVi_m` parameter. Projection parameters live on the latitude axis
    /// (`i = 2`).
    pub fn pv(mut self, axis: u8, index: u8, value: f64) -> Self {
        self.pv_params.insert((axis, index), value);
        self
    }

    pub fn coord_type(mut self, coord_type: CoordType) -> Self {
        self.coord_type = Some(coord_type);
        self.axis_prefixes = None;
        self
    }

    pub fn proj_code(mut self, code: impl Into<String>) -> Self {
        self.proj_code = Some(code.into());
        self
    }

    /// Image size as `(NAXIS1, NAXIS2)`.
    pub fn image_shape(mut self, naxis1: usize, naxis2: usize) -> Self {
        self.image_shape = Some([naxis1, naxis2]);
        self
    }

    pub fn sip(mut self, sip: SipDistortion) -> Self {
        self.sip = Some(sip);
        self
    }

    pub fn lookup(mut self, lookup: LookupDistortion) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn det2im(mut self, det2im: LookupDistortion) -> Self {
        self.det2im = Some(det2im);
        self
    }

    pub fn solver(mut self, config: SolverConfig) -> Self {
        self.solver = config;
        self
    }

    /// Reads a header that carries no lookup-table distortion data.
    pub fn from_header(header: &impl KeywordProvider) -> WcsResult<Self> {
        Self::from_header_with_tables(header, &())
    }

    /// Reads a header, fetching any `CPDIS`/`D2IMDIS` lookup tables it
    /// references from `tables`.
    pub fn from_header_with_tables(
        header: &impl KeywordProvider,
        tables: &impl LookupTableSource,
    ) -> WcsResult<Self> {
        for key in ["NAXIS", "WCSAXES"] {
            if let Some(n) = header.get_number(key) {
                if n < 2.0 {
                    return Err(WcsError::invalid_keyword(
                        key,
                        format!("need at least 2 axes, got {}", n),
                    ));
                }
            }
        }
        let image_shape = match (header.get_number("NAXIS1"), header.get_number("NAXIS2")) {
            (Some(n1), Some(n2)) => Some([
                read_axis_length("NAXIS1", n1)?,
                read_axis_length("NAXIS2", n2)?,
            ]),
            _ => None,
        };

        let ctype1 = header.require_string("CTYPE1")?;
        let ctype2 = header.require_string("CTYPE2")?;
        let axis1 = parse_ctype(&ctype1)?;
        let axis2 = parse_ctype(&ctype2)?;
        check_axis_pair(&axis1, &axis2)?;

        let coord_type = CoordType::from_ctype_prefix(axis1.prefix);
        let proj_code = axis1.proj_code.to_string();

        let crpix1 = header.require_float("CRPIX1")?;
        let crpix2 = header.require_float("CRPIX2")?;

        let crval1 = header.require_float("CRVAL1")?;
        let crval2 = header.require_float("CRVAL2")?;

        let matrix = parse_matrix(header)?;

        let lonpole = header.get_number("LONPOLE");
        let latpole = header.get_number("LATPOLE");

        let pv_params = parse_pv_params(header);

        let sip = SipDistortion::from_header(header, [crpix1, crpix2])?;
        match (&sip, axis1.sip) {
            (None, true) => {
                return Err(WcsError::invalid_keyword(
                    "CTYPE1",
                    "-SIP suffix without A_ORDER/B_ORDER",
                ))
            }
            (Some(_), false) => warn!(
                "SIP coefficients present but CTYPE lacks the -SIP suffix; applying them anyway"
            ),
            _ => {}
        }

        let lookup = LookupDistortion::from_header(header, tables, TableKind::Distortion)?;
        let det2im = LookupDistortion::from_header(header, tables, TableKind::DetectorToImage)?;

        let mut builder = Self::new()
            .crpix(crpix1, crpix2)
            .crval(crval1, crval2)
            .coord_type(coord_type)
            .proj_code(proj_code);

        builder.axis_prefixes = Some([axis1.prefix.to_string(), axis2.prefix.to_string()]);
        builder.matrix = matrix;
        builder.image_shape = image_shape;

        if let Some(lp) = lonpole {
            builder = builder.lonpole(lp);
        }
        if let Some(lp) = latpole {
            builder = builder.latpole(lp);
        }

        builder.pv_params = pv_params;
        builder.sip = sip;
        builder.lookup = lookup;
        builder.det2im = det2im;

        debug!(
            "header WCS: {} / {} matrix {:?}",
            ctype1.trim(),
            ctype2.trim(),
            builder.matrix
        );
        Ok(builder)
    }

    pub fn validate(&self) -> WcsResult<()> {
        if self.crpix.is_none() {
            return Err(WcsError::missing_keyword("CRPIX1/CRPIX2"));
        }
        let Some([lon, lat]) = self.crval else {
            return Err(WcsError::missing_keyword("CRVAL1/CRVAL2"));
        };
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return Err(WcsError::invalid_keyword(
                "CRVAL2",
                format!("reference point ({}, {}) is not on the sphere", lon, lat),
            ));
        }
        if self.matrix == MatrixSpec::None {
            return Err(WcsError::missing_keyword(
                "CD1_1 or CDELT1 (no transformation matrix found)",
            ));
        }
        if self.projection.is_none() && self.proj_code.is_none() {
            return Err(WcsError::missing_keyword("CTYPE1/CTYPE2 projection code"));
        }
        if let Some([n1, n2]) = self.image_shape {
            if n1 == 0 || n2 == 0 {
                return Err(WcsError::invalid_keyword("NAXIS1/NAXIS2", "image axes must be non-empty"));
            }
        }
        self.solver.validate()
    }

    pub fn build(self) -> WcsResult<Wcs> {
        self.validate()?;

        let crpix = self.crpix.ok_or_else(|| WcsError::missing_keyword("CRPIX1/CRPIX2"))?;
        let crval = self.crval.ok_or_else(|| WcsError::missing_keyword("CRVAL1/CRVAL2"))?;

        let linear = match self.matrix {
            MatrixSpec::Cd(cd) => LinearTransform::from_cd(crpix, cd)?,
            MatrixSpec::PcCdelt { pc, cdelt } => LinearTransform::from_pc_cdelt(crpix, pc, cdelt)?,
            MatrixSpec::Crota { cdelt, crota } => LinearTransform::from_crota(crpix, cdelt, crota)?,
            MatrixSpec::None => return Err(WcsError::missing_keyword("CD1_1 or CDELT1")),
        };

        let projection = match (self.projection, self.proj_code.as_deref()) {
            (Some(proj), _) => proj,
            (None, Some(code)) => Projection::from_code(code, &latitude_pv(&self.pv_params))?,
            (None, None) => return Err(WcsError::missing_keyword("CTYPE1/CTYPE2 projection code")),
        };

        let (_, theta_0) = projection.native_reference();

        let rotation = SphericalRotation::from_crval(
            Angle::from_degrees(crval[0]),
            Angle::from_degrees(crval[1]),
            Angle::from_degrees(theta_0),
            self.lonpole.map(Angle::from_degrees),
            self.latpole.map(Angle::from_degrees),
        )?;

        let coord_type = self.coord_type.unwrap_or_default();
        let axis_prefixes = self.axis_prefixes.unwrap_or_else(|| {
            let (lon, lat) = coord_type.axis_prefixes();
            [lon.to_string(), lat.to_string()]
        });

        debug!(
            "built {} WCS: pole ({}, {}), LONPOLE {}",
            projection.code(),
            rotation.alpha_p_degrees(),
            rotation.delta_p_degrees(),
            rotation.phi_p_degrees()
        );

        Ok(Wcs {
            linear,
            projection,
            rotation,
            coord_type,
            axis_prefixes,
            crval,
            latpole: self.latpole,
            distortion: DistortionPipeline {
                det2im: self.det2im,
                sip: self.sip,
                lookup: self.lookup,
            },
            image_shape: self.image_shape,
            solver: self.solver,
        })
    }
}

/// One parsed `CTYPEi` value such as `RA---TAN-SIP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CtypeParts<'a> {
    prefix: &'a str,
    proj_code: &'a str,
    sip: bool,
}

fn parse_ctype(ctype: &str) -> WcsResult<CtypeParts<'_>> {
    let trimmed = ctype.trim();
    let (body, sip) = match trimmed.strip_suffix("-SIP") {
        Some(body) => (body, true),
        None => (trimmed, false),
    };

    let Some(dash_pos) = body.rfind('-') else {
        return Err(WcsError::invalid_keyword(
            "CTYPE",
            format!("Invalid CTYPE format (no dash separator): '{}'", ctype),
        ));
    };
    if dash_pos == 0 {
        return Err(WcsError::invalid_keyword(
            "CTYPE",
            format!("Invalid CTYPE format: '{}'", ctype),
        ));
    }

    let prefix = body[..dash_pos].trim_end_matches('-');
    let proj_code = &body[dash_pos + 1..];
    if proj_code.is_empty() {
        return Err(WcsError::invalid_keyword(
            "CTYPE",
            format!("Missing projection code in CTYPE: '{}'", ctype),
        ));
    }

    Ok(CtypeParts {
        prefix,
        proj_code,
        sip,
    })
}

fn is_longitude(prefix: &str) -> bool {
    prefix == "RA" || prefix.ends_with("LON") || (prefix.len() == 4 && prefix.ends_with("LN"))
}

fn is_latitude(prefix: &str) -> bool {
    prefix == "DEC" || prefix.ends_with("LAT") || (prefix.len() == 4 && prefix.ends_with("LT"))
}

fn check_axis_pair(axis1: &CtypeParts<'_>, axis2: &CtypeParts<'_>) -> WcsResult<()> {
    if is_latitude(axis1.prefix) && is_longitude(axis2.prefix) {
        return Err(WcsError::invalid_keyword(
            "CTYPE1",
            "latitude on the first axis is not supported",
        ));
    }
    if !is_longitude(axis1.prefix) || !is_latitude(axis2.prefix) {
        return Err(WcsError::invalid_keyword(
            "CTYPE1/CTYPE2",
            format!(
                "'{}' and '{}' are not a celestial longitude/latitude pair",
                axis1.prefix, axis2.prefix
            ),
        ));
    }
    let system = CoordType::from_ctype_prefix(axis1.prefix);
    let same_system = system == CoordType::from_ctype_prefix(axis2.prefix)
        && (system != CoordType::Generic || axis1.prefix.get(..2) == axis2.prefix.get(..2));
    if !same_system {
        return Err(WcsError::invalid_keyword(
            "CTYPE1/CTYPE2",
            format!(
                "Mismatched coordinate systems: '{}' vs '{}'",
                axis1.prefix, axis2.prefix
            ),
        ));
    }
    if axis1.proj_code != axis2.proj_code {
        return Err(WcsError::invalid_keyword(
            "CTYPE1/CTYPE2",
            format!(
                "Mismatched projection codes: '{}' vs '{}'",
                axis1.proj_code, axis2.proj_code
            ),
        ));
    }
    if axis1.sip != axis2.sip {
        return Err(WcsError::invalid_keyword(
            "CTYPE1/CTYPE2",
            "-SIP suffix must appear on both axes",
        ));
    }
    Ok(())
}

fn read_axis_length(key: &str, value: f64) -> WcsResult<usize> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(WcsError::invalid_keyword(
            key,
            format!("expected a non-negative integer, got {}", value),
        ));
    }
    Ok(value as usize)
}

fn parse_matrix(header: &impl KeywordProvider) -> WcsResult<MatrixSpec> {
    let cd11 = header.get_number("CD1_1");
    let cd12 = header.get_number("CD1_2");
    let cd21 = header.get_number("CD2_1");
    let cd22 = header.get_number("CD2_2");

    if cd11.is_some() || cd12.is_some() || cd21.is_some() || cd22.is_some() {
        let cd = [
            [cd11.unwrap_or(0.0), cd12.unwrap_or(0.0)],
            [cd21.unwrap_or(0.0), cd22.unwrap_or(0.0)],
        ];
        return Ok(MatrixSpec::Cd(cd));
    }

    let cdelt1 = header.get_number("CDELT1");
    let cdelt2 = header.get_number("CDELT2");
    let has_pc = ["PC1_1", "PC1_2", "PC2_1", "PC2_2"]
        .iter()
        .any(|key| header.contains(key));

    if has_pc {
        let pc11 = header.get_number("PC1_1").unwrap_or(1.0);
        let pc12 = header.get_number("PC1_2").unwrap_or(0.0);
        let pc21 = header.get_number("PC2_1").unwrap_or(0.0);
        let pc22 = header.get_number("PC2_2").unwrap_or(1.0);

        let pc = [[pc11, pc12], [pc21, pc22]];
        let cdelt = [cdelt1.unwrap_or(1.0), cdelt2.unwrap_or(1.0)];

        return Ok(MatrixSpec::PcCdelt { pc, cdelt });
    }

    if let (Some(c1), Some(c2)) = (cdelt1, cdelt2) {
        if let Some(crota) = header.get_number("CROTA2") {
            return Ok(MatrixSpec::Crota {
                cdelt: [c1, c2],
                crota,
            });
        }
        return Ok(MatrixSpec::PcCdelt {
            pc: [[1.0, 0.0], [0.0, 1.0]],
            cdelt: [c1, c2],
        });
    }

    Err(WcsError::missing_keyword(
        "CD1_1 or CDELT1 (no transformation matrix found)",
    ))
}

fn parse_pv_params(header: &impl KeywordProvider) -> HashMap<(u8, u8), f64> {
    let mut pv_params = HashMap::new();

    for axis in 1..=2u8 {
        for index in 0..=20u8 {
            let key = format!("PV{}_{}", axis, index);
            if let Some(value) = header.get_number(&key) {
                pv_params.insert((axis, index), value);
            }
        }
    }

    pv_params
}

fn latitude_pv(pv_params: &HashMap<(u8, u8), f64>) -> HashMap<u8, f64> {
    pv_params
        .iter()
        .filter(|((axis, _), _)| *axis == 2)
        .map(|(&(_, m), &value)| (m, value))
        .collect()
}
