//! Sampled distortion corrections (`CPDISj` / `D2IMDISj` = `'LOOKUP'`).
//!
//! A table is a 2-D grid of offsets in pixels with its own linear mapping
//! from image pixel coordinates to table cells:
//!
//! ```text
//! t_k = (p_k - CRVAL_k) / CDELT_k + CRPIX_k - 1
//! ```
//!
//! `t_k` is clamped to the grid and the value is interpolated bilinearly.
//! Tables live in FITS image extensions (`WCSDVARR` for distortion,
//! `D2IMARR` for detector-to-image) and are handed over through a
//! [`LookupTableSource`].

use std::collections::HashMap;

use log::debug;

use crate::error::{WcsError, WcsResult};
use crate::header::KeywordProvider;

use super::Distortion;

#[derive(Debug, Clone, PartialEq)]
pub struct DistortionLookupTable {
    data: Vec<f64>,
    shape: [usize; 2],
    crpix: [f64; 2],
    crval: [f64; 2],
    cdelt: [f64; 2],
}

impl DistortionLookupTable {
    /// `data` is row-major with `shape = [NAXIS1, NAXIS2]`, so the value at
    /// cell `(i, j)` is `data[j * NAXIS1 + i]`. The mapping defaults to the
    /// identity (`CRPIX = CRVAL = 1`, `CDELT = 1`).
    pub fn new(data: Vec<f64>, shape: [usize; 2]) -> WcsResult<Self> {
        if shape[0] == 0 || shape[1] == 0 {
            return Err(WcsError::invalid_parameter("lookup table has an empty axis"));
        }
        if data.len() != shape[0] * shape[1] {
            return Err(WcsError::invalid_parameter(format!(
                "lookup table holds {} values, shape {}x{} needs {}",
                data.len(),
                shape[0],
                shape[1],
                shape[0] * shape[1]
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(WcsError::invalid_parameter("lookup table contains non-finite values"));
        }
        Ok(Self {
            data,
            shape,
            crpix: [1.0, 1.0],
            crval: [1.0, 1.0],
            cdelt: [1.0, 1.0],
        })
    }

    pub fn constant(value: f64, shape: [usize; 2]) -> WcsResult<Self> {
        Self::new(vec![value; shape[0] * shape[1]], shape)
    }

    pub fn with_mapping(mut self, crpix: [f64; 2], crval: [f64; 2], cdelt: [f64; 2]) -> WcsResult<Self> {
        if cdelt.iter().any(|c| *c == 0.0 || !c.is_finite()) {
            return Err(WcsError::invalid_parameter("lookup table CDELT must be finite and non-zero"));
        }
        self.crpix = crpix;
        self.crval = crval;
        self.cdelt = cdelt;
        Ok(self)
    }

    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    fn cell(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.shape[0] + i]
    }

    fn table_coord(&self, axis: usize, p: f64) -> f64 {
        let t = (p - self.crval[axis]) / self.cdelt[axis] + self.crpix[axis] - 1.0;
        t.clamp(0.0, (self.shape[axis] - 1) as f64)
    }

    /// Interpolated value at 1-based image coordinates given in table axis
    /// order.
    pub fn value_at(&self, p1: f64, p2: f64) -> f64 {
        if p1.is_nan() || p2.is_nan() {
            return f64::NAN;
        }
        let t1 = self.table_coord(0, p1);
        let t2 = self.table_coord(1, p2);

        let (i0, f1) = split_cell(t1, self.shape[0]);
        let (j0, f2) = split_cell(t2, self.shape[1]);
        let i1 = (i0 + 1).min(self.shape[0] - 1);
        let j1 = (j0 + 1).min(self.shape[1] - 1);

        let bottom = self.cell(i0, j0) * (1.0 - f1) + self.cell(i1, j0) * f1;
        let top = self.cell(i0, j1) * (1.0 - f1) + self.cell(i1, j1) * f1;
        bottom * (1.0 - f2) + top * f2
    }
}

fn split_cell(t: f64, n: usize) -> (usize, f64) {
    let base = (t.floor() as usize).min(n.saturating_sub(2));
    (base, t - base as f64)
}

/// Which family of `LOOKUP` tables a header refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// `CPDISj` / `DPj` keywords, tables in `WCSDVARR` extensions.
    Distortion,
    /// `D2IMDISj` / `D2IMj` keywords, tables in `D2IMARR` extensions.
    DetectorToImage,
}

impl TableKind {
    pub fn extname(self) -> &'static str {
        match self {
            Self::Distortion => "WCSDVARR",
            Self::DetectorToImage => "D2IMARR",
        }
    }

    fn dis_keyword(self, axis: usize) -> String {
        match self {
            Self::Distortion => format!("CPDIS{}", axis),
            Self::DetectorToImage => format!("D2IMDIS{}", axis),
        }
    }

    fn record_prefix(self, axis: usize) -> String {
        match self {
            Self::Distortion => format!("DP{}", axis),
            Self::DetectorToImage => format!("D2IM{}", axis),
        }
    }
}

/// Supplies lookup table data by extension kind and `EXTVER`.
pub trait LookupTableSource {
    fn lookup_table(&self, kind: TableKind, extver: u32) -> Option<DistortionLookupTable>;
}

/// No tables available.
impl LookupTableSource for () {
    fn lookup_table(&self, _kind: TableKind, _extver: u32) -> Option<DistortionLookupTable> {
        None
    }
}

impl LookupTableSource for HashMap<(TableKind, u32), DistortionLookupTable> {
    fn lookup_table(&self, kind: TableKind, extver: u32) -> Option<DistortionLookupTable> {
        self.get(&(kind, extver)).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct AxisTable {
    table: DistortionLookupTable,
    /// Image axes (0-based) feeding table axes 1 and 2.
    inputs: [usize; 2],
}

impl AxisTable {
    fn eval(&self, pixel: [f64; 2]) -> f64 {
        self.table.value_at(pixel[self.inputs[0]], pixel[self.inputs[1]])
    }
}

/// Per-axis lookup corrections. Axis `j` adds its table value to pixel
/// coordinate `j`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupDistortion {
    axes: [Option<AxisTable>; 2],
}

impl LookupDistortion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table correcting pixel axis `axis` (1 or 2), sampled with
    /// image axis 1 on table axis 1.
    pub fn with_table(self, axis: usize, table: DistortionLookupTable) -> WcsResult<Self> {
        self.with_table_axes(axis, table, [1, 2])
    }

    /// Like [`with_table`](Self::with_table) with an explicit
    /// `DPj.AXIS.1` / `DPj.AXIS.2` mapping.
    pub fn with_table_axes(
        mut self,
        axis: usize,
        table: DistortionLookupTable,
        inputs: [usize; 2],
    ) -> WcsResult<Self> {
        if !(1..=2).contains(&axis) {
            return Err(WcsError::invalid_parameter(format!(
                "lookup table axis must be 1 or 2, got {}",
                axis
            )));
        }
        if inputs.iter().any(|a| !(1..=2).contains(a)) {
            return Err(WcsError::invalid_parameter("lookup table inputs must be axes 1 or 2"));
        }
        self.axes[axis - 1] = Some(AxisTable {
            table,
            inputs: [inputs[0] - 1, inputs[1] - 1],
        });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.axes.iter().all(Option::is_none)
    }

    pub fn has_axis(&self, axis: usize) -> bool {
        (1..=2).contains(&axis) && self.axes[axis - 1].is_some()
    }

    /// Reads `CPDISj`/`DPj.*` (or `D2IMDISj`/`D2IMj.*`) and fetches the
    /// referenced tables. Returns `None` when no axis is declared.
    pub fn from_header(
        header: &impl KeywordProvider,
        source: &impl LookupTableSource,
        kind: TableKind,
    ) -> WcsResult<Option<Self>> {
        let mut lookup = Self::new();

        for axis in 1..=2 {
            let dis_key = kind.dis_keyword(axis);
            let Some(dis_type) = header.get_string(&dis_key) else {
                continue;
            };
            if dis_type.trim() != "LOOKUP" {
                return Err(WcsError::invalid_keyword(
                    dis_key,
                    format!("unsupported distortion type '{}'", dis_type.trim()),
                ));
            }

            let prefix = kind.record_prefix(axis);
            let extver = read_index(header, &format!("{}.EXTVER", prefix), 1)?;
            let naxes = read_index(header, &format!("{}.NAXES", prefix), 2)?;
            if naxes != 2 {
                return Err(WcsError::invalid_keyword(
                    format!("{}.NAXES", prefix),
                    format!("only 2-D lookup tables are supported, got {}", naxes),
                ));
            }
            let inputs = [
                read_index(header, &format!("{}.AXIS.1", prefix), 1)? as usize,
                read_index(header, &format!("{}.AXIS.2", prefix), 2)? as usize,
            ];

            let table = source.lookup_table(kind, extver).ok_or_else(|| {
                WcsError::invalid_keyword(
                    dis_key.clone(),
                    format!("no {} table with EXTVER {}", kind.extname(), extver),
                )
            })?;
            debug!(
                "{} axis {}: {} EXTVER {} shape {:?}",
                dis_key,
                axis,
                kind.extname(),
                extver,
                table.shape()
            );
            lookup = lookup.with_table_axes(axis, table, inputs)?;
        }

        Ok((!lookup.is_empty()).then_some(lookup))
    }
}

fn read_index(header: &impl KeywordProvider, key: &str, default: u32) -> WcsResult<u32> {
    match header.get_number(key) {
        None => Ok(default),
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        Some(v) => Err(WcsError::invalid_keyword(
            key,
            format!("expected a non-negative integer, got {}", v),
        )),
    }
}

impl Distortion for LookupDistortion {
    fn offset(&self, x: f64, y: f64) -> (f64, f64) {
        let pixel = [x, y];
        let dx = self.axes[0].as_ref().map_or(0.0, |t| t.eval(pixel));
        let dy = self.axes[1].as_ref().map_or(0.0, |t| t.eval(pixel));
        (dx, dy)
    }
}
