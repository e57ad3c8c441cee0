use serde::{Deserialize, Serialize};

use crate::angle::Angle;
use crate::error::{WcsError, WcsResult};

/// Where pixel numbering starts for a given call.
///
/// FITS headers count from 1 (the centre of the first pixel is 1.0). Array
/// indexing counts from 0. Every pixel-valued operation takes an `Origin`
/// and reports pixels back in the same convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Origin {
    Zero,
    #[default]
    One,
}

impl Origin {
    /// Offset to add to a pixel in this convention to make it 1-based.
    #[inline]
    pub fn offset(self) -> f64 {
        match self {
            Self::Zero => 1.0,
            Self::One => 0.0,
        }
    }

    #[inline]
    pub fn to_fits(self, x: f64, y: f64) -> PixelCoord {
        let off = self.offset();
        PixelCoord::new(x + off, y + off)
    }

    #[inline]
    pub fn from_fits(self, pixel: PixelCoord) -> [f64; 2] {
        let off = self.offset();
        [pixel.x() - off, pixel.y() - off]
    }
}

impl TryFrom<i64> for Origin {
    type Error = WcsError;

    fn try_from(value: i64) -> WcsResult<Self> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            other => Err(WcsError::invalid_parameter(format!(
                "origin must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// Cartesian pixel position in the 1-based FITS convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCoord {
    x: f64,
    y: f64,
}

impl PixelCoord {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Nearest `(row, col)` array index. Rows follow the second (slower)
    /// image axis.
    pub fn to_array_index(&self) -> WcsResult<(usize, usize)> {
        let row = (self.y - 1.0 + 0.5).floor();
        let col = (self.x - 1.0 + 0.5).floor();
        if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
            return Err(WcsError::out_of_bounds(format!(
                "pixel ({}, {}) has no array index",
                self.x, self.y
            )));
        }
        Ok((row as usize, col as usize))
    }

    #[inline]
    pub fn from_array_index(row: f64, col: f64) -> Self {
        Self {
            x: col + 1.0,
            y: row + 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntermediateCoord {
    x: f64,
    y: f64,
}

impl IntermediateCoord {
    #[inline]
    pub fn new(x_deg: f64, y_deg: f64) -> Self {
        Self { x: x_deg, y: y_deg }
    }

    #[inline]
    pub fn x_deg(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y_deg(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn x_rad(&self) -> f64 {
        self.x.to_radians()
    }

    #[inline]
    pub fn y_rad(&self) -> f64 {
        self.y.to_radians()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeCoord {
    phi: Angle,
    theta: Angle,
}

impl NativeCoord {
    #[inline]
    pub fn new(phi: Angle, theta: Angle) -> Self {
        Self { phi, theta }
    }

    #[inline]
    pub fn phi(&self) -> Angle {
        self.phi
    }

    #[inline]
    pub fn theta(&self) -> Angle {
        self.theta
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CelestialCoord {
    alpha: Angle,
    delta: Angle,
}

impl CelestialCoord {
    #[inline]
    pub fn new(alpha: Angle, delta: Angle) -> Self {
        Self { alpha, delta }
    }

    #[inline]
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self::new(Angle::from_degrees(lon), Angle::from_degrees(lat))
    }

    #[inline]
    pub fn alpha(&self) -> Angle {
        self.alpha
    }

    #[inline]
    pub fn delta(&self) -> Angle {
        self.delta
    }
}
