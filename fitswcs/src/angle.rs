//! Typed angles and the handful of constants the transformation chain needs.
//!
//! [`Angle`] stores radians; the WCS keywords are all in degrees, so both
//! constructors are provided. Native and celestial spherical coordinates are
//! carried as `Angle` so the projection code never mixes units by accident.

pub mod constants {
    pub const PI: f64 = std::f64::consts::PI;
    pub const HALF_PI: f64 = std::f64::consts::FRAC_PI_2;
    pub const DEG_TO_RAD: f64 = PI / 180.0;
    pub const RAD_TO_DEG: f64 = 180.0 / PI;
}

use constants::{DEG_TO_RAD, RAD_TO_DEG};

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Angle {
    rad: f64,
}

impl Angle {
    pub const ZERO: Self = Self { rad: 0.0 };

    #[inline]
    pub const fn from_radians(rad: f64) -> Self {
        Self { rad }
    }

    #[inline]
    pub fn from_degrees(deg: f64) -> Self {
        Self {
            rad: deg * DEG_TO_RAD,
        }
    }

    #[inline]
    pub fn radians(self) -> f64 {
        self.rad
    }

    #[inline]
    pub fn degrees(self) -> f64 {
        self.rad * RAD_TO_DEG
    }

    #[inline]
    pub fn sin_cos(self) -> (f64, f64) {
        self.rad.sin_cos()
    }
}

/// Wraps a longitude in degrees into (-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    let mut normalized = lon % 360.0;
    if normalized > 180.0 {
        normalized -= 360.0;
    } else if normalized <= -180.0 {
        normalized += 360.0;
    }
    normalized
}

/// Wraps a longitude in degrees into [0, 360).
pub fn wrap_0_360(lon: f64) -> f64 {
    let wrapped = libm::fmod(lon, 360.0);
    let wrapped = if wrapped < 0.0 { wrapped + 360.0 } else { wrapped };
    // fmod of a tiny negative value can round up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
