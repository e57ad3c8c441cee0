use crate::coordinate::{IntermediateCoord, PixelCoord};
use crate::error::{WcsError, WcsResult};

/// Largest |det| relative to `|cd11·cd22| + |cd12·cd21|` still treated as
/// singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransform {
    crpix: [f64; 2],
    cd: [[f64; 2]; 2],
    cd_inverse: [[f64; 2]; 2],
    determinant: f64,
}

impl LinearTransform {
    pub fn from_cd(crpix: [f64; 2], cd: [[f64; 2]; 2]) -> WcsResult<Self> {
        let determinant = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        let magnitude = (cd[0][0] * cd[1][1]).abs() + (cd[0][1] * cd[1][0]).abs();
        if !determinant.is_finite()
            || determinant == 0.0
            || determinant.abs() <= SINGULAR_TOLERANCE * magnitude
        {
            return Err(WcsError::non_invertible_matrix(determinant));
        }
        let cd_inverse = compute_inverse(cd, determinant);
        Ok(Self {
            crpix,
            cd,
            cd_inverse,
            determinant,
        })
    }

    pub fn from_pc_cdelt(crpix: [f64; 2], pc: [[f64; 2]; 2], cdelt: [f64; 2]) -> WcsResult<Self> {
        Self::from_cd(crpix, pc_cdelt_to_cd(pc, cdelt))
    }

    /// Legacy `CDELTi` + `CROTA2` form (rotation of the latitude axis, degrees).
    pub fn from_crota(crpix: [f64; 2], cdelt: [f64; 2], crota_deg: f64) -> WcsResult<Self> {
        Self::from_cd(crpix, crota_to_cd(cdelt, crota_deg))
    }

    pub fn pixel_to_intermediate(&self, pixel: PixelCoord) -> IntermediateCoord {
        let d0 = pixel.x() - self.crpix[0];
        let d1 = pixel.y() - self.crpix[1];
        let x = self.cd[0][0] * d0 + self.cd[0][1] * d1;
        let y = self.cd[1][0] * d0 + self.cd[1][1] * d1;
        IntermediateCoord::new(x, y)
    }

    pub fn intermediate_to_pixel(&self, inter: IntermediateCoord) -> PixelCoord {
        let x = inter.x_deg();
        let y = inter.y_deg();
        let px = self.cd_inverse[0][0] * x + self.cd_inverse[0][1] * y + self.crpix[0];
        let py = self.cd_inverse[1][0] * x + self.cd_inverse[1][1] * y + self.crpix[1];
        PixelCoord::new(px, py)
    }

    #[inline]
    pub fn crpix(&self) -> [f64; 2] {
        self.crpix
    }

    #[inline]
    pub fn cd_matrix(&self) -> [[f64; 2]; 2] {
        self.cd
    }

    /// Geometric-mean pixel scale in degrees per pixel.
    #[inline]
    pub fn pixel_scale(&self) -> f64 {
        libm::sqrt(self.determinant.abs())
    }

    /// Per-axis scales in degrees per pixel: the length of each CD column.
    pub fn pixel_scales(&self) -> [f64; 2] {
        [
            libm::hypot(self.cd[0][0], self.cd[1][0]),
            libm::hypot(self.cd[0][1], self.cd[1][1]),
        ]
    }
}

pub(crate) fn pc_cdelt_to_cd(pc: [[f64; 2]; 2], cdelt: [f64; 2]) -> [[f64; 2]; 2] {
    [
        [cdelt[0] * pc[0][0], cdelt[0] * pc[0][1]],
        [cdelt[1] * pc[1][0], cdelt[1] * pc[1][1]],
    ]
}

pub(crate) fn crota_to_cd(cdelt: [f64; 2], crota_deg: f64) -> [[f64; 2]; 2] {
    let (s, c) = crota_deg.to_radians().sin_cos();
    [
        [cdelt[0] * c, -cdelt[1] * s],
        [cdelt[0] * s, cdelt[1] * c],
    ]
}

fn compute_inverse(m: [[f64; 2]; 2], det: f64) -> [[f64; 2]; 2] {
    let inv_det = 1.0 / det;
    [
        [m[1][1] * inv_det, -m[0][1] * inv_det],
        [-m[1][0] * inv_det, m[0][0] * inv_det],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::assert_close;

    #[test]
    fn test_roundtrip_pixel_intermediate_pixel() {
        let transform = LinearTransform::from_cd([512.0, 512.0], [[0.001, 0.0], [0.0, 0.001]]).unwrap();

        let original = PixelCoord::new(256.0, 768.0);
        let recovered = transform.intermediate_to_pixel(transform.pixel_to_intermediate(original));

        assert_eq!(original, recovered);
    }

    #[test]
    fn test_known_values() {
        let transform = LinearTransform::from_cd([512.0, 512.0], [[0.001, 0.0], [0.0, 0.001]]).unwrap();
        let inter = transform.pixel_to_intermediate(PixelCoord::new(256.0, 256.0));

        assert_eq!(inter.x_deg(), -0.256);
        assert_eq!(inter.y_deg(), -0.256);
    }

    #[test]
    fn test_pc_cdelt_equivalence() {
        let crpix = [100.0, 100.0];
        let transform_cd = LinearTransform::from_cd(crpix, [[0.002, 0.001], [-0.001, 0.002]]).unwrap();
        let transform_pc =
            LinearTransform::from_pc_cdelt(crpix, [[1.0, 0.5], [-0.5, 1.0]], [0.002, 0.002]).unwrap();

        assert_eq!(transform_cd.cd_matrix(), transform_pc.cd_matrix());
    }

    #[test]
    fn test_crota_zero_is_diagonal() {
        let t = LinearTransform::from_crota([1.0, 1.0], [-0.001, 0.001], 0.0).unwrap();
        assert_eq!(t.cd_matrix(), [[-0.001, 0.0], [0.0, 0.001]]);
    }

    #[test]
    fn test_crota_matches_rotated_cd() {
        // CROTA2 = 30 with equal-magnitude, opposite-sign CDELTs
        let cdelt = [-0.001, 0.001];
        let t = LinearTransform::from_crota([1.0, 1.0], cdelt, 30.0).unwrap();
        let (s, c) = 30.0_f64.to_radians().sin_cos();
        let cd = t.cd_matrix();
        assert_close(cd[0][0], cdelt[0] * c, 1e-18);
        assert_close(cd[0][1], -cdelt[1] * s, 1e-18);
        assert_close(cd[1][0], cdelt[0] * s, 1e-18);
        assert_close(cd[1][1], cdelt[1] * c, 1e-18);
    }

    #[test]
    fn test_non_invertible_matrix() {
        let result = LinearTransform::from_cd([512.0, 512.0], [[1.0, 2.0], [2.0, 4.0]]);
        match result {
            Err(WcsError::NonInvertibleMatrix { determinant }) => assert_eq!(determinant, 0.0),
            _ => panic!("Expected NonInvertibleMatrix error"),
        }
    }

    #[test]
    fn test_nearly_singular_matrix_rejected() {
        let result = LinearTransform::from_cd([1.0, 1.0], [[1.0, 2.0], [2.0, 4.0 + 1e-14]]);
        assert!(matches!(result, Err(WcsError::NonInvertibleMatrix { .. })));
    }

    #[test]
    fn test_tiny_pixel_scale_is_invertible() {
        // 1e-8 deg/px gives |det| = 1e-16
        let cd = [[-1e-8, 0.0], [0.0, 1e-8]];
        let transform = LinearTransform::from_cd([512.0, 512.0], cd).unwrap();
        assert_close(transform.pixel_scale(), 1e-8, 1e-20);

        let original = PixelCoord::new(10.5, 900.25);
        let recovered = transform.intermediate_to_pixel(transform.pixel_to_intermediate(original));
        assert_close(recovered.x(), original.x(), 1e-9);
        assert_close(recovered.y(), original.y(), 1e-9);
    }

    #[test]
    fn test_nan_matrix_rejected() {
        assert!(LinearTransform::from_cd([1.0, 1.0], [[f64::NAN, 0.0], [0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_pixel_scale() {
        let transform = LinearTransform::from_cd([512.0, 512.0], [[0.001, 0.0], [0.0, 0.001]]).unwrap();
        assert_eq!(transform.pixel_scale(), 0.001);
    }

    #[test]
    fn test_pixel_scales_rotated() {
        let (s, c) = (PI_OVER_6).sin_cos();
        let cd = [[0.002 * c, -0.001 * s], [0.002 * s, 0.001 * c]];
        let t = LinearTransform::from_cd([0.0, 0.0], cd).unwrap();
        let scales = t.pixel_scales();
        assert_close(scales[0], 0.002, 1e-15);
        assert_close(scales[1], 0.001, 1e-15);
    }

    const PI_OVER_6: f64 = std::f64::consts::FRAC_PI_6;

    #[test]
    fn test_rotated_matrix_roundtrip() {
        let scale = 0.0005;
        let (s, c) = PI_OVER_6.sin_cos();
        let cd = [[scale * c, -scale * s], [scale * s, scale * c]];
        let transform = LinearTransform::from_cd([256.0, 256.0], cd).unwrap();

        let original = PixelCoord::new(100.0, 400.0);
        let recovered = transform.intermediate_to_pixel(transform.pixel_to_intermediate(original));

        assert_close(original.x(), recovered.x(), 1e-10);
        assert_close(original.y(), recovered.y(), 1e-10);
    }
}
