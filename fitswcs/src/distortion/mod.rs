pub mod lookup;
pub mod polynomial;
pub mod sip;

pub use lookup::{DistortionLookupTable, LookupDistortion, LookupTableSource, TableKind};
pub use sip::{SipDistortion, SipPolynomial, MAX_SIP_ORDER};

/// A pixel-plane correction evaluated at 1-based pixel coordinates.
pub trait Distortion {
    fn offset(&self, x: f64, y: f64) -> (f64, f64);
}

/// The distortion corrections of one WCS, in the order they apply:
/// detector-to-image tables first, then SIP and lookup tables side by side
/// on the same input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistortionPipeline {
    pub det2im: Option<LookupDistortion>,
    pub sip: Option<SipDistortion>,
    pub lookup: Option<LookupDistortion>,
}

impl DistortionPipeline {
    pub fn is_empty(&self) -> bool {
        self.det2im.is_none() && self.sip.is_none() && self.lookup.is_none()
    }

    pub fn det2im(&self, x: f64, y: f64) -> (f64, f64) {
        apply(self.det2im.as_ref(), x, y)
    }

    pub fn sip_pix2foc(&self, x: f64, y: f64) -> (f64, f64) {
        apply(self.sip.as_ref(), x, y)
    }

    pub fn p4_pix2foc(&self, x: f64, y: f64) -> (f64, f64) {
        apply(self.lookup.as_ref(), x, y)
    }

    pub fn pix2foc(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = self.det2im(x, y);
        let (sx, sy) = offset(self.sip.as_ref(), x, y);
        let (lx, ly) = offset(self.lookup.as_ref(), x, y);
        (x + sx + lx, y + sy + ly)
    }
}

fn offset<D: Distortion>(distortion: Option<&D>, x: f64, y: f64) -> (f64, f64) {
    distortion.map_or((0.0, 0.0), |d| d.offset(x, y))
}

fn apply<D: Distortion>(distortion: Option<&D>, x: f64, y: f64) -> (f64, f64) {
    let (dx, dy) = offset(distortion, x, y);
    (x + dx, y + dy)
}
