pub mod angle;
mod batch;
pub mod builder;
mod common;
pub mod coordinate;
pub mod distortion;
pub mod error;
pub mod header;
pub mod linear;
pub mod solver;
pub mod spherical;
#[doc(hidden)]
pub mod test_helpers;
pub mod wcs;

pub use angle::Angle;
pub use builder::WcsBuilder;
pub use coordinate::{CelestialCoord, IntermediateCoord, NativeCoord, Origin, PixelCoord};
pub use distortion::{
    DistortionLookupTable, DistortionPipeline, LookupDistortion, LookupTableSource,
    SipDistortion, SipPolynomial, TableKind,
};
pub use error::{NoConvergence, WcsError, WcsResult};
pub use header::{parse_header, KeywordMap, KeywordProvider, WcsKeyword, WcsKeywordValue};
pub use linear::LinearTransform;
pub use solver::SolverConfig;
pub use spherical::{Projection, SphericalRotation};
pub use wcs::{CoordType, Wcs};
