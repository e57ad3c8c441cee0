use thiserror::Error;

pub type WcsResult<T> = Result<T, WcsError>;

/// Outcome of an iterative world-to-pixel inversion that did not meet its
/// tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct NoConvergence {
    /// Best pixel solutions found, one per input point.
    pub best_solution: Vec<[f64; 2]>,
    /// Norm of the last correction applied to each point, in pixels.
    pub accuracy: Vec<f64>,
    pub iterations: usize,
    /// Points whose corrections grew between iterations.
    pub divergent: Vec<usize>,
    /// Points still converging when the iteration limit was reached.
    pub slow_conv: Vec<usize>,
}

#[derive(Debug, Error)]
pub enum WcsError {
    #[error("Missing required WCS keyword: {keyword}")]
    MissingKeyword { keyword: String },

    #[error("Invalid WCS keyword '{keyword}': {message}")]
    InvalidKeyword { keyword: String, message: String },

    #[error("Unsupported projection: {code}")]
    UnsupportedProjection { code: String },

    #[error("Singularity in transformation: {message}")]
    Singularity { message: String },

    #[error("Coordinate out of bounds: {message}")]
    OutOfBounds { message: String },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Convergence failure: {message}")]
    ConvergenceFailure { message: String },

    #[error(
        "All-world-to-pixel inversion did not converge after {} iterations ({} divergent, {} slow)",
        .0.iterations,
        .0.divergent.len(),
        .0.slow_conv.len()
    )]
    NoConvergence(Box<NoConvergence>),

    #[error("Non-invertible matrix (determinant = {determinant})")]
    NonInvertibleMatrix { determinant: f64 },

    #[error("Header card {card}: {message}")]
    HeaderParse { card: usize, message: String },
}

impl WcsError {
    pub fn missing_keyword(keyword: impl Into<String>) -> Self {
        Self::MissingKeyword {
            keyword: keyword.into(),
        }
    }

    pub fn invalid_keyword(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_projection(code: impl Into<String>) -> Self {
        Self::UnsupportedProjection { code: code.into() }
    }

    pub fn singularity(message: impl Into<String>) -> Self {
        Self::Singularity {
            message: message.into(),
        }
    }

    pub fn out_of_bounds(message: impl Into<String>) -> Self {
        Self::OutOfBounds {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn convergence_failure(message: impl Into<String>) -> Self {
        Self::ConvergenceFailure {
            message: message.into(),
        }
    }

    pub fn no_convergence(details: NoConvergence) -> Self {
        Self::NoConvergence(Box::new(details))
    }

    pub fn non_invertible_matrix(determinant: f64) -> Self {
        Self::NonInvertibleMatrix { determinant }
    }

    pub fn header_parse(card: usize, message: impl Into<String>) -> Self {
        Self::HeaderParse {
            card,
            message: message.into(),
        }
    }

    /// True for failures tied to a single coordinate rather than to the WCS
    /// itself. Batch transforms turn these into NaN results.
    pub fn is_invalid_coordinate(&self) -> bool {
        matches!(self, Self::Singularity { .. } | Self::OutOfBounds { .. })
    }
}
