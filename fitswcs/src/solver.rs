//! Iterative removal of distortion in world-to-pixel transforms.
//!
//! Given focal-plane coordinates `foc`, the pixel solution `pix` satisfies
//! `pix2foc(pix) = foc`. Starting from `pix = foc`, each step applies
//! `pix ← pix − (pix2foc(pix) − foc)`. Distortions are small corrections, so
//! the map is a contraction near the solution and this converges quickly.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{NoConvergence, WcsError, WcsResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Required accuracy in pixels.
    pub tolerance: f64,
    pub max_iter: usize,
    /// Stop a point as soon as its correction grows and keep the best
    /// solution seen.
    pub detect_divergence: bool,
    /// Return best solutions instead of a `NoConvergence` error.
    pub quiet: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iter: 20,
            detect_divergence: true,
            quiet: false,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_detect_divergence(mut self, detect: bool) -> Self {
        self.detect_divergence = detect;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn validate(&self) -> WcsResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(WcsError::invalid_parameter(format!(
                "solver tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iter == 0 {
            return Err(WcsError::invalid_parameter("solver needs at least one iteration"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PointStatus {
    Converged,
    Diverged,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PointSolution {
    pub pixel: [f64; 2],
    pub accuracy: f64,
    pub iterations: usize,
    pub status: PointStatus,
}

impl PointSolution {
    pub fn converged(pixel: [f64; 2]) -> Self {
        Self {
            pixel,
            accuracy: 0.0,
            iterations: 0,
            status: PointStatus::Converged,
        }
    }

    pub fn invalid() -> Self {
        Self::converged([f64::NAN, f64::NAN])
    }
}

/// Inverts `pix2foc` at `foc` by fixed-point iteration.
pub(crate) fn invert<F>(foc: [f64; 2], pix2foc: F, config: &SolverConfig) -> PointSolution
where
    F: Fn([f64; 2]) -> [f64; 2],
{
    let mut pix = foc;
    let mut best = PointSolution {
        pixel: foc,
        accuracy: f64::INFINITY,
        iterations: 0,
        status: PointStatus::Slow,
    };
    let mut previous = f64::INFINITY;

    for iteration in 1..=config.max_iter {
        let mapped = pix2foc(pix);
        let correction = [mapped[0] - foc[0], mapped[1] - foc[1]];
        let norm = libm::hypot(correction[0], correction[1]);
        trace!("iteration {}: pix = {:?}, |dpix| = {:e}", iteration, pix, norm);

        if !norm.is_finite() || (config.detect_divergence && norm > previous) {
            best.iterations = iteration;
            best.status = PointStatus::Diverged;
            return best;
        }
        if norm < best.accuracy {
            best.pixel = pix;
            best.accuracy = norm;
        }

        pix = [pix[0] - correction[0], pix[1] - correction[1]];
        if norm < config.tolerance {
            return PointSolution {
                pixel: pix,
                accuracy: norm,
                iterations: iteration,
                status: PointStatus::Converged,
            };
        }
        previous = norm;
    }

    best.iterations = config.max_iter;
    best
}

/// Folds per-point results into pixels, or a `NoConvergence` error listing
/// the divergent and slowly converging points.
pub(crate) fn collect(solutions: Vec<PointSolution>, config: &SolverConfig) -> WcsResult<Vec<[f64; 2]>> {
    let mut divergent = Vec::new();
    let mut slow_conv = Vec::new();
    for (index, solution) in solutions.iter().enumerate() {
        match solution.status {
            PointStatus::Converged => {}
            PointStatus::Diverged => divergent.push(index),
            PointStatus::Slow => slow_conv.push(index),
        }
    }

    let pixels = solutions.iter().map(|s| s.pixel).collect();
    if divergent.is_empty() && slow_conv.is_empty() {
        return Ok(pixels);
    }
    if config.quiet {
        log::warn!(
            "world-to-pixel inversion: {} divergent and {} slow points, returning best solutions",
            divergent.len(),
            slow_conv.len()
        );
        return Ok(pixels);
    }

    Err(WcsError::no_convergence(NoConvergence {
        best_solution: pixels,
        accuracy: solutions.iter().map(|s| s.accuracy).collect(),
        iterations: solutions.iter().map(|s| s.iterations).max().unwrap_or(0),
        divergent,
        slow_conv,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    // mild quadratic distortion around the origin
    fn pix2foc(p: [f64; 2]) -> [f64; 2] {
        [p[0] + 1e-4 * p[0] * p[0], p[1] - 5e-5 * p[0] * p[1]]
    }

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.tolerance, 1e-4);
        assert_eq!(config.max_iter, 20);
        assert!(config.detect_divergence);
        assert!(!config.quiet);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_setters_and_validation() {
        let config = SolverConfig::new()
            .with_tolerance(1e-8)
            .with_max_iter(50)
            .with_detect_divergence(false)
            .with_quiet(true);
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.max_iter, 50);
        assert!(!config.detect_divergence);
        assert!(config.quiet);

        assert!(SolverConfig::new().with_tolerance(0.0).validate().is_err());
        assert!(SolverConfig::new().with_tolerance(f64::NAN).validate().is_err());
        assert!(SolverConfig::new().with_max_iter(0).validate().is_err());
    }

    #[test]
    fn test_invert_converges() {
        let config = SolverConfig::new().with_tolerance(1e-10).with_max_iter(100);
        let truth = [120.0, -40.0];
        let solution = invert(pix2foc(truth), pix2foc, &config);
        assert_eq!(solution.status, PointStatus::Converged);
        assert!((solution.pixel[0] - truth[0]).abs() < 1e-8);
        assert!((solution.pixel[1] - truth[1]).abs() < 1e-8);
        assert!(solution.accuracy < 1e-10);
    }

    #[test]
    fn test_identity_converges_in_one_step() {
        let solution = invert([3.0, 4.0], |p| p, &SolverConfig::default());
        assert_eq!(solution.status, PointStatus::Converged);
        assert_eq!(solution.iterations, 1);
        assert_eq!(solution.pixel, [3.0, 4.0]);
    }

    #[test]
    fn test_divergence_detected() {
        // expanding map: each correction is larger than the last
        let f = |p: [f64; 2]| [3.0 * p[0], 3.0 * p[1]];
        let solution = invert([1.0, 1.0], f, &SolverConfig::default());
        assert_eq!(solution.status, PointStatus::Diverged);
        assert_eq!(solution.pixel, [1.0, 1.0]);
    }

    #[test]
    fn test_slow_convergence() {
        // contraction factor 0.9: needs far more than three steps
        let f = |p: [f64; 2]| [p[0] + 0.9 * (p[0] - 10.0), p[1]];
        let config = SolverConfig::new().with_max_iter(3);
        let solution = invert([10.0, 0.0], f, &config);
        assert_eq!(solution.status, PointStatus::Converged);

        let solution = invert([0.0, 0.0], f, &config);
        assert_eq!(solution.status, PointStatus::Slow);
        assert_eq!(solution.iterations, 3);
    }

    #[test]
    fn test_collect_reports_failures() {
        let ok = PointSolution::converged([1.0, 2.0]);
        let slow = PointSolution {
            pixel: [5.0, 5.0],
            accuracy: 0.1,
            iterations: 20,
            status: PointStatus::Slow,
        };
        let diverged = PointSolution {
            status: PointStatus::Diverged,
            iterations: 4,
            ..slow
        };

        let config = SolverConfig::default();
        match collect(vec![ok, slow, diverged], &config) {
            Err(WcsError::NoConvergence(details)) => {
                assert_eq!(details.slow_conv, vec![1]);
                assert_eq!(details.divergent, vec![2]);
                assert_eq!(details.best_solution[0], [1.0, 2.0]);
                assert_eq!(details.accuracy[1], 0.1);
                assert_eq!(details.iterations, 20);
            }
            other => panic!("expected NoConvergence, got {:?}", other),
        }

        let quiet = SolverConfig::default().with_quiet(true);
        let pixels = collect(vec![ok, slow], &quiet).unwrap();
        assert_eq!(pixels, vec![[1.0, 2.0], [5.0, 5.0]]);
    }
}
