//! Line search algorithms for descent methods.
//!
//! Given a point `x`, a descent direction `p` and the objective `f`, a line
//! search picks a step length `α > 0` along the one-dimensional restriction
//!
//! φ(α) = f(x + α p),   φ'(α) = ⟨∇f(x + α p), p⟩.
//!
//! # Strong Wolfe Conditions
//!
//! The conjugate gradient method needs steps satisfying
//!
//! 1. Sufficient decrease: φ(α) ≤ φ(0) + ftol · α · φ'(0)
//! 2. Strong curvature: |φ'(α)| ≤ gtol · |φ'(0)|
//!
//! with `0 < ftol < gtol < 1`. A small `gtol` (0.1 for CG) keeps the next
//! direction close to conjugate.
//!
//! # Algorithm Variants
//!
//! - [`StrongWolfeLineSearch`]: bracketing phase followed by a zoom phase
//!   using safeguarded cubic or quadratic interpolation, with bisection as
//!   the fallback.
//! - [`FixedStepSize`]: returns a constant step; used to drive the
//!   optimizers deterministically in tests.
//!
//! # Example
//!
//! ```rust
//! use descentopt_core::line_search::{LineSearch, LineSearchParams, StrongWolfeLineSearch};
//! use descentopt_core::model::{FnModel, Model};
//! use descentopt_core::types::DVector;
//!
//! let model = FnModel::new(
//!     DVector::from_vec(vec![3.0, 4.0]),
//!     |x: &DVector<f64>| x.dot(x),
//!     |x: &DVector<f64>| x * 2.0,
//! );
//! let x = model.initial_point();
//! let g = model.gradient(&x).unwrap();
//! let p = -&g;
//!
//! let mut ls = StrongWolfeLineSearch::new();
//! let result = ls
//!     .search(&model, 25.0, &x, &g, &p, &LineSearchParams::default())
//!     .unwrap();
//! assert!((result.step_length - 0.5).abs() < 1e-12);
//! ```

use crate::{
    error::{OptimizerError, Result},
    model::Model,
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt::Debug;
use tracing::trace;

/// Result of a line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult<T: Scalar> {
    /// Accepted step length α > 0
    pub step_length: T,

    /// Objective value φ(α) at the accepted point
    pub value: T,

    /// Gradient at the accepted point
    pub gradient: DVector<T>,

    /// Number of model evaluations (objective plus gradient) spent
    pub evaluations: usize,
}

/// Parameters controlling a line search.
///
/// # Example
///
/// ```rust
/// use descentopt_core::line_search::LineSearchParams;
///
/// let params = LineSearchParams::<f64>::default()
///     .with_gtol(0.9)
///     .with_max_iterations(30);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LineSearchParams<T: Scalar> {
    /// Sufficient decrease constant (Armijo `c₁`)
    pub ftol: T,

    /// Curvature constant (Wolfe `c₂`)
    pub gtol: T,

    /// First trial step
    pub initial_step: T,

    /// Largest step the bracketing phase may try
    pub max_step: T,

    /// Maximum number of trial steps, bracketing and zoom combined
    pub max_iterations: usize,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            ftol: <T as Scalar>::from_f64(1e-4),
            gtol: <T as Scalar>::from_f64(0.1),
            initial_step: T::one(),
            max_step: T::MAX_STEP_SIZE,
            max_iterations: 50,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Creates parameters with the given Wolfe constants.
    pub fn new(ftol: T, gtol: T) -> Self {
        Self {
            ftol,
            gtol,
            ..Self::default()
        }
    }

    /// Sets the sufficient decrease constant.
    pub fn with_ftol(mut self, ftol: T) -> Self {
        self.ftol = ftol;
        self
    }

    /// Sets the curvature constant.
    pub fn with_gtol(mut self, gtol: T) -> Self {
        self.gtol = gtol;
        self
    }

    /// Sets the first trial step.
    pub fn with_initial_step(mut self, initial_step: T) -> Self {
        self.initial_step = initial_step;
        self
    }

    /// Sets the largest admissible step.
    pub fn with_max_step(mut self, max_step: T) -> Self {
        self.max_step = max_step;
        self
    }

    /// Sets the trial budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `0 < ftol < gtol < 1`, both step
    /// bounds are positive with `initial_step ≤ max_step`, and
    /// `max_iterations ≥ 1`.
    pub fn validate(&self) -> Result<()> {
        if self.ftol <= T::zero() || self.ftol >= T::one() {
            return Err(OptimizerError::invalid_configuration(
                "Sufficient decrease constant must be in (0, 1)",
                "ftol",
                self.ftol.to_string(),
            ));
        }
        if self.gtol <= self.ftol || self.gtol >= T::one() {
            return Err(OptimizerError::invalid_configuration(
                "Curvature constant must satisfy ftol < gtol < 1",
                "gtol",
                self.gtol.to_string(),
            ));
        }
        if self.initial_step <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "Initial step must be positive",
                "initial_step",
                self.initial_step.to_string(),
            ));
        }
        if self.max_step < self.initial_step {
            return Err(OptimizerError::invalid_configuration(
                "Maximum step must not be smaller than the initial step",
                "max_step",
                self.max_step.to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(OptimizerError::invalid_configuration(
                "Line search needs at least one trial step",
                "max_iterations",
                "0",
            ));
        }
        Ok(())
    }
}

/// Trait for line search algorithms.
///
/// Implementations receive the current value, point and gradient so the
/// caller's evaluations are not repeated.
pub trait LineSearch<T: Scalar>: Debug {
    /// Searches along `direction` from `point`.
    ///
    /// # Errors
    ///
    /// Returns `LineSearchFailed` if `direction` is not a descent direction
    /// or no acceptable step is found within the trial budget, and
    /// propagates model errors.
    fn search<M: Model<T> + ?Sized>(
        &mut self,
        model: &M,
        value: T,
        point: &DVector<T>,
        gradient: &DVector<T>,
        direction: &DVector<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>>;

    /// Returns the name of this line search method.
    fn name(&self) -> &str;
}

/// One trial step of the search with its function value and, when the
/// gradient was evaluated, its directional derivative.
#[derive(Debug, Clone, Copy)]
struct Trial<T> {
    alpha: T,
    phi: T,
    dphi: Option<T>,
}

/// Bookkeeping shared by the bracketing and zoom phases.
struct Phi<'a, T: Scalar, M: ?Sized> {
    model: &'a M,
    point: &'a DVector<T>,
    direction: &'a DVector<T>,
    phi0: T,
    dphi0: T,
    evaluations: usize,
    trials: usize,
}

impl<'a, T: Scalar, M: Model<T> + ?Sized> Phi<'a, T, M> {
    fn at(&self, alpha: T) -> DVector<T> {
        self.point + self.direction * alpha
    }

    fn value(&mut self, x: &DVector<T>) -> Result<T> {
        self.evaluations += 1;
        Ok(self.model.objective(x)?)
    }

    fn gradient(&mut self, x: &DVector<T>) -> Result<DVector<T>> {
        self.evaluations += 1;
        Ok(self.model.gradient(x)?)
    }

    fn sufficient_decrease(&self, alpha: T, phi: T, ftol: T) -> bool {
        Float::is_finite(phi) && phi <= self.phi0 + ftol * alpha * self.dphi0
    }

    fn strong_curvature(&self, dphi: T, gtol: T) -> bool {
        Float::abs(dphi) <= -gtol * self.dphi0
    }

    fn accept(&self, alpha: T, phi: T, gradient: DVector<T>) -> LineSearchResult<T> {
        trace!(
            step = Scalar::to_f64(alpha),
            value = Scalar::to_f64(phi),
            evaluations = self.evaluations,
            "line search accepted step"
        );
        LineSearchResult {
            step_length: alpha,
            value: phi,
            gradient,
            evaluations: self.evaluations,
        }
    }

    fn fail(&self, reason: &str, last_step: T) -> OptimizerError {
        OptimizerError::line_search_failed(
            reason,
            self.trials,
            last_step.try_to_f64().unwrap_or(f64::NAN),
            self.phi0.try_to_f64().unwrap_or(f64::NAN),
        )
    }
}

/// Strong Wolfe line search.
///
/// The bracketing phase grows the trial step until it either satisfies both
/// conditions or brackets an acceptable step; the zoom phase then shrinks the
/// bracket by interpolation.
#[derive(Debug, Clone, Default)]
pub struct StrongWolfeLineSearch;

impl StrongWolfeLineSearch {
    /// Creates a new strong Wolfe line search.
    pub fn new() -> Self {
        Self
    }

    fn zoom<T: Scalar, M: Model<T> + ?Sized>(
        &self,
        phi: &mut Phi<'_, T, M>,
        mut lo: Trial<T>,
        mut hi: Trial<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>> {
        while phi.trials < params.max_iterations {
            let width = Float::abs(hi.alpha - lo.alpha);
            if width <= T::MIN_STEP_SIZE * Float::max(T::one(), lo.alpha) {
                return Err(phi.fail("Bracketing interval collapsed", lo.alpha));
            }

            let alpha = interpolate(&lo, &hi);
            let x = phi.at(alpha);
            let value = phi.value(&x)?;
            phi.trials += 1;
            trace!(
                step = Scalar::to_f64(alpha),
                value = Scalar::to_f64(value),
                lo = Scalar::to_f64(lo.alpha),
                hi = Scalar::to_f64(hi.alpha),
                "zoom trial"
            );

            if !phi.sufficient_decrease(alpha, value, params.ftol) || value >= lo.phi {
                hi = Trial {
                    alpha,
                    phi: value,
                    dphi: None,
                };
                continue;
            }

            let gradient = phi.gradient(&x)?;
            let dphi = gradient.dot(phi.direction);
            if phi.strong_curvature(dphi, params.gtol) {
                return Ok(phi.accept(alpha, value, gradient));
            }
            if dphi * (hi.alpha - lo.alpha) >= T::zero() {
                hi = lo;
            }
            lo = Trial {
                alpha,
                phi: value,
                dphi: Some(dphi),
            };
        }

        Err(phi.fail("Strong Wolfe conditions not satisfied", lo.alpha))
    }
}

/// Picks a trial step strictly inside the bracket `[lo, hi]`.
///
/// Uses the cubic through both endpoints when both slopes are known, the
/// quadratic through `φ(lo)`, `φ'(lo)`, `φ(hi)` otherwise, and bisection when
/// the interpolant's minimizer falls too close to an endpoint.
fn interpolate<T: Scalar>(lo: &Trial<T>, hi: &Trial<T>) -> T {
    let two = <T as Scalar>::from_f64(2.0);
    let three = <T as Scalar>::from_f64(3.0);
    let margin = <T as Scalar>::from_f64(0.1);

    let d = hi.alpha - lo.alpha;
    let midpoint = lo.alpha + d / two;
    let lo_slope = match lo.dphi {
        Some(s) => s,
        None => return midpoint,
    };
    if !Float::is_finite(hi.phi) {
        return midpoint;
    }

    let candidate = match hi.dphi {
        Some(hi_slope) => {
            let d1 = lo_slope + hi_slope - three * (lo.phi - hi.phi) / (lo.alpha - hi.alpha);
            let radicand = d1 * d1 - lo_slope * hi_slope;
            if radicand < T::zero() {
                return midpoint;
            }
            let d2 = Float::signum(d) * Float::sqrt(radicand);
            hi.alpha - d * (hi_slope + d2 - d1) / (hi_slope - lo_slope + two * d2)
        }
        None => {
            let curvature = hi.phi - lo.phi - lo_slope * d;
            if curvature <= T::zero() {
                return midpoint;
            }
            lo.alpha - lo_slope * d * d / (two * curvature)
        }
    };

    let (a, b) = if d > T::zero() {
        (lo.alpha, hi.alpha)
    } else {
        (hi.alpha, lo.alpha)
    };
    let guard = margin * Float::abs(d);
    if Float::is_finite(candidate) && candidate > a + guard && candidate < b - guard {
        candidate
    } else {
        midpoint
    }
}

impl<T: Scalar> LineSearch<T> for StrongWolfeLineSearch {
    fn search<M: Model<T> + ?Sized>(
        &mut self,
        model: &M,
        value: T,
        point: &DVector<T>,
        gradient: &DVector<T>,
        direction: &DVector<T>,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>> {
        params.validate()?;
        if gradient.len() != point.len() || direction.len() != point.len() {
            return Err(OptimizerError::dimension_mismatch(
                point.len(),
                direction.len(),
            ));
        }

        let dphi0 = gradient.dot(direction);
        let mut phi = Phi {
            model,
            point,
            direction,
            phi0: value,
            dphi0,
            evaluations: 0,
            trials: 0,
        };
        if !(dphi0 < T::zero()) {
            return Err(phi.fail("Search direction is not a descent direction", T::zero()));
        }

        let mut prev = Trial {
            alpha: T::zero(),
            phi: value,
            dphi: Some(dphi0),
        };
        let mut alpha = Float::min(params.initial_step, params.max_step);

        while phi.trials < params.max_iterations {
            let x = phi.at(alpha);
            let current = phi.value(&x)?;
            phi.trials += 1;
            trace!(
                step = Scalar::to_f64(alpha),
                value = Scalar::to_f64(current),
                "bracketing trial"
            );

            if !phi.sufficient_decrease(alpha, current, params.ftol)
                || (phi.trials > 1 && current >= prev.phi)
            {
                let hi = Trial {
                    alpha,
                    phi: current,
                    dphi: None,
                };
                return self.zoom(&mut phi, prev, hi, params);
            }

            let g = phi.gradient(&x)?;
            let dphi = g.dot(direction);
            if phi.strong_curvature(dphi, params.gtol) {
                return Ok(phi.accept(alpha, current, g));
            }

            let here = Trial {
                alpha,
                phi: current,
                dphi: Some(dphi),
            };
            if dphi >= T::zero() {
                return self.zoom(&mut phi, here, prev, params);
            }

            if alpha >= params.max_step {
                return Err(phi.fail("Step reached the maximum step length", alpha));
            }
            prev = here;
            alpha = Float::min(alpha * <T as Scalar>::from_f64(2.0), params.max_step);
        }

        Err(phi.fail("Strong Wolfe conditions not satisfied", alpha))
    }

    fn name(&self) -> &str {
        "StrongWolfe"
    }
}

/// Fixed step size "line search".
///
/// Always returns the configured step; performs one objective and one
/// gradient evaluation at the new point and checks no condition.
#[derive(Debug, Clone)]
pub struct FixedStepSize<T: Scalar> {
    step_size: T,
}

impl<T: Scalar> FixedStepSize<T> {
    /// Creates a fixed step size line search.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the step size is not positive and
    /// finite.
    pub fn new(step_size: T) -> Result<Self> {
        if !(step_size > T::zero()) || !Float::is_finite(step_size) {
            return Err(OptimizerError::invalid_configuration(
                "Step size must be positive and finite",
                "step_size",
                step_size.to_string(),
            ));
        }
        Ok(Self { step_size })
    }
}

impl<T: Scalar> LineSearch<T> for FixedStepSize<T> {
    fn search<M: Model<T> + ?Sized>(
        &mut self,
        model: &M,
        _value: T,
        point: &DVector<T>,
        _gradient: &DVector<T>,
        direction: &DVector<T>,
        _params: &LineSearchParams<T>,
    ) -> Result<LineSearchResult<T>> {
        let x = point + direction * self.step_size;
        let value = model.objective(&x)?;
        let gradient = model.gradient(&x)?;
        Ok(LineSearchResult {
            step_length: self.step_size,
            value,
            gradient,
            evaluations: 2,
        })
    }

    fn name(&self) -> &str {
        "FixedStep"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CountingModel, FnModel};
    use approx::assert_relative_eq;

    fn sum_of_squares() -> FnModel<
        f64,
        impl Fn(&DVector<f64>) -> f64,
        impl Fn(&DVector<f64>) -> DVector<f64>,
    > {
        FnModel::new(
            DVector::from_vec(vec![3.0, 4.0]),
            |x: &DVector<f64>| x.dot(x),
            |x: &DVector<f64>| x * 2.0,
        )
    }

    fn rosenbrock() -> FnModel<
        f64,
        impl Fn(&DVector<f64>) -> f64,
        impl Fn(&DVector<f64>) -> DVector<f64>,
    > {
        FnModel::new(
            DVector::from_vec(vec![-1.2, 1.0]),
            |x: &DVector<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            |x: &DVector<f64>| {
                DVector::from_vec(vec![
                    -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]),
                    200.0 * (x[1] - x[0] * x[0]),
                ])
            },
        )
    }

    fn assert_strong_wolfe<M: Model<f64>>(
        model: &M,
        x: &DVector<f64>,
        p: &DVector<f64>,
        params: &LineSearchParams<f64>,
        result: &LineSearchResult<f64>,
    ) {
        let f0 = model.objective(x).unwrap();
        let dphi0 = model.gradient(x).unwrap().dot(p);
        let alpha = result.step_length;

        assert!(alpha > 0.0);
        assert!(result.value <= f0 + params.ftol * alpha * dphi0);
        assert!(result.gradient.dot(p).abs() <= params.gtol * dphi0.abs());
        assert_relative_eq!(
            result.value,
            model.objective(&(x + p * alpha)).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_exact_step_on_quadratic() {
        let model = sum_of_squares();
        let x = model.initial_point();
        let g = model.gradient(&x).unwrap();
        let p = -&g;
        let params = LineSearchParams::default();

        let result = StrongWolfeLineSearch::new()
            .search(&model, 25.0, &x, &g, &p, &params)
            .unwrap();

        // φ(α) = 25 (1 - 2α)² is minimized exactly by the quadratic fit
        assert_relative_eq!(result.step_length, 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.value, 0.0, epsilon = 1e-12);
        assert_strong_wolfe(&model, &x, &p, &params, &result);
    }

    #[test]
    fn test_expands_short_initial_step() {
        let model = sum_of_squares();
        let x = model.initial_point();
        let g = model.gradient(&x).unwrap();
        let p = -&g;
        let params = LineSearchParams::default().with_initial_step(0.01);

        let result = StrongWolfeLineSearch::new()
            .search(&model, 25.0, &x, &g, &p, &params)
            .unwrap();

        assert!(result.step_length > 0.01);
        assert_strong_wolfe(&model, &x, &p, &params, &result);
    }

    #[test]
    fn test_rosenbrock_steepest_descent() {
        let model = rosenbrock();
        let x = model.initial_point();
        let f0 = model.objective(&x).unwrap();
        let g = model.gradient(&x).unwrap();
        let p = -&g;
        let params = LineSearchParams::default();

        let result = StrongWolfeLineSearch::new()
            .search(&model, f0, &x, &g, &p, &params)
            .unwrap();

        assert_strong_wolfe(&model, &x, &p, &params, &result);
    }

    #[test]
    fn test_rejects_ascent_direction() {
        let model = CountingModel::new(sum_of_squares());
        let x = model.initial_point();
        let g = DVector::from_vec(vec![6.0, 8.0]);

        let params = LineSearchParams::default();
        let result = StrongWolfeLineSearch::new().search(&model, 25.0, &x, &g, &g, &params);

        assert!(matches!(
            result,
            Err(OptimizerError::LineSearchFailed { .. })
        ));
        assert_eq!(model.counts().total(), 0);
    }

    #[test]
    fn test_budget_exhaustion() {
        let model = rosenbrock();
        let x = model.initial_point();
        let f0 = model.objective(&x).unwrap();
        let g = model.gradient(&x).unwrap();
        let p = -&g;
        let params = LineSearchParams::default()
            .with_gtol(1e-3)
            .with_max_iterations(1);

        let result = StrongWolfeLineSearch::new().search(&model, f0, &x, &g, &p, &params);

        if let Err(OptimizerError::LineSearchFailed { iterations, .. }) = result {
            assert_eq!(iterations, 1);
        } else {
            panic!("Expected LineSearchFailed, got {:?}", result);
        }
    }

    #[test]
    fn test_evaluation_count_matches_model() {
        let model = CountingModel::new(rosenbrock());
        let x = model.initial_point();
        let f0 = model.objective(&x).unwrap();
        let g = model.gradient(&x).unwrap();
        let p = -&g;
        model.reset_counts();

        let result = StrongWolfeLineSearch::new()
            .search(&model, f0, &x, &g, &p, &LineSearchParams::default())
            .unwrap();

        assert_eq!(result.evaluations, model.counts().total());
    }

    #[test]
    fn test_interpolation_stays_inside_bracket() {
        let lo = Trial {
            alpha: 0.0,
            phi: 1.0,
            dphi: Some(-1.0),
        };
        let hi = Trial {
            alpha: 1.0,
            phi: f64::INFINITY,
            dphi: None,
        };
        assert_relative_eq!(interpolate(&lo, &hi), 0.5);

        let hi = Trial {
            alpha: 1.0,
            phi: 1.0,
            dphi: Some(1.0),
        };
        let alpha = interpolate(&lo, &hi);
        assert!(alpha > 0.1 && alpha < 0.9);
        assert_relative_eq!(alpha, 0.5, epsilon = 1e-12);

        // Reversed bracket
        let lo = Trial {
            alpha: 2.0,
            phi: 0.0,
            dphi: Some(1.0),
        };
        let hi = Trial {
            alpha: 1.0,
            phi: 1.0,
            dphi: None,
        };
        let alpha = interpolate(&lo, &hi);
        assert!(alpha > 1.0 && alpha < 2.0);
    }

    #[test]
    fn test_fixed_step_size() {
        let model = sum_of_squares();
        let x = model.initial_point();
        let g = model.gradient(&x).unwrap();
        let p = -&g;

        let result = FixedStepSize::new(0.25)
            .unwrap()
            .search(&model, 25.0, &x, &g, &p, &LineSearchParams::default())
            .unwrap();

        assert_eq!(result.step_length, 0.25);
        assert_relative_eq!(result.value, 6.25);
        assert_relative_eq!(result.gradient, DVector::from_vec(vec![3.0, 4.0]));
    }

    #[test]
    fn test_fixed_step_size_rejects_invalid_steps() {
        for step in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                FixedStepSize::new(step),
                Err(OptimizerError::InvalidConfiguration { parameter, .. })
                    if parameter == "step_size"
            ));
        }
    }

    #[test]
    fn test_line_search_params() {
        let params = LineSearchParams::<f64>::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.ftol, 1e-4);
        assert_eq!(params.gtol, 0.1);

        let bad_order = LineSearchParams::new(0.5, 0.1);
        assert!(bad_order.validate().is_err());

        let bad_step = LineSearchParams::<f64>::default().with_initial_step(0.0);
        assert!(bad_step.validate().is_err());

        let bad_budget = LineSearchParams::<f64>::default().with_max_iterations(0);
        assert!(matches!(
            bad_budget.validate(),
            Err(OptimizerError::InvalidConfiguration { parameter, .. })
                if parameter == "max_iterations"
        ));
    }
}
