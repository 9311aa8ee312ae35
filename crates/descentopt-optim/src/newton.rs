//! Newton's method with an exact Hessian.
//!
//! Each iteration solves the Newton system `H δ = g` by LU decomposition and
//! takes the full step `x ← x − δ`. There is no line search, damping or
//! regularization: a singular or badly conditioned Hessian stops the method
//! with `SingularMatrix`.
//!
//! Quadratic models are minimized in exactly one iteration.

use descentopt_core::{
    error::{OptimizerError, Result},
    model::{CountingModel, Model},
    observer::{IterationObserver, IterationRecord, NoOpObserver},
    optimizer::{OptimizationResult, StoppingCriterion, TerminationReason},
    state::{check_initial_point, check_unconstrained, OptimizationState},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::time::Instant;
use tracing::{debug, info};

/// Configuration for Newton's method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NewtonConfig<T: Scalar> {
    /// Gradient norm tolerance (`etol`)
    pub tolerance: T,
    /// Maximum number of iterations (`itermax`)
    pub max_iterations: usize,
}

impl<T: Scalar> Default for NewtonConfig<T> {
    fn default() -> Self {
        Self {
            tolerance: <T as Scalar>::from_f64(1e-6),
            max_iterations: 1000,
        }
    }
}

impl<T: Scalar> NewtonConfig<T> {
    /// Create a new Newton configuration with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gradient norm tolerance
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Stopping criterion described by this configuration.
    pub fn stopping_criterion(&self) -> StoppingCriterion<T> {
        StoppingCriterion::new(self.tolerance, self.max_iterations)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance >= T::zero()) || !Float::is_finite(self.tolerance) {
            return Err(OptimizerError::invalid_configuration(
                "Gradient tolerance must be finite and non-negative",
                "tolerance",
                self.tolerance.to_string(),
            ));
        }
        Ok(())
    }
}

/// Iteration state of Newton's method.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonState<T: Scalar> {
    /// Point, value, gradient and iteration count
    pub state: OptimizationState<T>,
    /// Hessian at the current point
    pub h: DMatrix<T>,
}

/// Newton's method for unconstrained minimization.
#[derive(Debug)]
pub struct Newton<T, M, O = NoOpObserver>
where
    T: Scalar,
    M: Model<T>,
    O: IterationObserver<T>,
{
    model: CountingModel<M>,
    config: NewtonConfig<T>,
    observer: O,
    state: NewtonState<T>,
}

impl<T, M> Newton<T, M>
where
    T: Scalar,
    M: Model<T>,
{
    /// Creates an optimizer starting at the model's initial point.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a constrained model before any
    /// evaluation, and propagates model errors from the initial evaluation
    /// (including a model without Hessian).
    pub fn new(model: M, config: NewtonConfig<T>) -> Result<Self> {
        check_unconstrained(&model)?;
        let x0 = model.initial_point();
        Self::from_point(model, x0, config)
    }

    /// Creates an optimizer starting at `x0`.
    pub fn from_point(model: M, x0: DVector<T>, config: NewtonConfig<T>) -> Result<Self> {
        check_unconstrained(&model)?;
        config.validate()?;
        check_initial_point(&model, &x0)?;

        let model = CountingModel::new(model);
        let state = evaluate(&model, x0, 0)?;
        debug!(
            model = model.name(),
            dimension = state.state.dimension(),
            value = %state.state.f,
            gradient_norm = %state.state.g_norm,
            "initialized Newton"
        );

        Ok(Self {
            model,
            config,
            observer: NoOpObserver,
            state,
        })
    }
}

impl<T, M, O> Newton<T, M, O>
where
    T: Scalar,
    M: Model<T>,
    O: IterationObserver<T>,
{
    /// Replaces the iteration observer.
    pub fn with_observer<O2: IterationObserver<T>>(self, observer: O2) -> Newton<T, M, O2> {
        Newton {
            model: self.model,
            config: self.config,
            observer,
            state: self.state,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &NewtonConfig<T> {
        &self.config
    }

    /// Returns the model.
    pub fn model(&self) -> &M {
        &self.model.inner
    }

    /// Returns the current iteration state.
    pub fn state(&self) -> &NewtonState<T> {
        &self.state
    }

    /// Returns the current point.
    pub fn point(&self) -> &DVector<T> {
        &self.state.state.x
    }

    /// Returns the observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Consumes the optimizer and returns its observer.
    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Why the loop would stop at the current state, if it would.
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.config.stopping_criterion().check(&self.state.state)
    }

    /// Runs Newton iterations and returns the final point.
    ///
    /// # Errors
    ///
    /// Returns `SingularMatrix` when the Hessian cannot be factored or the
    /// step is not finite, and propagates model errors.
    pub fn search(&mut self) -> Result<DVector<T>> {
        self.iterate()?;
        Ok(self.state.state.x.clone())
    }

    /// Runs the loop and reports the outcome with timing and evaluation counts.
    pub fn run(&mut self) -> Result<OptimizationResult<T>> {
        let start = Instant::now();
        let reason = self.iterate()?;
        Ok(
            OptimizationResult::from_state(self.state.state.clone(), reason, start.elapsed())
                .with_evaluations(self.model.counts()),
        )
    }

    fn iterate(&mut self) -> Result<TerminationReason> {
        let criterion = self.config.stopping_criterion();
        self.observer
            .on_start(&IterationRecord::from_state(&self.state.state))?;

        let reason = loop {
            if let Some(reason) = criterion.check(&self.state.state) {
                break reason;
            }
            let current = self.state.clone();
            let (next, record) = self.step(&current)?;
            self.observer.observe(&record)?;
            self.state = next;
        };
        info!(
            %reason,
            iterations = self.state.state.k,
            value = %self.state.state.f,
            gradient_norm = %self.state.state.g_norm,
            "Newton finished"
        );
        self.observer
            .on_finish(reason, &IterationRecord::from_state(&self.state.state))?;
        Ok(reason)
    }

    /// Performs one Newton iteration from `current`.
    ///
    /// The objective is re-evaluated at the new point together with the
    /// gradient and Hessian.
    pub fn step(
        &mut self,
        current: &NewtonState<T>,
    ) -> Result<(NewtonState<T>, IterationRecord<T>)> {
        let k = current.state.k;
        let delta = newton_step(&current.h, &current.state.g, k)?;
        let x = &current.state.x - &delta;

        let next = evaluate(&self.model, x, k + 1)?;
        debug!(
            iteration = next.state.k,
            value = %next.state.f,
            gradient_norm = %next.state.g_norm,
            step_norm = %delta.norm(),
            "Newton iteration"
        );

        let record = IterationRecord::from_state(&next.state);
        Ok((next, record))
    }
}

fn evaluate<T: Scalar, M: Model<T> + ?Sized>(
    model: &M,
    x: DVector<T>,
    k: usize,
) -> Result<NewtonState<T>> {
    let h = model.hessian(&x)?;
    let n = x.len();
    if h.nrows() != n || h.ncols() != n {
        return Err(OptimizerError::dimension_mismatch(
            format!("{}x{}", n, n),
            format!("{}x{}", h.nrows(), h.ncols()),
        ));
    }
    let state = OptimizationState::evaluate(model, x, k)?;
    Ok(NewtonState { state, h })
}

/// Solves `h δ = g` by LU decomposition with partial pivoting.
///
/// The factor is rejected when the smallest pivot is below
/// `Scalar::PIVOT_TOLERANCE` relative to the largest one.
pub fn newton_step<T: Scalar>(
    h: &DMatrix<T>,
    g: &DVector<T>,
    iteration: usize,
) -> Result<DVector<T>> {
    let lu = h.clone().lu();

    let pivots = lu.u().diagonal();
    let (smallest, largest) = pivots.iter().fold(
        (<T as Float>::infinity(), T::zero()),
        |(lo, hi), &d| {
            let d = Float::abs(d);
            (Float::min(lo, d), Float::max(hi, d))
        },
    );
    if !(largest > T::zero()) || !(smallest > T::PIVOT_TOLERANCE * largest) {
        return Err(OptimizerError::singular_matrix(
            iteration,
            format!(
                "pivot ratio {:e} below tolerance {:e}",
                smallest / largest,
                T::PIVOT_TOLERANCE
            ),
        ));
    }

    let delta = lu
        .solve(g)
        .ok_or_else(|| OptimizerError::singular_matrix(iteration, "LU solve failed"))?;
    if delta.iter().any(|v| !Float::is_finite(*v)) {
        return Err(OptimizerError::singular_matrix(
            iteration,
            "Newton step is not finite",
        ));
    }
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use descentopt_core::{
        error::ModelError,
        model::FnModel,
        observer::RecordingObserver,
        test_utils::{Constrained, ConvexQuadratic, Quartic, SingularHessian, SumOfSquares},
    };

    #[test]
    fn test_config_defaults() {
        let config = NewtonConfig::<f64>::default();
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.max_iterations, 1000);
        assert!(config.validate().is_ok());
        assert!(NewtonConfig::<f64>::new()
            .with_tolerance(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_newton_step_solves_system() {
        let h = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let g = DVector::from_vec(vec![1.0, 2.0]);

        let delta = newton_step(&h, &g, 0).unwrap();

        assert_relative_eq!(&h * &delta, g, epsilon = 1e-12);
    }

    #[test]
    fn test_newton_step_rejects_singular() {
        let h = DMatrix::from_element(2, 2, 2.0);
        let g = DVector::from_vec(vec![1.0, 1.0]);

        assert!(matches!(
            newton_step(&h, &g, 4),
            Err(OptimizerError::SingularMatrix { iteration: 4, .. })
        ));

        // Numerically singular: pivot ratio around 1e-17
        let h = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1e-17]);
        assert!(matches!(
            newton_step(&h, &g, 0),
            Err(OptimizerError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_sum_of_squares_single_iteration() {
        let model = SumOfSquares::new(DVector::from_vec(vec![3.0, -4.0, 12.0]));
        let mut newton = Newton::new(model, NewtonConfig::new()).unwrap();

        let x = newton.search().unwrap();

        assert_relative_eq!(x, DVector::zeros(3), epsilon = 1e-12);
        assert_eq!(newton.state().state.k, 1);
        assert_eq!(newton.state().state.f, 0.0);
    }

    #[test]
    fn test_quadratic_single_iteration() {
        let model = ConvexQuadratic::<f64>::diagonal(5);
        let solution = model.solution().unwrap();
        let mut newton = Newton::new(model, NewtonConfig::new()).unwrap();

        let result = newton.run().unwrap();

        assert_eq!(result.iterations, 1);
        assert!(result.converged);
        assert_relative_eq!(result.point, solution, epsilon = 1e-12);
        assert_eq!(result.evaluations.hessian, 2);
    }

    #[test]
    fn test_objective_refreshed_every_iteration() {
        let model = Quartic::new(DVector::from_vec(vec![1.0, -2.0]));
        let mut newton = Newton::new(model, NewtonConfig::new())
            .unwrap()
            .with_observer(RecordingObserver::new());

        newton.search().unwrap();
        let k = newton.state().state.k;
        let records = newton.into_observer().records;

        assert_eq!(records.len(), k);
        assert!(k > 1);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.iteration, i + 1);
            assert_eq!(record.step_length, None);
        }
        for pair in records.windows(2) {
            assert!(pair[1].objective_value < pair[0].objective_value);
        }
    }

    #[test]
    fn test_singular_hessian_is_fatal() {
        let mut newton = Newton::new(SingularHessian, NewtonConfig::<f64>::new()).unwrap();

        let result = newton.search();

        assert!(matches!(
            result,
            Err(OptimizerError::SingularMatrix { iteration: 0, .. })
        ));
        assert_eq!(newton.state().state.k, 0);
    }

    #[test]
    fn test_constrained_model_rejected() {
        let model = CountingModel::new(Constrained::new(SumOfSquares::<f64>::default(), 2));

        assert!(matches!(
            Newton::new(&model, NewtonConfig::new()),
            Err(OptimizerError::InvalidConfiguration { .. })
        ));
        assert_eq!(model.counts().total(), 0);
    }

    #[test]
    fn test_iteration_cap() {
        let model = Quartic::new(DVector::from_vec(vec![10.0]));
        let mut newton = Newton::new(model, NewtonConfig::new().with_max_iterations(2)).unwrap();

        let result = newton.run().unwrap();

        assert_eq!(result.iterations, 2);
        assert_eq!(result.termination_reason, TerminationReason::MaxIterations);
        // Each step contracts by 2/3
        assert_relative_eq!(result.point[0], 10.0 * 4.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_gradient_is_an_error() {
        // x ↦ xᵗx whose gradient is NaN at the origin, where the first step lands
        let model = FnModel::new(
            DVector::from_vec(vec![3.0, 4.0]),
            |x: &DVector<f64>| x.dot(x),
            |x: &DVector<f64>| {
                if x.norm() == 0.0 {
                    DVector::from_element(x.len(), f64::NAN)
                } else {
                    x * 2.0
                }
            },
        )
        .with_hessian(|x: &DVector<f64>| DMatrix::identity(x.len(), x.len()) * 2.0);
        let mut newton = Newton::new(model, NewtonConfig::new())
            .unwrap()
            .with_observer(RecordingObserver::new());

        let err = newton.search().unwrap_err();

        match err {
            OptimizerError::Model(ModelError::EvaluationFailed { reason }) => {
                assert_eq!(reason, "non-finite gradient at iteration 1");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(newton.state().state.k, 0);
        assert_eq!(newton.termination_reason(), None);
        assert!(newton.into_observer().is_empty());
    }
}
