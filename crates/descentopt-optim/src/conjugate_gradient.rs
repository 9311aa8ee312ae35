//! Nonlinear Conjugate Gradient optimizer.
//!
//! Conjugate gradient methods build each search direction from the current
//! negative gradient and the previous direction, which gives much faster
//! convergence than steepest descent at the same per-iteration cost.
//!
//! # Algorithm Overview
//!
//! Starting from `p₀ = −g₀`, each iteration:
//! 1. Finds a step `α` along `p` satisfying the strong Wolfe conditions
//! 2. Moves to `x_new = x + α p`
//! 3. Computes `β` from the chosen [`StrategyKind`]
//! 4. Sets `p_new = −g_new + β p`
//!
//! The loop runs while `‖g‖ > tolerance` and `k < max_iterations`. Reaching
//! the iteration cap is not an error; check [`ConjugateGradient::termination_reason`].
//!
//! # Example
//!
//! ```rust
//! use descentopt_core::model::FnModel;
//! use descentopt_core::types::DVector;
//! use descentopt_optim::{CGConfig, ConjugateGradient};
//!
//! let model = FnModel::new(
//!     DVector::from_vec(vec![3.0, 4.0]),
//!     |x: &DVector<f64>| x.dot(x),
//!     |x: &DVector<f64>| x * 2.0,
//! );
//! let mut cg = ConjugateGradient::new(model, CGConfig::fletcher_reeves()).unwrap();
//! let x = cg.solve().unwrap();
//! assert!(x.norm() < 1e-5);
//! ```
//!
//! # References
//!
//! - Hager & Zhang, "A survey of nonlinear conjugate gradient methods" (2006)
//! - Nocedal & Wright, "Numerical Optimization", chapter 5 (2006)

use crate::strategy::{DirectionUpdate, StrategyKind};
use descentopt_core::{
    error::Result,
    line_search::{LineSearch, LineSearchParams, StrongWolfeLineSearch},
    model::{CountingModel, Model},
    observer::{IterationObserver, IterationRecord, NoOpObserver},
    optimizer::{OptimizationResult, StoppingCriterion, TerminationReason},
    state::{check_initial_point, check_unconstrained, direction_cosine, OptimizationState},
    types::{DVector, Scalar},
    OptimizerError,
};
use num_traits::Float;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for the Conjugate Gradient optimizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CGConfig<T: Scalar> {
    /// Gradient norm tolerance (`etol`)
    pub tolerance: T,
    /// Maximum number of iterations (`itermax`)
    pub max_iterations: usize,
    /// Direction-update strategy
    pub strategy: StrategyKind,
    /// Line search parameters
    pub line_search_params: LineSearchParams<T>,
}

impl<T: Scalar> Default for CGConfig<T> {
    fn default() -> Self {
        Self {
            tolerance: <T as Scalar>::from_f64(1e-5),
            max_iterations: 10_000,
            strategy: StrategyKind::HagerZhang,
            line_search_params: LineSearchParams::new(
                <T as Scalar>::from_f64(1e-4),
                <T as Scalar>::from_f64(0.1),
            ),
        }
    }
}

impl<T: Scalar> CGConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gradient norm tolerance.
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the direction-update strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the line search parameters.
    pub fn with_line_search(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search_params = params;
        self
    }

    /// Creates a configuration for the Fletcher-Reeves method.
    pub fn fletcher_reeves() -> Self {
        Self::new().with_strategy(StrategyKind::FletcherReeves)
    }

    /// Creates a configuration for the Polak-Ribière method.
    pub fn polak_ribiere() -> Self {
        Self::new().with_strategy(StrategyKind::PolakRibiere)
    }

    /// Creates a configuration for the Polak-Ribière+ method.
    pub fn polak_ribiere_plus() -> Self {
        Self::new().with_strategy(StrategyKind::PolakRibierePlus)
    }

    /// Creates a configuration for the PR-FR hybrid method.
    pub fn hybrid() -> Self {
        Self::new().with_strategy(StrategyKind::PolakRibiereFletcherReevesHybrid)
    }

    /// Creates a configuration for the Hager-Zhang method.
    pub fn hager_zhang() -> Self {
        Self::new().with_strategy(StrategyKind::HagerZhang)
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
        self.line_search_params.validate()
    }
}

/// Iteration state of the conjugate gradient method.
#[derive(Debug, Clone, PartialEq)]
pub struct CGState<T: Scalar> {
    /// Point, value, gradient and iteration count
    pub state: OptimizationState<T>,
    /// Search direction
    pub p: DVector<T>,
    /// Cosine of the angle between `g` and `p`
    pub cos0: T,
}

impl<T: Scalar> CGState<T> {
    /// Steepest descent state at an evaluated point.
    pub fn steepest_descent(state: OptimizationState<T>) -> Self {
        let p = -&state.g;
        let cos0 = direction_cosine(&state.g, &p);
        Self { state, p, cos0 }
    }

    fn record(&self) -> IterationRecord<T> {
        IterationRecord {
            direction_cosine: Some(self.cos0),
            ..IterationRecord::from_state(&self.state)
        }
    }
}

/// Nonlinear Conjugate Gradient optimizer.
///
/// Owns its model, line search and observer. The model can be borrowed
/// instead by passing `&model`.
#[derive(Debug)]
pub struct ConjugateGradient<T, M, L = StrongWolfeLineSearch, O = NoOpObserver>
where
    T: Scalar,
    M: Model<T>,
    L: LineSearch<T>,
    O: IterationObserver<T>,
{
    model: CountingModel<M>,
    config: CGConfig<T>,
    line_search: L,
    observer: O,
    state: CGState<T>,
}

impl<T, M> ConjugateGradient<T, M>
where
    T: Scalar,
    M: Model<T>,
{
    /// Creates an optimizer starting at the model's initial point.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a constrained model or an invalid
    /// configuration, before evaluating the model.
    pub fn new(model: M, config: CGConfig<T>) -> Result<Self> {
        check_unconstrained(&model)?;
        let x0 = model.initial_point();
        Self::from_point(model, x0, config)
    }

    /// Creates an optimizer starting at `x0`.
    pub fn from_point(model: M, x0: DVector<T>, config: CGConfig<T>) -> Result<Self> {
        check_unconstrained(&model)?;
        config.validate()?;
        check_initial_point(&model, &x0)?;

        let model = CountingModel::new(model);
        let state = CGState::steepest_descent(OptimizationState::evaluate(&model, x0, 0)?);
        debug!(
            model = model.name(),
            dimension = state.state.dimension(),
            value = %state.state.f,
            gradient_norm = %state.state.g_norm,
            "initialized conjugate gradient"
        );

        Ok(Self {
            model,
            config,
            line_search: StrongWolfeLineSearch::new(),
            observer: NoOpObserver,
            state,
        })
    }
}

impl<T, M, L, O> ConjugateGradient<T, M, L, O>
where
    T: Scalar,
    M: Model<T>,
    L: LineSearch<T>,
    O: IterationObserver<T>,
{
    /// Replaces the line search.
    pub fn with_line_search<L2: LineSearch<T>>(
        self,
        line_search: L2,
    ) -> ConjugateGradient<T, M, L2, O> {
        ConjugateGradient {
            model: self.model,
            config: self.config,
            line_search,
            observer: self.observer,
            state: self.state,
        }
    }

    /// Replaces the iteration observer.
    pub fn with_observer<O2: IterationObserver<T>>(
        self,
        observer: O2,
    ) -> ConjugateGradient<T, M, L, O2> {
        ConjugateGradient {
            model: self.model,
            config: self.config,
            line_search: self.line_search,
            observer,
            state: self.state,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CGConfig<T> {
        &self.config
    }

    /// Returns the model.
    pub fn model(&self) -> &M {
        &self.model.inner
    }

    /// Returns the current iteration state.
    pub fn state(&self) -> &CGState<T> {
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

    /// Runs the loop with the configured strategy and returns the final point.
    pub fn solve(&mut self) -> Result<DVector<T>> {
        self.iterate()?;
        Ok(self.state.state.x.clone())
    }

    /// Runs the loop with the strategy named `name` (`"FR"`, `"PR"`, `"PR+"`,
    /// `"PR-FR"`, `"HZ"` or a full strategy name).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStrategy` for an unknown name, before any iteration.
    pub fn solve_with(&mut self, name: &str) -> Result<DVector<T>> {
        let strategy = name.parse::<StrategyKind>()?;
        self.solve_with_strategy(strategy)
    }

    /// Runs the loop with `strategy`, which becomes the configured strategy.
    pub fn solve_with_strategy(&mut self, strategy: StrategyKind) -> Result<DVector<T>> {
        self.config.strategy = strategy;
        self.solve()
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
        self.observer.on_start(&self.state.record())?;

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
            strategy = %self.config.strategy,
            %reason,
            iterations = self.state.state.k,
            value = %self.state.state.f,
            gradient_norm = %self.state.state.g_norm,
            "conjugate gradient finished"
        );
        self.observer.on_finish(reason, &self.state.record())?;
        Ok(reason)
    }

    /// Performs one iteration from `current` and returns the next state with
    /// the record describing the iteration.
    ///
    /// Uses the configured strategy. The optimizer's own state is not
    /// modified.
    pub fn step(&mut self, current: &CGState<T>) -> Result<(CGState<T>, IterationRecord<T>)> {
        let state = &current.state;
        let mut p = current.p.clone();
        let mut cos0 = current.cos0;

        if !(state.g.dot(&p) < T::zero()) {
            warn!(
                iteration = state.k,
                strategy = %self.config.strategy,
                "not a descent direction, restarting with steepest descent"
            );
            p = -&state.g;
            cos0 = direction_cosine(&state.g, &p);
        }

        let search = self.line_search.search(
            &self.model,
            state.f,
            &state.x,
            &state.g,
            &p,
            &self.config.line_search_params,
        )?;
        let record = IterationRecord::conjugate_gradient(
            state.k,
            state.f,
            state.g_norm,
            search.step_length,
            cos0,
        );

        let x = &state.x + &p * search.step_length;
        let next = OptimizationState::new(x, search.value, search.gradient, state.k + 1)?;

        let y = &next.g - &state.g;
        let beta = self
            .config
            .strategy
            .coefficient(&DirectionUpdate::new(&state.g, &p, &next.g, &y))?;
        let p_new = -&next.g + &p * beta;
        let cos_new = direction_cosine(&next.g, &p_new);
        debug!(
            iteration = state.k,
            value = %next.f,
            gradient_norm = %next.g_norm,
            step = %search.step_length,
            beta = %beta,
            evaluations = search.evaluations,
            "conjugate gradient iteration"
        );

        Ok((
            CGState {
                state: next,
                p: p_new,
                cos0: cos_new,
            },
            record,
        ))
    }
}
