//! Convergence policy and optimization results.
//!
//! Both optimizers share one loop guard: iterate while the gradient norm
//! exceeds the tolerance and the iteration count is below the cap. Reaching
//! the cap is a normal exit; [`TerminationReason`] tells the two apart.
//!
//! # Key Components
//!
//! - **StoppingCriterion**: tolerance and iteration cap
//! - **TerminationReason**: why a loop stopped
//! - **OptimizationResult**: final point plus run metadata

use crate::{model::EvaluationCounts, state::OptimizationState, types::Scalar};
use std::fmt;
use std::time::Duration;

/// Reason for termination of an optimization loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// Gradient norm at or below the tolerance
    Converged,
    /// Iteration cap reached with the gradient norm still above tolerance
    MaxIterations,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Converged => write!(f, "converged"),
            TerminationReason::MaxIterations => write!(f, "maximum iterations reached"),
        }
    }
}

/// Stopping criterion shared by the CG and Newton loops.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Gradient norm tolerance (`etol`)
    pub tolerance: T,
    /// Maximum number of iterations (`itermax`)
    pub max_iterations: usize,
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a new stopping criterion.
    pub fn new(tolerance: T, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Sets the gradient tolerance.
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Loop guard: `g_norm > tolerance && k < max_iterations`.
    pub fn should_continue(&self, state: &OptimizationState<T>) -> bool {
        self.check(state).is_none()
    }

    /// Returns the termination reason for a state, or `None` if the loop
    /// would continue.
    pub fn check(&self, state: &OptimizationState<T>) -> Option<TerminationReason> {
        if state.g_norm <= self.tolerance {
            Some(TerminationReason::Converged)
        } else if state.k >= self.max_iterations {
            Some(TerminationReason::MaxIterations)
        } else {
            None
        }
    }
}

/// Result of an optimization run.
///
/// Contains the final point, objective value, and metadata about the
/// optimization process.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T: Scalar> {
    /// The final point
    pub point: crate::types::DVector<T>,

    /// The objective value at the final point
    pub value: T,

    /// The gradient norm at the final point
    pub gradient_norm: T,

    /// Number of iterations performed
    pub iterations: usize,

    /// Model evaluations performed during the run
    pub evaluations: EvaluationCounts,

    /// Total optimization time
    pub duration: Duration,

    /// Reason for termination
    pub termination_reason: TerminationReason,

    /// Whether the gradient norm reached the tolerance
    pub converged: bool,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Creates a result from a final state.
    pub fn from_state(
        state: OptimizationState<T>,
        termination_reason: TerminationReason,
        duration: Duration,
    ) -> Self {
        Self {
            point: state.x,
            value: state.f,
            gradient_norm: state.g_norm,
            iterations: state.k,
            evaluations: EvaluationCounts::default(),
            duration,
            termination_reason,
            converged: termination_reason == TerminationReason::Converged,
        }
    }

    /// Sets the evaluation counts.
    pub fn with_evaluations(mut self, evaluations: EvaluationCounts) -> Self {
        self.evaluations = evaluations;
        self
    }
}
