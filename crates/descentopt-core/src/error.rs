//! Error types for descent optimization.
//!
//! This module defines the error types produced by models and by the
//! optimizers that drive them. Reaching the iteration cap is not an error;
//! the caller inspects the final gradient norm instead.

use thiserror::Error;

/// Errors that can occur while evaluating a model.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The objective, gradient or Hessian could not be evaluated.
    #[error("Model evaluation failed: {reason}")]
    EvaluationFailed {
        /// Description of the evaluation failure
        reason: String,
    },

    /// Dimension mismatch between a point and the model.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Method or capability not provided by the model.
    ///
    /// Returned by `Model::hessian` for first-order models.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },
}

impl ModelError {
    /// Create an EvaluationFailed error with a custom reason.
    pub fn evaluation_failed<S: Into<String>>(reason: S) -> Self {
        Self::EvaluationFailed {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create the EvaluationFailed error for a NaN or infinite `quantity`.
    pub fn non_finite(quantity: &str, iteration: usize) -> Self {
        Self::evaluation_failed(format!(
            "non-finite {} at iteration {}",
            quantity, iteration
        ))
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }
}

/// Errors that can occur during optimization.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid optimizer configuration.
    ///
    /// Raised at construction time, before any model evaluation, when the
    /// model is constrained or a parameter is out of range.
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Unknown direction-update strategy name.
    #[error("Unknown strategy '{name}'; expected one of: {valid}")]
    InvalidStrategy {
        /// The name that failed to parse
        name: String,
        /// Comma-separated list of accepted names
        valid: String,
    },

    /// The Hessian could not be used to solve for a Newton step.
    #[error("Singular or ill-conditioned Hessian at iteration {iteration}: {reason}")]
    SingularMatrix {
        /// Iteration at which the solve failed
        iteration: usize,
        /// Description of the failure
        reason: String,
    },

    /// A direction-update formula hit a vanishing denominator or produced a
    /// non-finite coefficient.
    #[error("Numerical degeneracy in {strategy}: {quantity}")]
    NumericalDegeneracy {
        /// Strategy whose formula degenerated
        strategy: String,
        /// The quantity that vanished or overflowed
        quantity: String,
    },

    /// Line search failed to find an acceptable step.
    ///
    /// This error occurs when the line search algorithm cannot find
    /// a step length satisfying the strong Wolfe conditions.
    #[error("Line search failed: {reason}")]
    LineSearchFailed {
        /// Description of why the line search failed
        reason: String,
        /// Number of iterations attempted
        iterations: usize,
        /// Last step size tried
        last_step_size: f64,
        /// Function value at the starting point
        initial_value: f64,
    },

    /// Dimension mismatch between vectors or matrices.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Propagated model error.
    #[error("Model evaluation failed: {0}")]
    Model(#[from] ModelError),

    /// An iteration observer could not record its observation.
    #[error("Iteration observer failed: {reason}")]
    ObserverFailed {
        /// Description of the failure
        reason: String,
    },
}

impl OptimizerError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create the error returned when a constrained model is supplied.
    pub fn constrained_model(num_constraints: usize) -> Self {
        Self::invalid_configuration(
            "This method only works on unconstrained problems",
            "num_constraints",
            num_constraints.to_string(),
        )
    }

    /// Create an InvalidStrategy error listing the accepted names.
    pub fn invalid_strategy<S1, S2>(name: S1, valid: &[S2]) -> Self
    where
        S1: Into<String>,
        S2: AsRef<str>,
    {
        Self::InvalidStrategy {
            name: name.into(),
            valid: valid
                .iter()
                .map(AsRef::<str>::as_ref)
                .collect::<Vec<&str>>()
                .join(", "),
        }
    }

    /// Create a SingularMatrix error.
    pub fn singular_matrix<S: Into<String>>(iteration: usize, reason: S) -> Self {
        Self::SingularMatrix {
            iteration,
            reason: reason.into(),
        }
    }

    /// Create a NumericalDegeneracy error.
    pub fn numerical_degeneracy<S1, S2>(strategy: S1, quantity: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::NumericalDegeneracy {
            strategy: strategy.into(),
            quantity: quantity.into(),
        }
    }

    /// Create a LineSearchFailed error with detailed context.
    pub fn line_search_failed<S: Into<String>>(
        reason: S,
        iterations: usize,
        last_step_size: f64,
        initial_value: f64,
    ) -> Self {
        Self::LineSearchFailed {
            reason: reason.into(),
            iterations,
            last_step_size,
            initial_value,
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an ObserverFailed error.
    pub fn observer_failed<S: Into<String>>(reason: S) -> Self {
        Self::ObserverFailed {
            reason: reason.into(),
        }
    }
}

/// Result type alias for model evaluations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;

/// Result type alias used by the optimizers.
pub type Result<T> = OptimizerResult<T>;
