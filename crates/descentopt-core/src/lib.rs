//! Core traits and types for descent optimization.
//!
//! This crate provides the building blocks shared by the optimizers in
//! `descentopt-optim`: the model interface, the iteration state, the
//! stopping policy, line searches and iteration observers.
//!
//! # Key Concepts
//!
//! - **Model**: black-box objective with gradient and optional Hessian
//! - **State**: the iterate `(x, f, g, ‖g‖, k)` replaced once per iteration
//! - **Line search**: step length selection under the strong Wolfe conditions
//! - **Observer**: per-iteration diagnostics, decoupled from the algorithms
//!
//! # Modules
//!
//! - [`error`]: Error types for models and optimizers
//! - [`line_search`]: Line search algorithms
//! - [`model`]: Model interface and adapters
//! - [`observer`]: Iteration observers
//! - [`optimizer`]: Stopping criterion and optimization results
//! - [`state`]: Iteration state
//! - [`types`]: Scalar trait and type aliases

pub mod error;
pub mod line_search;
pub mod model;
pub mod observer;
pub mod optimizer;
pub mod state;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used items at the crate root
pub use error::{ModelError, ModelResult, OptimizerError, OptimizerResult, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use descentopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ModelError, ModelResult, OptimizerError, OptimizerResult, Result};
    pub use crate::line_search::{
        FixedStepSize, LineSearch, LineSearchParams, LineSearchResult, StrongWolfeLineSearch,
    };
    pub use crate::model::{CountingModel, EvaluationCounts, FnModel, Model};
    pub use crate::observer::{
        IterationObserver, IterationRecord, NoOpObserver, RecordingObserver, TableLayout,
        TableObserver, TracingObserver,
    };
    pub use crate::optimizer::{OptimizationResult, StoppingCriterion, TerminationReason};
    pub use crate::state::{direction_cosine, OptimizationState};
    pub use crate::types::{DMatrix, DVector, Scalar};
}
