//! # DescentOpt
//!
//! Unconstrained minimization of smooth objectives with nonlinear conjugate
//! gradient and Newton methods.
//!
//! This crate re-exports the workspace crates under a single name:
//!
//! - [`descentopt_core`]: model interface, iteration state, line searches, observers
//! - [`descentopt_optim`]: the conjugate gradient and Newton optimizers
//!
//! ## Quick Start
//!
//! ```rust
//! use descentopt::prelude::*;
//!
//! // f(x) = (x₀ − 1)² + 10 (x₁ + 2)²
//! let model = FnModel::new(
//!     DVector::from_vec(vec![0.0, 0.0]),
//!     |x: &DVector<f64>| (x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2),
//!     |x: &DVector<f64>| DVector::from_vec(vec![2.0 * (x[0] - 1.0), 20.0 * (x[1] + 2.0)]),
//! );
//!
//! let mut cg = ConjugateGradient::new(model, CGConfig::new()).unwrap();
//! let x = cg.solve_with("PR+").unwrap();
//! assert!((x[0] - 1.0).abs() < 1e-5 && (x[1] + 2.0).abs() < 1e-5);
//! ```
//!
//! ## Observing iterations
//!
//! Optimizers report each iteration to an [`IterationObserver`](prelude::IterationObserver).
//! `TableObserver::stdout(TableLayout::ConjugateGradient)` prints the classic
//! iteration table; any `FnMut(&IterationRecord<T>)` closure works too.
//!
//! ## Features
//!
//! - `serde`: serialization of configurations and iteration records
//! - `test-utils`: standard test problems (Rosenbrock, quadratics, ...)

pub use descentopt_core;
pub use descentopt_optim;

// Re-export nalgebra for convenience
pub use nalgebra;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use descentopt_core::prelude::*;
    pub use descentopt_optim::{
        CGConfig, CGState, ConjugateGradient, DirectionUpdate, Newton, NewtonConfig, NewtonState,
        StrategyKind,
    };
}
