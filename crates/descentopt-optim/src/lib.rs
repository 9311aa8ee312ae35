//! Descent optimization algorithms.
//!
//! This crate provides the optimizers built on `descentopt-core`:
//!
//! # Available Optimizers
//!
//! - **Conjugate Gradient**: nonlinear CG with five direction-update
//!   strategies (Fletcher-Reeves, Polak-Ribière, Polak-Ribière+, PR-FR
//!   hybrid, Hager-Zhang) and a strong Wolfe line search
//! - **Newton**: full-step Newton iterations with an exact Hessian
//!
//! # Examples
//!
//! ```rust
//! use descentopt_core::test_utils::Rosenbrock;
//! use descentopt_optim::{CGConfig, ConjugateGradient, StrategyKind};
//!
//! let mut cg = ConjugateGradient::new(Rosenbrock::new(2), CGConfig::<f64>::new()).unwrap();
//! let x = cg.solve_with_strategy(StrategyKind::PolakRibierePlus).unwrap();
//! assert!((x[0] - 1.0).abs() < 1e-4);
//! ```

pub mod conjugate_gradient;
pub mod newton;
pub mod strategy;

// Re-export main optimizers for convenience
pub use conjugate_gradient::{CGConfig, CGState, ConjugateGradient};
pub use newton::{Newton, NewtonConfig, NewtonState};
pub use strategy::{DirectionUpdate, StrategyKind};
