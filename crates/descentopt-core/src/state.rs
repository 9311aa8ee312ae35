//! Iteration state shared by the optimizers.
//!
//! The state is an explicit value: the loops construct a new state at the
//! end of every iteration instead of mutating fields in place, so a single
//! step can be tested in isolation from fixed inputs.

use crate::{
    error::{ModelError, OptimizerError, Result},
    model::Model,
    types::{DVector, Scalar},
};
use num_traits::Float;

/// Point, objective value and gradient at one iterate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationState<T: Scalar> {
    /// Current point
    pub x: DVector<T>,
    /// Objective value at `x`
    pub f: T,
    /// Gradient at `x`
    pub g: DVector<T>,
    /// Euclidean norm of `g`
    pub g_norm: T,
    /// Number of accepted iterations
    pub k: usize,
}

impl<T: Scalar> OptimizationState<T> {
    /// Builds a state from already evaluated quantities.
    ///
    /// The gradient norm is always derived from `g`; it cannot be supplied.
    /// A non-finite objective value or gradient is an evaluation failure.
    pub fn new(x: DVector<T>, f: T, g: DVector<T>, k: usize) -> Result<Self> {
        if g.len() != x.len() {
            return Err(OptimizerError::dimension_mismatch(x.len(), g.len()));
        }
        if !Float::is_finite(f) {
            return Err(ModelError::non_finite("objective value", k).into());
        }
        let g_norm = g.norm();
        if !Float::is_finite(g_norm) {
            return Err(ModelError::non_finite("gradient", k).into());
        }
        Ok(Self {
            x,
            f,
            g,
            g_norm,
            k,
        })
    }

    /// Evaluates the objective and gradient of `model` at `x`.
    pub fn evaluate<M: Model<T> + ?Sized>(model: &M, x: DVector<T>, k: usize) -> Result<Self> {
        let f = model.objective(&x)?;
        let g = model.gradient(&x)?;
        Self::new(x, f, g, k)
    }

    /// Number of variables.
    pub fn dimension(&self) -> usize {
        self.x.len()
    }
}

/// Cosine of the angle between `g` and `p`.
///
/// Returns zero when either vector vanishes.
pub fn direction_cosine<T: Scalar>(g: &DVector<T>, p: &DVector<T>) -> T {
    let denom = g.norm() * p.norm();
    if denom == T::zero() {
        T::zero()
    } else {
        g.dot(p) / denom
    }
}

/// Checks that a starting point matches the model dimension.
pub fn check_initial_point<T: Scalar, M: Model<T> + ?Sized>(
    model: &M,
    x0: &DVector<T>,
) -> Result<()> {
    let n = model.dimension();
    if x0.len() != n {
        return Err(OptimizerError::dimension_mismatch(n, x0.len()));
    }
    Ok(())
}

/// Checks that a model is unconstrained.
///
/// Performs no evaluation of the model.
pub fn check_unconstrained<T: Scalar, M: Model<T> + ?Sized>(model: &M) -> Result<()> {
    match model.num_constraints() {
        0 => Ok(()),
        m => Err(OptimizerError::constrained_model(m)),
    }
}
