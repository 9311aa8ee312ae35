//! Model interface for unconstrained optimization.
//!
//! A model is the black box the optimizers drive: it reports its
//! dimensionality and constraint count, supplies an initial point, and
//! evaluates the objective, its gradient and (for second-order methods) its
//! Hessian at a point.
//!
//! Models must be deterministic: evaluating twice at the same point yields
//! the same numbers.

use crate::{
    error::{ModelError, ModelResult},
    types::{DMatrix, DVector, Scalar},
};
use std::cell::Cell;
use std::fmt::{self, Debug};

/// Trait for objective models.
///
/// This is the main trait that optimization algorithms use to evaluate
/// the objective function and its derivatives.
pub trait Model<T: Scalar>: Debug {
    /// Returns a short, human-readable model name.
    fn name(&self) -> &str {
        "model"
    }

    /// Number of constraints of the problem.
    ///
    /// The optimizers in this library only accept models reporting zero.
    fn num_constraints(&self) -> usize {
        0
    }

    /// Default starting point of the problem.
    fn initial_point(&self) -> DVector<T>;

    /// Number of variables.
    ///
    /// # Default Implementation
    ///
    /// Returns the length of the initial point.
    fn dimension(&self) -> usize {
        self.initial_point().len()
    }

    /// Evaluates the objective at a point.
    fn objective(&self, x: &DVector<T>) -> ModelResult<T>;

    /// Evaluates the gradient at a point.
    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>>;

    /// Evaluates the Hessian matrix at a point.
    ///
    /// # Default Implementation
    ///
    /// Returns `NotImplemented`. Override for second-order methods.
    fn hessian(&self, _x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        Err(ModelError::not_implemented(
            "Hessian evaluation not implemented for this model",
        ))
    }
}

impl<T: Scalar, M: Model<T> + ?Sized> Model<T> for &M {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn num_constraints(&self) -> usize {
        (**self).num_constraints()
    }

    fn initial_point(&self) -> DVector<T> {
        (**self).initial_point()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        (**self).objective(x)
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        (**self).gradient(x)
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        (**self).hessian(x)
    }
}

type HessianFn<T> = Box<dyn Fn(&DVector<T>) -> DMatrix<T>>;

/// Model assembled from closures.
///
/// # Example
///
/// ```rust
/// use descentopt_core::model::{FnModel, Model};
/// use descentopt_core::types::DVector;
///
/// let model = FnModel::new(
///     DVector::from_vec(vec![3.0, 4.0]),
///     |x: &DVector<f64>| x.dot(x),
///     |x: &DVector<f64>| x * 2.0,
/// );
/// assert_eq!(model.objective(&model.initial_point()).unwrap(), 25.0);
/// ```
pub struct FnModel<T, F, G>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>) -> DVector<T>,
{
    initial_point: DVector<T>,
    objective: F,
    gradient: G,
    hessian: Option<HessianFn<T>>,
}

impl<T, F, G> FnModel<T, F, G>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>) -> DVector<T>,
{
    /// Creates a first-order model from an objective and its gradient.
    pub fn new(initial_point: DVector<T>, objective: F, gradient: G) -> Self {
        Self {
            initial_point,
            objective,
            gradient,
            hessian: None,
        }
    }

    /// Adds a Hessian, making the model usable by Newton's method.
    pub fn with_hessian<H>(mut self, hessian: H) -> Self
    where
        H: Fn(&DVector<T>) -> DMatrix<T> + 'static,
    {
        self.hessian = Some(Box::new(hessian));
        self
    }

    fn check_dimension(&self, x: &DVector<T>) -> ModelResult<()> {
        if x.len() == self.initial_point.len() {
            Ok(())
        } else {
            Err(ModelError::dimension_mismatch(
                self.initial_point.len(),
                x.len(),
            ))
        }
    }
}

impl<T, F, G> Debug for FnModel<T, F, G>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>) -> DVector<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("dimension", &self.initial_point.len())
            .field("has_hessian", &self.hessian.is_some())
            .finish()
    }
}

impl<T, F, G> Model<T> for FnModel<T, F, G>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>) -> DVector<T>,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn initial_point(&self) -> DVector<T> {
        self.initial_point.clone()
    }

    fn dimension(&self) -> usize {
        self.initial_point.len()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        self.check_dimension(x)?;
        Ok((self.objective)(x))
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        self.check_dimension(x)?;
        Ok((self.gradient)(x))
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        self.check_dimension(x)?;
        match &self.hessian {
            Some(h) => Ok(h(x)),
            None => Err(ModelError::not_implemented(
                "Hessian evaluation not implemented for this model",
            )),
        }
    }
}

/// Wrapper to count model evaluations for testing and diagnostics.
#[derive(Debug)]
pub struct CountingModel<M> {
    /// The underlying model
    pub inner: M,
    objective_count: Cell<usize>,
    gradient_count: Cell<usize>,
    hessian_count: Cell<usize>,
}

/// Evaluation counts reported by [`CountingModel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationCounts {
    /// Number of objective evaluations
    pub objective: usize,
    /// Number of gradient evaluations
    pub gradient: usize,
    /// Number of Hessian evaluations
    pub hessian: usize,
}

impl EvaluationCounts {
    /// Total number of evaluations of any kind.
    pub fn total(&self) -> usize {
        self.objective + self.gradient + self.hessian
    }
}

impl<M> CountingModel<M> {
    /// Creates a new counting wrapper around a model.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            objective_count: Cell::new(0),
            gradient_count: Cell::new(0),
            hessian_count: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.objective_count.set(0);
        self.gradient_count.set(0);
        self.hessian_count.set(0);
    }

    /// Returns the current evaluation counts.
    pub fn counts(&self) -> EvaluationCounts {
        EvaluationCounts {
            objective: self.objective_count.get(),
            gradient: self.gradient_count.get(),
            hessian: self.hessian_count.get(),
        }
    }
}

impl<T: Scalar, M: Model<T>> Model<T> for CountingModel<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn num_constraints(&self) -> usize {
        self.inner.num_constraints()
    }

    fn initial_point(&self) -> DVector<T> {
        self.inner.initial_point()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        self.objective_count.set(self.objective_count.get() + 1);
        self.inner.objective(x)
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        self.gradient_count.set(self.gradient_count.get() + 1);
        self.inner.gradient(x)
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        self.hessian_count.set(self.hessian_count.get() + 1);
        self.inner.hessian(x)
    }
}
