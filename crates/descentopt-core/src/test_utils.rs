//! Test problems for exercising the optimizers.
//!
//! Available with the `test-utils` feature so that downstream crates can
//! share the same models in their own tests and benchmarks.

use crate::{
    error::{ModelError, ModelResult},
    model::Model,
    types::{DMatrix, DVector, Scalar},
};

fn check_len<T: Scalar>(x: &DVector<T>, n: usize) -> ModelResult<()> {
    if x.len() == n {
        Ok(())
    } else {
        Err(ModelError::dimension_mismatch(n, x.len()))
    }
}

/// f(x) = xᵗx, with gradient 2x and Hessian 2I.
#[derive(Debug, Clone)]
pub struct SumOfSquares<T: Scalar> {
    x0: DVector<T>,
}

impl<T: Scalar> SumOfSquares<T> {
    /// Creates the problem with starting point `x0`.
    pub fn new(x0: DVector<T>) -> Self {
        Self { x0 }
    }
}

impl<T: Scalar> Default for SumOfSquares<T> {
    /// Starts at `[3, 4]`: f = 25, g = [6, 8], ‖g‖ = 10.
    fn default() -> Self {
        Self::new(DVector::from_vec(vec![
            <T as Scalar>::from_f64(3.0),
            <T as Scalar>::from_f64(4.0),
        ]))
    }
}

impl<T: Scalar> Model<T> for SumOfSquares<T> {
    fn name(&self) -> &str {
        "sum-of-squares"
    }

    fn initial_point(&self) -> DVector<T> {
        self.x0.clone()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        check_len(x, self.x0.len())?;
        Ok(x.dot(x))
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        check_len(x, self.x0.len())?;
        Ok(x * <T as Scalar>::from_f64(2.0))
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        check_len(x, self.x0.len())?;
        let n = x.len();
        Ok(DMatrix::identity(n, n) * <T as Scalar>::from_f64(2.0))
    }
}

/// f(x) = ½ xᵗAx − bᵗx with `A` symmetric positive definite.
#[derive(Debug, Clone)]
pub struct ConvexQuadratic<T: Scalar> {
    a: DMatrix<T>,
    b: DVector<T>,
    x0: DVector<T>,
}

impl<T: Scalar> ConvexQuadratic<T> {
    /// Creates the problem from `A`, `b` and a starting point.
    pub fn new(a: DMatrix<T>, b: DVector<T>, x0: DVector<T>) -> Self {
        Self { a, b, x0 }
    }

    /// Diagonal problem with eigenvalues `1, 2, …, n`, minimum at the all-ones
    /// vector, started from the origin.
    pub fn diagonal(n: usize) -> Self {
        let diag = DVector::from_fn(n, |i, _| <T as Scalar>::from_f64((i + 1) as f64));
        let a = DMatrix::from_diagonal(&diag);
        let b = &a * DVector::from_element(n, T::one());
        Self::new(a, b, DVector::zeros(n))
    }

    /// The minimizer `A⁻¹b`.
    pub fn solution(&self) -> Option<DVector<T>> {
        self.a.clone().lu().solve(&self.b)
    }
}

impl<T: Scalar> Model<T> for ConvexQuadratic<T> {
    fn name(&self) -> &str {
        "convex-quadratic"
    }

    fn initial_point(&self) -> DVector<T> {
        self.x0.clone()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        check_len(x, self.x0.len())?;
        let half = <T as Scalar>::from_f64(0.5);
        Ok(half * x.dot(&(&self.a * x)) - self.b.dot(x))
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        check_len(x, self.x0.len())?;
        Ok(&self.a * x - &self.b)
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        check_len(x, self.x0.len())?;
        Ok(self.a.clone())
    }
}

/// Extended Rosenbrock function
/// f(x) = Σ 100 (x₂ᵢ − x₂ᵢ₋₁²)² + (1 − x₂ᵢ₋₁)², minimum 0 at the all-ones
/// vector. Starts from the classic `(−1.2, 1, −1.2, 1, …)`.
#[derive(Debug, Clone)]
pub struct Rosenbrock {
    n: usize,
}

impl Rosenbrock {
    /// Creates the problem in `n` variables (`n` even, at least 2).
    pub fn new(n: usize) -> Self {
        assert!(n >= 2 && n % 2 == 0, "Rosenbrock needs an even dimension");
        Self { n }
    }
}

impl Default for Rosenbrock {
    fn default() -> Self {
        Self::new(2)
    }
}

impl<T: Scalar> Model<T> for Rosenbrock {
    fn name(&self) -> &str {
        "rosenbrock"
    }

    fn initial_point(&self) -> DVector<T> {
        DVector::from_fn(self.n, |i, _| {
            <T as Scalar>::from_f64(if i % 2 == 0 { -1.2 } else { 1.0 })
        })
    }

    fn dimension(&self) -> usize {
        self.n
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        check_len(x, self.n)?;
        let hundred = <T as Scalar>::from_f64(100.0);
        let mut f = T::zero();
        for i in (0..self.n).step_by(2) {
            let t = x[i + 1] - x[i] * x[i];
            let u = T::one() - x[i];
            f += hundred * t * t + u * u;
        }
        Ok(f)
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        check_len(x, self.n)?;
        let two = <T as Scalar>::from_f64(2.0);
        let c200 = <T as Scalar>::from_f64(200.0);
        let c400 = <T as Scalar>::from_f64(400.0);
        let mut g = DVector::zeros(self.n);
        for i in (0..self.n).step_by(2) {
            let t = x[i + 1] - x[i] * x[i];
            g[i] = -c400 * x[i] * t - two * (T::one() - x[i]);
            g[i + 1] = c200 * t;
        }
        Ok(g)
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        check_len(x, self.n)?;
        let two = <T as Scalar>::from_f64(2.0);
        let c200 = <T as Scalar>::from_f64(200.0);
        let c400 = <T as Scalar>::from_f64(400.0);
        let c1200 = <T as Scalar>::from_f64(1200.0);
        let mut h = DMatrix::zeros(self.n, self.n);
        for i in (0..self.n).step_by(2) {
            h[(i, i)] = c1200 * x[i] * x[i] - c400 * x[i + 1] + two;
            h[(i, i + 1)] = -c400 * x[i];
            h[(i + 1, i)] = -c400 * x[i];
            h[(i + 1, i + 1)] = c200;
        }
        Ok(h)
    }
}

/// f(x) = Σ xᵢ⁴. Convex with a Hessian that degenerates only at the origin,
/// so Newton's method contracts every coordinate by 2/3 per step.
#[derive(Debug, Clone)]
pub struct Quartic<T: Scalar> {
    x0: DVector<T>,
}

impl<T: Scalar> Quartic<T> {
    /// Creates the problem with starting point `x0`.
    pub fn new(x0: DVector<T>) -> Self {
        Self { x0 }
    }
}

impl<T: Scalar> Model<T> for Quartic<T> {
    fn name(&self) -> &str {
        "quartic"
    }

    fn initial_point(&self) -> DVector<T> {
        self.x0.clone()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        check_len(x, self.x0.len())?;
        Ok(x.iter().fold(T::zero(), |acc, &xi| acc + xi * xi * xi * xi))
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        check_len(x, self.x0.len())?;
        let four = <T as Scalar>::from_f64(4.0);
        Ok(x.map(|xi| four * xi * xi * xi))
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        check_len(x, self.x0.len())?;
        let twelve = <T as Scalar>::from_f64(12.0);
        Ok(DMatrix::from_diagonal(&x.map(|xi| twelve * xi * xi)))
    }
}

/// f(x, y) = (x + y)², whose Hessian has rank one everywhere.
///
/// The gradient `2(x + y) [1, 1]` never vanishes off the line `x + y = 0`,
/// and the Hessian `2 [[1, 1], [1, 1]]` is singular, so Newton's method
/// cannot take a single step.
#[derive(Debug, Clone, Default)]
pub struct SingularHessian;

impl<T: Scalar> Model<T> for SingularHessian {
    fn name(&self) -> &str {
        "singular-hessian"
    }

    fn initial_point(&self) -> DVector<T> {
        DVector::from_vec(vec![T::one(), T::one()])
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        check_len(x, 2)?;
        let s = x[0] + x[1];
        Ok(s * s)
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        check_len(x, 2)?;
        let s = (x[0] + x[1]) * <T as Scalar>::from_f64(2.0);
        Ok(DVector::from_vec(vec![s, s]))
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        check_len(x, 2)?;
        Ok(DMatrix::from_element(2, 2, <T as Scalar>::from_f64(2.0)))
    }
}

/// Wraps a model and reports `num_constraints` constraints.
#[derive(Debug, Clone)]
pub struct Constrained<M> {
    /// The wrapped model
    pub inner: M,
    num_constraints: usize,
}

impl<M> Constrained<M> {
    /// Wraps `inner`, declaring `num_constraints` constraints.
    pub fn new(inner: M, num_constraints: usize) -> Self {
        Self {
            inner,
            num_constraints,
        }
    }
}

impl<T: Scalar, M: Model<T>> Model<T> for Constrained<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    fn initial_point(&self) -> DVector<T> {
        self.inner.initial_point()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        self.inner.objective(x)
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        self.inner.gradient(x)
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        self.inner.hessian(x)
    }
}

/// Model whose gradient fails after a number of successful evaluations.
#[derive(Debug)]
pub struct FailingGradient<M> {
    inner: M,
    remaining: std::cell::Cell<usize>,
}

impl<M> FailingGradient<M> {
    /// Lets `successes` gradient evaluations through, then fails.
    pub fn new(inner: M, successes: usize) -> Self {
        Self {
            inner,
            remaining: std::cell::Cell::new(successes),
        }
    }
}

impl<T: Scalar, M: Model<T>> Model<T> for FailingGradient<M> {
    fn initial_point(&self) -> DVector<T> {
        self.inner.initial_point()
    }

    fn objective(&self, x: &DVector<T>) -> ModelResult<T> {
        self.inner.objective(x)
    }

    fn gradient(&self, x: &DVector<T>) -> ModelResult<DVector<T>> {
        match self.remaining.get() {
            0 => Err(ModelError::evaluation_failed("gradient unavailable")),
            n => {
                self.remaining.set(n - 1);
                self.inner.gradient(x)
            }
        }
    }

    fn hessian(&self, x: &DVector<T>) -> ModelResult<DMatrix<T>> {
        self.inner.hessian(x)
    }
}

/// Central finite-difference gradient, for checking analytic gradients.
pub fn numerical_gradient<T: Scalar, M: Model<T> + ?Sized>(
    model: &M,
    x: &DVector<T>,
    h: T,
) -> ModelResult<DVector<T>> {
    let two = <T as Scalar>::from_f64(2.0);
    let mut g = DVector::zeros(x.len());
    let mut probe = x.clone();
    for i in 0..x.len() {
        let xi = probe[i];
        probe[i] = xi + h;
        let f_plus = model.objective(&probe)?;
        probe[i] = xi - h;
        let f_minus = model.objective(&probe)?;
        probe[i] = xi;
        g[i] = (f_plus - f_minus) / (two * h);
    }
    Ok(g)
}
