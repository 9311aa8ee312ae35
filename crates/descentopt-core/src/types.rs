//! Type definitions and aliases for descent optimization.
//!
//! This module provides common type aliases and the numeric trait shared by
//! every optimizer.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display, LowerExp};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the necessary numeric traits required by the
/// iteration loops, the direction strategies and the line search.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + LowerExp
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Relative pivot size below which an LU factor is treated as singular.
    const PIVOT_TOLERANCE: Self;

    /// Maximum value for line search step size.
    const MAX_STEP_SIZE: Self;

    /// Minimum value for line search step size.
    const MIN_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_to_f64` for a non-panicking version.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Try to convert to f64.
    ///
    /// Returns None if the conversion fails.
    fn try_to_f64(self) -> Option<f64> {
        num_traits::cast(self)
    }
}

impl Scalar for f32 {
    const PIVOT_TOLERANCE: Self = 1e-6;
    const MAX_STEP_SIZE: Self = 1e3;
    const MIN_STEP_SIZE: Self = 1e-10;
}

impl Scalar for f64 {
    const PIVOT_TOLERANCE: Self = 1e-14;
    const MAX_STEP_SIZE: Self = 1e6;
    const MIN_STEP_SIZE: Self = 1e-16;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;
