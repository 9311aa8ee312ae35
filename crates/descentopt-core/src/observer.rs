//! Iteration observers for optimization algorithms.
//!
//! The optimizers never print. Once per iteration they hand an
//! [`IterationRecord`] to an [`IterationObserver`], which may render it,
//! log it, collect it or ignore it.
//!
//! Provided observers:
//!
//! - [`NoOpObserver`]: discards everything (the default)
//! - [`TableObserver`]: fixed-width text table written to any `io::Write`
//! - [`TracingObserver`]: one `tracing` event per record
//! - [`RecordingObserver`]: keeps every record in memory
//! - any `FnMut(&IterationRecord<T>)` closure

use crate::{
    error::{OptimizerError, Result},
    optimizer::TerminationReason,
    state::OptimizationState,
    types::Scalar,
};
use std::io::{self, Write};
use tracing::{debug, info};

/// Diagnostic snapshot of one iteration.
///
/// `step_length` and `direction_cosine` are only produced by the conjugate
/// gradient method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationRecord<T: Scalar> {
    /// Iteration index
    pub iteration: usize,
    /// Objective value
    pub objective_value: T,
    /// Gradient norm
    pub gradient_norm: T,
    /// Accepted line search step
    pub step_length: Option<T>,
    /// Cosine of the angle between gradient and search direction
    pub direction_cosine: Option<T>,
}

impl<T: Scalar> IterationRecord<T> {
    /// Record of a conjugate gradient iteration.
    pub fn conjugate_gradient(
        iteration: usize,
        objective_value: T,
        gradient_norm: T,
        step_length: T,
        direction_cosine: T,
    ) -> Self {
        Self {
            iteration,
            objective_value,
            gradient_norm,
            step_length: Some(step_length),
            direction_cosine: Some(direction_cosine),
        }
    }

    /// Record carrying only the values held by a state.
    pub fn from_state(state: &OptimizationState<T>) -> Self {
        Self {
            iteration: state.k,
            objective_value: state.f,
            gradient_norm: state.g_norm,
            step_length: None,
            direction_cosine: None,
        }
    }
}

/// Trait for iteration observers.
///
/// `observe` is called exactly once per iteration. The start and finish
/// hooks are optional.
pub trait IterationObserver<T: Scalar> {
    /// Called once before the first iteration with the initial state.
    fn on_start(&mut self, initial: &IterationRecord<T>) -> Result<()> {
        let _ = initial;
        Ok(())
    }

    /// Called at every iteration.
    fn observe(&mut self, record: &IterationRecord<T>) -> Result<()>;

    /// Called once when the loop terminates normally.
    fn on_finish(&mut self, reason: TerminationReason, last: &IterationRecord<T>) -> Result<()> {
        let _ = (reason, last);
        Ok(())
    }
}

impl<T, F> IterationObserver<T> for F
where
    T: Scalar,
    F: FnMut(&IterationRecord<T>),
{
    fn observe(&mut self, record: &IterationRecord<T>) -> Result<()> {
        self(record);
        Ok(())
    }
}

/// An observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl<T: Scalar> IterationObserver<T> for NoOpObserver {
    fn observe(&mut self, _record: &IterationRecord<T>) -> Result<()> {
        Ok(())
    }
}

/// An observer keeping every record.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver<T: Scalar> {
    /// Records received so far, in order
    pub records: Vec<IterationRecord<T>>,
    /// Termination reason, once the loop finished
    pub termination: Option<TerminationReason>,
}

impl<T: Scalar> RecordingObserver<T> {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            termination: None,
        }
    }

    /// Number of records received.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record was received.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Scalar> IterationObserver<T> for RecordingObserver<T> {
    fn observe(&mut self, record: &IterationRecord<T>) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn on_finish(&mut self, reason: TerminationReason, _last: &IterationRecord<T>) -> Result<()> {
        self.termination = Some(reason);
        Ok(())
    }
}

/// Observer emitting records as `tracing` events.
///
/// Iterations are logged at `DEBUG`, start and termination at `INFO`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    /// Creates an observer tagging its events with `label`.
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl<T: Scalar> IterationObserver<T> for TracingObserver {
    fn on_start(&mut self, initial: &IterationRecord<T>) -> Result<()> {
        info!(
            optimizer = %self.label,
            value = %initial.objective_value,
            gradient_norm = %initial.gradient_norm,
            "starting optimization"
        );
        Ok(())
    }

    fn observe(&mut self, record: &IterationRecord<T>) -> Result<()> {
        debug!(
            optimizer = %self.label,
            iteration = record.iteration,
            value = %record.objective_value,
            gradient_norm = %record.gradient_norm,
            step = ?record.step_length,
            cosine = ?record.direction_cosine,
            "iteration"
        );
        Ok(())
    }

    fn on_finish(&mut self, reason: TerminationReason, last: &IterationRecord<T>) -> Result<()> {
        info!(
            optimizer = %self.label,
            %reason,
            iterations = last.iteration,
            value = %last.objective_value,
            gradient_norm = %last.gradient_norm,
            "optimization finished"
        );
        Ok(())
    }
}

/// Column layout of a [`TableObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// `iter  f  ‖∇f‖  step  cosθ`, header repeated every 10 iterations
    ConjugateGradient,
    /// `k  ‖∇f‖  f`, header once followed by the initial row
    Newton,
}

const HEADER_PERIOD: usize = 10;

/// Text table renderer.
///
/// # Example
///
/// ```rust
/// use descentopt_core::observer::{IterationObserver, IterationRecord, TableObserver};
///
/// let mut table = TableObserver::conjugate_gradient(Vec::new());
/// table
///     .observe(&IterationRecord::conjugate_gradient(0, 25.0, 10.0, 0.5, -1.0))
///     .unwrap();
/// let text = String::from_utf8(table.into_inner()).unwrap();
/// assert!(text.ends_with("   0   2.50e+01  1.0e+01  0.5000  -1.000000\n"));
/// ```
#[derive(Debug)]
pub struct TableObserver<W: Write> {
    writer: W,
    layout: TableLayout,
    header_written: bool,
}

impl<W: Write> TableObserver<W> {
    /// Creates a table observer writing to `writer`.
    pub fn new(writer: W, layout: TableLayout) -> Self {
        Self {
            writer,
            layout,
            header_written: false,
        }
    }

    /// Table with the conjugate gradient columns.
    pub fn conjugate_gradient(writer: W) -> Self {
        Self::new(writer, TableLayout::ConjugateGradient)
    }

    /// Table with the Newton columns.
    pub fn newton(writer: W) -> Self {
        Self::new(writer, TableLayout::Newton)
    }

    /// Consumes the observer and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> io::Result<()> {
        match self.layout {
            TableLayout::ConjugateGradient => {
                let rule = "-".repeat(43);
                writeln!(self.writer, "{}", rule)?;
                writeln!(
                    self.writer,
                    "{:>4}  {:>9}  {:>7}  {:>6}  {:>9}",
                    "iter", "f", "‖∇f‖", "step", "cosθ"
                )?;
                writeln!(self.writer, "{}", rule)?;
            }
            TableLayout::Newton => {
                writeln!(self.writer, "{:>4}  {:>8}  {:>8}", "k", "‖∇f‖", "f")?;
            }
        }
        self.header_written = true;
        Ok(())
    }

    fn write_row<T: Scalar>(&mut self, record: &IterationRecord<T>) -> io::Result<()> {
        let value = Scalar::to_f64(record.objective_value);
        let gradient_norm = Scalar::to_f64(record.gradient_norm);
        match self.layout {
            TableLayout::ConjugateGradient => {
                let step = record.step_length.map_or(f64::NAN, Scalar::to_f64);
                let cosine = record.direction_cosine.map_or(f64::NAN, Scalar::to_f64);
                writeln!(
                    self.writer,
                    "{:>4}  {:>9}  {:>7}  {:>6.4}  {:>9.6}",
                    record.iteration,
                    scientific(value, 2),
                    scientific(gradient_norm, 1),
                    step,
                    cosine
                )
            }
            TableLayout::Newton => writeln!(
                self.writer,
                "{:>4}  {:>8}  {:>8}",
                record.iteration,
                scientific(gradient_norm, 1),
                scientific(value, 1)
            ),
        }
    }

    fn emit<T: Scalar>(&mut self, record: &IterationRecord<T>) -> io::Result<()> {
        let periodic = self.layout == TableLayout::ConjugateGradient
            && record.iteration % HEADER_PERIOD == 0;
        if periodic || !self.header_written {
            self.write_header()?;
        }
        self.write_row(record)?;
        self.writer.flush()
    }
}

impl TableObserver<io::Stdout> {
    /// Table printed on standard output.
    pub fn stdout(layout: TableLayout) -> Self {
        Self::new(io::stdout(), layout)
    }
}

impl<T: Scalar, W: Write> IterationObserver<T> for TableObserver<W> {
    fn on_start(&mut self, initial: &IterationRecord<T>) -> Result<()> {
        if self.layout == TableLayout::Newton {
            self.emit(initial).map_err(table_error)?;
        }
        Ok(())
    }

    fn observe(&mut self, record: &IterationRecord<T>) -> Result<()> {
        self.emit(record).map_err(table_error)
    }
}

fn table_error(err: io::Error) -> OptimizerError {
    OptimizerError::observer_failed(format!("cannot write iteration table: {}", err))
}

/// Formats `value` like C's `%.{precision}e`: signed exponent of at least two
/// digits.
fn scientific(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => format!(
                "{}e{}{:02}",
                mantissa,
                if exp < 0 { '-' } else { '+' },
                exp.abs()
            ),
            Err(_) => formatted,
        },
        None => formatted,
    }
}
