//! Newton's method for square nonlinear systems `F(x) = 0`.
use crate::calculus::{DifferentiableVectorFunction, VectorFunction};
use crate::Real;
use log::{debug, warn};
use nalgebra::{DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use std::error::Error;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NewtonSettings<T> {
    /// No limit if `None`.
    pub max_iterations: Option<usize>,
    /// Converged once `|F(x)|_2 <= tolerance`.
    pub tolerance: T,
}

impl<T> NewtonSettings<T> {
    fn iteration_limit_reached(&self, iterations: usize) -> bool {
        self.max_iterations
            .map_or(false, |max_iterations| iterations >= max_iterations)
    }
}

#[derive(Debug)]
pub enum NewtonError {
    /// The residual was still above the tolerance after the given number of iterations.
    MaximumIterationsReached(usize),
    /// Solving the Jacobian system failed.
    JacobianError(Box<dyn Error>),
    /// The line search could not find an acceptable step along the Newton direction.
    LineSearchError(Box<dyn Error>),
}

impl fmt::Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewtonError::MaximumIterationsReached(iterations) => {
                write!(f, "no convergence after {} iterations", iterations)
            }
            NewtonError::JacobianError(err) => write!(f, "failed to solve Jacobian system: {}", err),
            NewtonError::LineSearchError(err) => write!(f, "line search failed: {}", err),
        }
    }
}

impl Error for NewtonError {}

/// Attempts to solve `F(x) = 0` with full Newton steps, starting from the given `x`.
///
/// `f` and `dx` are work buffers of the same length as `x`. On return, `x` holds the last
/// iterate and `f` holds `F(x)`, also on failure. No allocation happens inside the iteration.
///
/// Returns the number of Newton steps taken.
pub fn newton<'a, T, F>(
    function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
) -> Result<usize, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    newton_line_search(function, x, f, dx, settings, &mut NoLineSearch)
}

/// Same as [`newton`], with each step taken by the given line search.
pub fn newton_line_search<'a, T, F>(
    mut function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
    line_search: &mut impl LineSearch<T, F>,
) -> Result<usize, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    let mut x = x.into();
    let mut f = f.into();
    let mut step = dx.into();
    assert_eq!(x.nrows(), f.nrows(), "Residual buffer must have the dimension of x");
    assert_eq!(x.nrows(), step.nrows(), "Step buffer must have the dimension of x");

    function.eval_into(&mut f, &DVectorView::from(&x));

    let mut iterations = 0;
    loop {
        let residual_norm = f.norm();
        debug!("Newton iteration {}: residual norm {}", iterations, residual_norm);
        if residual_norm <= settings.tolerance {
            break;
        }
        if settings.iteration_limit_reached(iterations) {
            warn!(
                "Newton iteration limit reached with residual norm {} (tolerance {})",
                residual_norm, settings.tolerance
            );
            return Err(NewtonError::MaximumIterationsReached(iterations));
        }

        // J(x) (-step) = F(x)
        function
            .solve_jacobian_system(&mut step, &DVectorView::from(&x), &DVectorView::from(&f))
            .map_err(NewtonError::JacobianError)?;
        step.neg_mut();

        let step_length = line_search
            .step(
                &mut function,
                DVectorViewMut::from(&mut f),
                DVectorViewMut::from(&mut x),
                DVectorView::from(&step),
            )
            .map_err(NewtonError::LineSearchError)?;
        debug!("Newton iteration {}: step length {}", iterations, step_length);
        iterations += 1;
    }

    Ok(iterations)
}

pub trait LineSearch<T: Scalar, F: VectorFunction<T>> {
    /// Moves `x` along `direction` and leaves `F(x)` for the new `x` in `f`.
    ///
    /// Returns the accepted step length.
    fn step(
        &mut self,
        function: &mut F,
        f: DVectorViewMut<T>,
        x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error>>;
}

/// Always takes the full step.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoLineSearch;

impl<T, F> LineSearch<T, F> for NoLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error>> {
        x += direction;
        function.eval_into(&mut f, &DVectorView::from(&x));
        Ok(T::one())
    }
}

/// Backtracking on the merit function `g(x) = |F(x)|² / 2` with the Armijo condition.
///
/// For a Newton direction `p` the directional derivative of `g` is `-2 g(x)`, so a step
/// length `α` is accepted once `g(x + α p) <= (1 - 2 c α) g(x)`, where `c` is
/// the sufficient decrease parameter. Rejected steps are shortened by the contraction factor.
#[derive(Copy, Clone, Debug)]
pub struct BacktrackingLineSearch<T> {
    /// In `(0, 1/2)`.
    pub sufficient_decrease: T,
    /// In `(0, 1)`.
    pub contraction: T,
    pub min_step_length: T,
}

impl<T: Real> Default for BacktrackingLineSearch<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            sufficient_decrease: 1e-4,
            contraction: 0.5,
            min_step_length: 1e-6,
        }
    }
}

impl<T, F> LineSearch<T, F> for BacktrackingLineSearch<T>
where
    T: Real,
    F: VectorFunction<T>,
{
    /// On failure, `x` and `f` are restored to their values at the start of the step.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error>> {
        let merit_initial = 0.5 * f.norm_squared();

        let mut alpha = 1.0;
        let mut alpha_taken = 0.0;
        while alpha >= self.min_step_length {
            // x currently sits at x_0 + alpha_taken * p
            x.axpy(alpha - alpha_taken, &direction, 1.0);
            alpha_taken = alpha;
            function.eval_into(&mut f, &DVectorView::from(&x));

            let merit = 0.5 * f.norm_squared();
            if merit <= (1.0 - 2.0 * self.sufficient_decrease * alpha) * merit_initial {
                return Ok(alpha);
            }
            alpha *= self.contraction;
        }

        x.axpy(-alpha_taken, &direction, 1.0);
        function.eval_into(&mut f, &DVectorView::from(&x));
        Err(Box::from(format!(
            "no sufficient decrease for step lengths down to {} (minimum {})",
            alpha_taken, self.min_step_length
        )))
    }
}
