//! The strong form of the equations, used to verify solutions and to construct manufactured
//! solutions.
//!
//! ```text
//! r_p = div(u)
//! r_u = grad(u) u + grad(p) - (2 / Re) div(sym(grad(u)))
//! ```
use crate::form::BodyForce;
use nalgebra::{Matrix2, Point2, Vector2};

/// A smooth pressure and velocity field together with the derivatives needed to evaluate the
/// strong form.
pub trait ExactSolution: Send + Sync {
    fn pressure(&self, x: &Point2<f64>) -> f64;

    fn pressure_gradient(&self, x: &Point2<f64>) -> Vector2<f64>;

    fn velocity(&self, x: &Point2<f64>) -> Vector2<f64>;

    /// The velocity gradient with entries `(grad u)_{ab} = du_a / dx_b`.
    fn velocity_gradient(&self, x: &Point2<f64>) -> Matrix2<f64>;

    /// The Hessians of the two velocity components.
    fn velocity_hessians(&self, x: &Point2<f64>) -> [Matrix2<f64>; 2];
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StrongResidual {
    pub mass: f64,
    pub momentum: Vector2<f64>,
}

/// Evaluates the strong-form residual of an exact solution at a point.
///
/// Uses `div(sym(grad(u)))_a = (Δu_a + ∂_a div(u)) / 2`.
pub fn strong_residual(reynolds_number: f64, solution: &dyn ExactSolution, x: &Point2<f64>) -> StrongResidual {
    let u = solution.velocity(x);
    let grad_u = solution.velocity_gradient(x);
    let [h0, h1] = solution.velocity_hessians(x);

    let laplacian = Vector2::new(h0.trace(), h1.trace());
    // ∂_a div(u) = Σ_b ∂_a ∂_b u_b
    let grad_div = Vector2::new(h0[(0, 0)] + h1[(0, 1)], h0[(1, 0)] + h1[(1, 1)]);
    let div_sym_grad = 0.5 * (laplacian + grad_div);

    StrongResidual {
        mass: grad_u.trace(),
        momentum: grad_u * u + solution.pressure_gradient(x) - (2.0 / reynolds_number) * div_sym_grad,
    }
}

/// The body force for which a given exact solution satisfies the equations.
pub struct ManufacturedSource<S> {
    reynolds_number: f64,
    solution: S,
}

impl<S: ExactSolution> ManufacturedSource<S> {
    pub fn new(reynolds_number: f64, solution: S) -> Self {
        Self {
            reynolds_number,
            solution,
        }
    }

    pub fn solution(&self) -> &S {
        &self.solution
    }
}

impl<S: ExactSolution> BodyForce for ManufacturedSource<S> {
    fn momentum_source(&self, x: &Point2<f64>) -> Vector2<f64> {
        strong_residual(self.reynolds_number, &self.solution, x).momentum
    }

    fn mass_source(&self, x: &Point2<f64>) -> f64 {
        strong_residual(self.reynolds_number, &self.solution, x).mass
    }
}
