//! The weak form of the steady incompressible Navier-Stokes equations.
//!
//! Given pressure `p`, velocity `u` and Reynolds number `Re`, the residual tested against
//! `(psi_p, psi_u)` is
//!
//! ```text
//! R = ∫ psi_p div(u) dx
//!   + ∫ psi_u · (grad(u) u) - div(psi_u) p + (2 / Re) sym(grad(psi_u)) : sym(grad(u)) dx
//! ```
//!
//! with `grad(u)_{ab} = du_a / dx_b`. The first integral is the mass term, the second the
//! momentum term. The pressure only enters through its gradient, so it is determined up to an
//! additive constant unless something else fixes it; see [`crate::nullspace`].
use eyre::eyre;
use nalgebra::{DMatrix, DVector, Matrix2, Matrix2xX, Point2, Vector2};

/// Sources added to the right-hand side of the equations.
///
/// With sources, the strong form reads `div(u) = g` and
/// `grad(u) u + grad(p) - (2 / Re) div(sym(grad(u))) = f`.
pub trait BodyForce: Send + Sync {
    /// The momentum source `f`.
    fn momentum_source(&self, x: &Point2<f64>) -> Vector2<f64>;

    /// The mass source `g`.
    fn mass_source(&self, _x: &Point2<f64>) -> f64 {
        0.0
    }
}

/// Selects which terms of the weak form to evaluate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResidualTerms {
    Mass,
    Momentum,
    All,
}

impl ResidualTerms {
    fn includes_mass(&self) -> bool {
        matches!(self, Self::Mass | Self::All)
    }

    fn includes_momentum(&self) -> bool {
        matches!(self, Self::Momentum | Self::All)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NavierStokesWeakForm {
    reynolds_number: f64,
}

/// Everything the weak form needs to know at a single quadrature point.
#[derive(Debug)]
pub struct QuadraturePointData<'a> {
    /// Quadrature weight multiplied by the absolute Jacobian determinant.
    pub weight: f64,
    pub x: Point2<f64>,
    /// Pressure basis values.
    pub phi: &'a DVector<f64>,
    /// Velocity basis values.
    pub psi: &'a DVector<f64>,
    /// Physical gradients of the velocity basis functions, one column per function.
    pub grad_psi: &'a Matrix2xX<f64>,
    pub p: f64,
    pub u: Vector2<f64>,
    pub grad_u: Matrix2<f64>,
}

impl NavierStokesWeakForm {
    pub fn new(reynolds_number: f64) -> eyre::Result<Self> {
        if reynolds_number.is_finite() && reynolds_number > 0.0 {
            Ok(Self { reynolds_number })
        } else {
            Err(eyre!(
                "Reynolds number must be finite and positive, got {}",
                reynolds_number
            ))
        }
    }

    pub fn reynolds_number(&self) -> f64 {
        self.reynolds_number
    }

    /// Adds the contributions of a single quadrature point to the local residual.
    ///
    /// The local residual is laid out as `[pressure..., velocity (node, component)...]`.
    pub fn accumulate_residual(
        &self,
        residual: &mut DVector<f64>,
        data: &QuadraturePointData,
        body_force: Option<&dyn BodyForce>,
        terms: ResidualTerms,
    ) {
        let n_p = data.phi.len();
        let QuadraturePointData {
            weight,
            x,
            phi,
            psi,
            grad_psi,
            p,
            u,
            grad_u,
        } = data;

        if terms.includes_mass() {
            let div_u = grad_u.trace();
            let g = body_force.map(|f| f.mass_source(x)).unwrap_or(0.0);
            for (k, phi_k) in phi.iter().enumerate() {
                residual[k] += weight * phi_k * (div_u - g);
            }
        }

        if terms.includes_momentum() {
            let convection = grad_u * u;
            let strain_rate = grad_u.symmetric_part();
            let f = body_force
                .map(|f| f.momentum_source(x))
                .unwrap_or_else(Vector2::zeros);
            let viscosity_factor = 2.0 / self.reynolds_number;

            for (i, (psi_i, grad_psi_i)) in psi.iter().zip(grad_psi.column_iter()).enumerate() {
                // Row a of `strain_rate * grad_psi_i` is sum_b S_ab d_b psi_i
                let viscous = strain_rate * grad_psi_i;
                for a in 0..2 {
                    residual[n_p + 2 * i + a] += weight
                        * (psi_i * convection[a] - grad_psi_i[a] * p + viscosity_factor * viscous[a]
                            - psi_i * f[a]);
                }
            }
        }
    }

    /// Adds the contributions of a single quadrature point to the local Jacobian, the exact
    /// derivative of [`accumulate_residual`](Self::accumulate_residual) with respect to the
    /// local coefficients.
    pub fn accumulate_jacobian(&self, jacobian: &mut DMatrix<f64>, data: &QuadraturePointData) {
        let n_p = data.phi.len();
        let QuadraturePointData {
            weight,
            phi,
            psi,
            grad_psi,
            u,
            grad_u,
            ..
        } = data;
        let inv_re = 1.0 / self.reynolds_number;

        for (j, (psi_j, grad_psi_j)) in psi.iter().zip(grad_psi.column_iter()).enumerate() {
            let advection_j = grad_psi_j.dot(u);
            for c in 0..2 {
                let col = n_p + 2 * j + c;

                // d(mass) / du
                for (k, phi_k) in phi.iter().enumerate() {
                    jacobian[(k, col)] += weight * phi_k * grad_psi_j[c];
                }

                // d(momentum) / du
                for (i, (psi_i, grad_psi_i)) in psi.iter().zip(grad_psi.column_iter()).enumerate() {
                    let grad_dot = grad_psi_i.dot(&grad_psi_j);
                    for a in 0..2 {
                        let delta_ac = if a == c { 1.0 } else { 0.0 };
                        let convective = psi_i * (delta_ac * advection_j + psi_j * grad_u[(a, c)]);
                        let viscous = inv_re * (delta_ac * grad_dot + grad_psi_i[c] * grad_psi_j[a]);
                        jacobian[(n_p + 2 * i + a, col)] += weight * (convective + viscous);
                    }
                }
            }
        }

        // d(momentum) / dp
        for (i, grad_psi_i) in grad_psi.column_iter().enumerate() {
            for a in 0..2 {
                for (k, phi_k) in phi.iter().enumerate() {
                    jacobian[(n_p + 2 * i + a, k)] -= weight * grad_psi_i[a] * phi_k;
                }
            }
        }
    }
}
