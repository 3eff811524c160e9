//! Treatment of the pressure nullspace.
//!
//! With velocity prescribed on the whole boundary, the pressure of the Navier-Stokes equations
//! is only determined up to an additive constant. The constant pressure mode spans both the
//! left and the right nullspace of the Jacobian after Dirichlet elimination, so the nonlinear
//! and linear solvers remove it from residuals and updates, and the final pressure is
//! normalized to zero mean.
use crate::assembly::integrate_pressure;
use crate::quadrature::QuadratureRule;
use crate::space::TaylorHoodSpace;
use eyre::eyre;
use log::info;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};

/// An orthonormal basis of a nullspace.
#[derive(Debug, Clone, PartialEq)]
pub struct NullSpace {
    basis: Vec<DVector<f64>>,
}

impl NullSpace {
    /// Orthonormalizes the given vectors with (modified) Gram-Schmidt.
    ///
    /// Returns an error if the vectors have different lengths or are linearly dependent.
    pub fn from_vectors(vectors: Vec<DVector<f64>>) -> eyre::Result<Self> {
        let mut basis: Vec<DVector<f64>> = Vec::with_capacity(vectors.len());
        for mut v in vectors {
            if let Some(first) = basis.first() {
                if first.len() != v.len() {
                    return Err(eyre!("Nullspace vectors must all have the same length"));
                }
            }
            let original_norm = v.norm();
            for b in &basis {
                let projection = b.dot(&v);
                v.axpy(-projection, b, 1.0);
            }
            let norm = v.norm();
            if norm <= 1e-12 * original_norm || norm == 0.0 {
                return Err(eyre!("Nullspace vectors must be linearly independent"));
            }
            v /= norm;
            basis.push(v);
        }
        Ok(Self { basis })
    }

    /// The nullspace spanned by constant pressure and zero velocity.
    pub fn constant_pressure(space: &TaylorHoodSpace) -> Self {
        let mut n = DVector::zeros(space.num_dofs());
        let value = 1.0 / (space.num_pressure_dofs() as f64).sqrt();
        n.rows_range_mut(space.pressure_dofs()).fill(value);
        Self { basis: vec![n] }
    }

    pub fn dim(&self) -> usize {
        self.basis.len()
    }

    pub fn basis(&self) -> &[DVector<f64>] {
        &self.basis
    }

    /// The basis vectors as the columns of a matrix.
    pub fn basis_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_columns(&self.basis)
    }

    /// Removes the nullspace components from `x`, i.e. `x ← x - N Nᵀ x`.
    pub fn project_out(&self, x: &mut DVectorViewMut<f64>) {
        for b in &self.basis {
            let projection = b.dot(&*x);
            x.axpy(-projection, b, 1.0);
        }
    }

    /// The largest absolute component of `x` along the basis vectors.
    pub fn max_component(&self, x: &DVectorView<f64>) -> f64 {
        self.basis
            .iter()
            .map(|b| b.dot(x).abs())
            .fold(0.0, f64::max)
    }

    /// Chooses one degree of freedom per basis vector such that the basis, restricted to the
    /// chosen degrees of freedom, is non-singular.
    ///
    /// Linear solvers pin these degrees of freedom to turn a singular system with this
    /// nullspace into a regular one. Pivots are selected by Gaussian elimination on the rows
    /// of `Nᵀ` in order, taking the entry of largest magnitude in each row as its pivot.
    pub fn pivot_dofs(&self) -> Vec<usize> {
        let mut rows: Vec<DVector<f64>> = self.basis.clone();
        let mut pivots = Vec::with_capacity(rows.len());
        for i in 0..rows.len() {
            let pivot = rows[i].iamax();
            let pivot_value = rows[i][pivot];
            pivots.push(pivot);
            let (eliminated, remaining) = rows.split_at_mut(i + 1);
            let pivot_row = &eliminated[i];
            for row in remaining {
                let factor = row[pivot] / pivot_value;
                row.axpy(-factor, pivot_row, 1.0);
            }
        }
        pivots
    }
}

/// Subtracts the domain mean `∫ p dx / |Ω|` from every pressure degree of freedom of `x` and
/// returns the subtracted mean.
pub fn subtract_mean_pressure(space: &TaylorHoodSpace, quadrature: &QuadratureRule, x: &mut DVector<f64>) -> f64 {
    info!("Subtracting mean pressure");
    let integral = integrate_pressure(space, quadrature, &DVectorView::from(&*x));
    let mean = integral / space.mesh().area();
    x.rows_range_mut(space.pressure_dofs()).add_scalar_mut(-mean);
    info!("Done subtracting mean pressure (mean = {:e})", mean);
    mean
}
