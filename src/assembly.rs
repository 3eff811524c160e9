//! Element-wise evaluation and global assembly of the Navier-Stokes residual and Jacobian.
use crate::element::BasisTable;
use crate::form::{BodyForce, NavierStokesWeakForm, QuadraturePointData, ResidualTerms};
use crate::quadrature::QuadratureRule;
use crate::space::TaylorHoodSpace;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Matrix2, Matrix2xX, Vector2};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;

/// Buffers reused across the cells handled by one worker.
#[derive(Debug, Clone)]
struct ElementWorkspace {
    dofs: Vec<usize>,
    coefficients: Vec<f64>,
    residual: DVector<f64>,
    jacobian: DMatrix<f64>,
    grad_psi: Matrix2xX<f64>,
}

impl ElementWorkspace {
    fn new(space: &TaylorHoodSpace) -> Self {
        let n = space.num_local_dofs();
        Self {
            dofs: vec![0; n],
            coefficients: vec![0.0; n],
            residual: DVector::zeros(n),
            jacobian: DMatrix::zeros(n, n),
            grad_psi: Matrix2xX::zeros(space.velocity_space().element().num_nodes()),
        }
    }
}

/// Assembles the Navier-Stokes weak form over a [`TaylorHoodSpace`].
///
/// Element contributions are computed in parallel and summed into the global result.
pub struct NavierStokesAssembler<'a> {
    space: &'a TaylorHoodSpace,
    form: NavierStokesWeakForm,
    quadrature: QuadratureRule,
    pressure_table: BasisTable,
    velocity_table: BasisTable,
    body_force: Option<&'a dyn BodyForce>,
}

impl<'a> NavierStokesAssembler<'a> {
    /// Creates an assembler with the default quadrature strength for the space.
    pub fn new(space: &'a TaylorHoodSpace, form: NavierStokesWeakForm) -> Self {
        let strength = QuadratureRule::default_strength(space.velocity_degree());
        Self::with_quadrature(space, form, QuadratureRule::triangle(strength))
    }

    pub fn with_quadrature(space: &'a TaylorHoodSpace, form: NavierStokesWeakForm, quadrature: QuadratureRule) -> Self {
        let pressure_table = space.pressure_space().element().tabulate(quadrature.points());
        let velocity_table = space.velocity_space().element().tabulate(quadrature.points());
        Self {
            space,
            form,
            quadrature,
            pressure_table,
            velocity_table,
            body_force: None,
        }
    }

    pub fn with_body_force(self, body_force: Option<&'a dyn BodyForce>) -> Self {
        Self { body_force, ..self }
    }

    pub fn space(&self) -> &TaylorHoodSpace {
        self.space
    }

    pub fn form(&self) -> &NavierStokesWeakForm {
        &self.form
    }

    /// Evaluates the fields at every quadrature point of a cell and hands the point data to
    /// `visit`. Expects the cell coefficients to already be gathered into the workspace.
    fn visit_quadrature_points(
        &self,
        cell_index: usize,
        ws: &mut ElementWorkspace,
        mut visit: impl FnMut(&QuadraturePointData, &mut DVector<f64>, &mut DMatrix<f64>),
    ) {
        let map = self.space.cell_map(cell_index);
        let inverse_transpose = map.inverse_transpose();
        let abs_det = map.determinant().abs();
        let n_p = self.space.num_local_pressure_dofs();
        let (pressure_coeffs, velocity_coeffs) = ws.coefficients.split_at(n_p);

        for (q, (w, xi)) in self
            .quadrature
            .weights()
            .iter()
            .zip(self.quadrature.points())
            .enumerate()
        {
            let phi = &self.pressure_table.values[q];
            let psi = &self.velocity_table.values[q];
            inverse_transpose.mul_to(&self.velocity_table.gradients[q], &mut ws.grad_psi);

            let p: f64 = phi.iter().zip(pressure_coeffs).map(|(phi_k, p_k)| phi_k * p_k).sum();
            let mut u = Vector2::zeros();
            let mut grad_u = Matrix2::zeros();
            for (i, (psi_i, grad_psi_i)) in psi.iter().zip(ws.grad_psi.column_iter()).enumerate() {
                let u_i = Vector2::new(velocity_coeffs[2 * i], velocity_coeffs[2 * i + 1]);
                u += u_i * *psi_i;
                grad_u += u_i * grad_psi_i.transpose();
            }

            let data = QuadraturePointData {
                weight: w * abs_det,
                x: map.map_reference_coords(xi),
                phi,
                psi,
                grad_psi: &ws.grad_psi,
                p,
                u,
                grad_u,
            };
            visit(&data, &mut ws.residual, &mut ws.jacobian);
        }
    }

    fn compute_element_residual(
        &self,
        cell_index: usize,
        x: &DVectorView<f64>,
        terms: ResidualTerms,
        ws: &mut ElementWorkspace,
    ) {
        self.space
            .gather_cell_coefficients(&mut ws.coefficients, &mut ws.dofs, x, cell_index);
        ws.residual.fill(0.0);
        self.visit_quadrature_points(cell_index, ws, |data, residual, _| {
            self.form
                .accumulate_residual(residual, data, self.body_force, terms)
        });
    }

    fn compute_element_jacobian(&self, cell_index: usize, x: &DVectorView<f64>, ws: &mut ElementWorkspace) {
        self.space
            .gather_cell_coefficients(&mut ws.coefficients, &mut ws.dofs, x, cell_index);
        ws.jacobian.fill(0.0);
        self.visit_quadrature_points(cell_index, ws, |data, _, jacobian| {
            self.form.accumulate_jacobian(jacobian, data)
        });
    }

    /// The local residual of a single cell, together with the global indices of its
    /// degrees of freedom.
    pub fn element_residual(
        &self,
        cell_index: usize,
        x: &DVectorView<f64>,
        terms: ResidualTerms,
    ) -> (Vec<usize>, DVector<f64>) {
        let mut ws = ElementWorkspace::new(self.space);
        self.compute_element_residual(cell_index, x, terms, &mut ws);
        (ws.dofs, ws.residual)
    }

    /// The local Jacobian of a single cell, together with the global indices of its
    /// degrees of freedom.
    pub fn element_jacobian(&self, cell_index: usize, x: &DVectorView<f64>) -> (Vec<usize>, DMatrix<f64>) {
        let mut ws = ElementWorkspace::new(self.space);
        self.compute_element_jacobian(cell_index, x, &mut ws);
        (ws.dofs, ws.jacobian)
    }

    pub fn assemble_residual(&self, x: &DVectorView<f64>, terms: ResidualTerms) -> DVector<f64> {
        let mut residual = DVector::zeros(self.space.num_dofs());
        self.assemble_residual_into(&mut DVectorViewMut::from(&mut residual), x, terms);
        residual
    }

    pub fn assemble_residual_into(
        &self,
        residual: &mut DVectorViewMut<f64>,
        x: &DVectorView<f64>,
        terms: ResidualTerms,
    ) {
        let n = self.space.num_dofs();
        assert_eq!(x.len(), n, "Coefficient vector has wrong length");
        assert_eq!(residual.len(), n, "Residual vector has wrong length");

        let assembled = (0..self.space.mesh().num_cells())
            .into_par_iter()
            .fold(
                || (DVector::zeros(n), ElementWorkspace::new(self.space)),
                |(mut global, mut ws), cell_index| {
                    self.compute_element_residual(cell_index, x, terms, &mut ws);
                    for (local, &dof) in ws.dofs.iter().enumerate() {
                        global[dof] += ws.residual[local];
                    }
                    (global, ws)
                },
            )
            .map(|(global, _)| global)
            .reduce(|| DVector::zeros(n), |a, b| a + b);

        residual.copy_from(&assembled);
    }

    /// Assembles the Jacobian of the full residual at `x`.
    ///
    /// Every local entry is stored, including numerical zeros, so the sparsity pattern only
    /// depends on the space, and every diagonal entry is present.
    pub fn assemble_jacobian(&self, x: &DVectorView<f64>) -> CsrMatrix<f64> {
        let n = self.space.num_dofs();
        assert_eq!(x.len(), n, "Coefficient vector has wrong length");

        let (rows, cols, values) = (0..self.space.mesh().num_cells())
            .into_par_iter()
            .fold(
                || (Vec::new(), Vec::new(), Vec::new(), ElementWorkspace::new(self.space)),
                |(mut rows, mut cols, mut values, mut ws), cell_index| {
                    self.compute_element_jacobian(cell_index, x, &mut ws);
                    for (local_col, &global_col) in ws.dofs.iter().enumerate() {
                        for (local_row, &global_row) in ws.dofs.iter().enumerate() {
                            rows.push(global_row);
                            cols.push(global_col);
                            values.push(ws.jacobian[(local_row, local_col)]);
                        }
                    }
                    (rows, cols, values, ws)
                },
            )
            .map(|(rows, cols, values, _)| (rows, cols, values))
            .reduce(
                || (Vec::new(), Vec::new(), Vec::new()),
                |(mut rows, mut cols, mut values), (r, c, v)| {
                    rows.extend(r);
                    cols.extend(c);
                    values.extend(v);
                    (rows, cols, values)
                },
            );

        let coo = CooMatrix::try_from_triplets(n, n, rows, cols, values)
            .expect("Internal error: element degrees of freedom must be in bounds");
        CsrMatrix::from(&coo)
    }

    /// Computes `∫ p dx` for the pressure field of `x`.
    pub fn integrate_pressure(&self, x: &DVectorView<f64>) -> f64 {
        integrate_pressure(self.space, &self.quadrature, x)
    }
}

/// Computes `∫ p dx` for the pressure field of the coefficient vector `x`.
pub fn integrate_pressure(space: &TaylorHoodSpace, quadrature: &QuadratureRule, x: &DVectorView<f64>) -> f64 {
    assert_eq!(x.len(), space.num_dofs(), "Coefficient vector has wrong length");
    let element = space.pressure_space().element();
    let table = element.tabulate(quadrature.points());
    (0..space.mesh().num_cells())
        .map(|cell_index| {
            let abs_det = space.cell_map(cell_index).determinant().abs();
            let nodes = space.pressure_space().cell_nodes(cell_index);
            quadrature
                .weights()
                .iter()
                .zip(&table.values)
                .map(|(w, phi)| {
                    let p: f64 = nodes
                        .iter()
                        .zip(phi.iter())
                        .map(|(&node, phi_k)| x[space.pressure_dof(node)] * phi_k)
                        .sum();
                    w * abs_det * p
                })
                .sum::<f64>()
        })
        .sum()
}

/// Zeroes the rows and columns of the given degrees of freedom and places a representative
/// diagonal entry of the matrix on their diagonal.
///
/// Zeroing the columns in addition to the rows keeps the constant pressure mode in both the
/// left and right nullspace of the Navier-Stokes Jacobian. It is only valid for updates in which
/// the Dirichlet degrees of freedom do not change, such as Newton steps.
pub fn apply_homogeneous_dirichlet_bc_csr(matrix: &mut CsrMatrix<f64>, dofs: &[usize]) {
    let mut is_dirichlet = vec![false; matrix.nrows()];
    for &dof in dofs {
        is_dirichlet[dof] = true;
    }

    // Simply setting 1 would ignore the scaling of the entries of the matrix, leading
    // to potentially poor condition numbers
    let scale = matrix
        .triplet_iter()
        .filter(|(i, j, v)| i == j && !is_dirichlet[*i] && **v != 0.0)
        .map(|(_, _, v)| v.abs())
        .next()
        .unwrap_or(1.0);

    for (row_index, mut row) in matrix.row_iter_mut().enumerate() {
        let row_is_dirichlet = is_dirichlet[row_index];
        let (cols, values) = row.cols_and_values_mut();
        for (&col_index, value) in cols.iter().zip(values) {
            if col_index == row_index && row_is_dirichlet {
                *value = scale;
            } else if row_is_dirichlet || is_dirichlet[col_index] {
                *value = 0.0;
            }
        }
    }
}

pub fn apply_homogeneous_dirichlet_bc_rhs(rhs: &mut DVectorViewMut<f64>, dofs: &[usize]) {
    for &dof in dofs {
        rhs[dof] = 0.0;
    }
}
