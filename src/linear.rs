//! Direct solvers for the sparse linear systems arising in Newton's method.
use crate::nullspace::NullSpace;
use crate::reorder::{permuted_bandwidths, reverse_cuthill_mckee, Permutation};
use log::debug;
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use nalgebra_sparse::convert::serial::convert_csr_dense;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearSolverError {
    /// The matrix is not square or does not match the dimensions of the vectors.
    DimensionMismatch {
        matrix: (usize, usize),
        rhs: usize,
        solution: usize,
    },
    /// The factorization encountered a zero pivot.
    Singular,
}

impl fmt::Display for LinearSolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearSolverError::DimensionMismatch { matrix, rhs, solution } => write!(
                f,
                "Dimension mismatch: matrix is {}x{}, right-hand side has length {}, solution has length {}.",
                matrix.0, matrix.1, rhs, solution
            ),
            LinearSolverError::Singular => write!(f, "Matrix is singular."),
        }
    }
}

impl Error for LinearSolverError {}

/// Solves `A x = b` for sparse square `A`.
pub trait LinearSolver: Send {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVectorView<f64>,
        solution: &mut DVectorViewMut<f64>,
    ) -> Result<(), LinearSolverError>;
}

impl<S: LinearSolver + ?Sized> LinearSolver for Box<S> {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVectorView<f64>,
        solution: &mut DVectorViewMut<f64>,
    ) -> Result<(), LinearSolverError> {
        S::solve(self, matrix, rhs, solution)
    }
}

fn check_dimensions(matrix: &CsrMatrix<f64>, rhs: usize, solution: usize) -> Result<(), LinearSolverError> {
    let n = matrix.nrows();
    if matrix.ncols() != n || rhs != n || solution != n {
        Err(LinearSolverError::DimensionMismatch {
            matrix: (matrix.nrows(), matrix.ncols()),
            rhs,
            solution,
        })
    } else {
        Ok(())
    }
}

/// Converts the matrix to a dense matrix and solves with nalgebra's LU decomposition.
///
/// Only suitable for small systems.
#[derive(Debug, Clone, Default)]
pub struct DenseLuSolver;

impl LinearSolver for DenseLuSolver {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVectorView<f64>,
        solution: &mut DVectorViewMut<f64>,
    ) -> Result<(), LinearSolverError> {
        check_dimensions(matrix, rhs.len(), solution.len())?;
        let lu = convert_csr_dense(matrix).lu();
        let x = lu.solve(rhs).ok_or(LinearSolverError::Singular)?;
        if x.iter().any(|x_i| !x_i.is_finite()) {
            return Err(LinearSolverError::Singular);
        }
        solution.copy_from(&x);
        Ok(())
    }
}

/// Sparse direct solver: reverse Cuthill-McKee reordering followed by banded LU
/// factorization with partial pivoting.
///
/// The reordering is recomputed only when the sparsity pattern of the matrix changes, which
/// never happens across the Newton iterations of a simulation.
#[derive(Debug, Clone, Default)]
pub struct BandedLuSolver {
    cached_ordering: Option<(SparsityPattern, Permutation)>,
}

impl BandedLuSolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordering(&mut self, pattern: &SparsityPattern) -> &Permutation {
        let is_cached = matches!(&self.cached_ordering, Some((cached, _)) if cached == pattern);
        if !is_cached {
            let permutation = reverse_cuthill_mckee(pattern);
            let (lower, upper) = permuted_bandwidths(pattern, &permutation);
            debug!(
                "Computed RCM ordering for {} unknowns: lower bandwidth {}, upper bandwidth {}",
                pattern.major_dim(),
                lower,
                upper
            );
            self.cached_ordering = Some((pattern.clone(), permutation));
        }
        let (_, permutation) = self
            .cached_ordering
            .as_ref()
            .expect("Internal error: ordering was just cached");
        permutation
    }
}

impl LinearSolver for BandedLuSolver {
    fn solve(
        &mut self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVectorView<f64>,
        solution: &mut DVectorViewMut<f64>,
    ) -> Result<(), LinearSolverError> {
        check_dimensions(matrix, rhs.len(), solution.len())?;
        let permutation = self.ordering(matrix.pattern()).clone();
        let (lower, upper) = permuted_bandwidths(matrix.pattern(), &permutation);
        let inverse = permutation.inverse();

        let mut band = BandMatrix::zeros(matrix.nrows(), lower, upper);
        for (i, j, &v) in matrix.triplet_iter() {
            band.add(inverse.source_index(i), inverse.source_index(j), v);
        }
        let factorization = band.factor()?;

        let mut x = DVector::from_iterator(
            rhs.len(),
            permutation.perm().iter().map(|&source| rhs[source]),
        );
        factorization.solve_in_place(&mut x);
        if x.iter().any(|x_i| !x_i.is_finite()) {
            return Err(LinearSolverError::Singular);
        }
        for (target, &source) in permutation.perm().iter().enumerate() {
            solution[source] = x[target];
        }
        Ok(())
    }
}

/// A square band matrix stored row by row, with room for the fill-in caused by row
/// interchanges.
///
/// Row `i` stores columns `i - lower ..= i + lower + upper`.
#[derive(Debug, Clone)]
struct BandMatrix {
    n: usize,
    lower: usize,
    upper: usize,
    entries: Vec<f64>,
}

impl BandMatrix {
    fn zeros(n: usize, lower: usize, upper: usize) -> Self {
        let width = 2 * lower + upper + 1;
        Self {
            n,
            lower,
            upper,
            entries: vec![0.0; n * width],
        }
    }

    fn width(&self) -> usize {
        2 * self.lower + self.upper + 1
    }

    fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(j + self.lower >= i && j <= i + self.lower + self.upper);
        i * self.width() + (j + self.lower - i)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.entries[self.index(i, j)]
    }

    fn add(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.entries[idx] += value;
    }

    /// The last column of the upper factor that row `k` may touch.
    fn last_upper_col(&self, k: usize) -> usize {
        (k + self.lower + self.upper).min(self.n - 1)
    }

    fn factor(mut self) -> Result<BandedLu, LinearSolverError> {
        let n = self.n;
        let lower = self.lower;
        let mut pivots = Vec::with_capacity(n);
        let mut multipliers = vec![0.0; n * lower];

        for k in 0..n {
            let last_row = (k + lower).min(n - 1);
            let last_col = self.last_upper_col(k);

            let pivot_row = (k..=last_row)
                .max_by(|&a, &b| self.get(a, k).abs().total_cmp(&self.get(b, k).abs()))
                .unwrap_or(k);
            let pivot_value = self.get(pivot_row, k);
            if pivot_value == 0.0 || !pivot_value.is_finite() {
                return Err(LinearSolverError::Singular);
            }
            pivots.push(pivot_row);

            if pivot_row != k {
                for j in k..=last_col {
                    let a = self.index(k, j);
                    let b = self.index(pivot_row, j);
                    self.entries.swap(a, b);
                }
            }

            for i in k + 1..=last_row {
                let m = self.get(i, k) / pivot_value;
                multipliers[k * lower + (i - k - 1)] = m;
                let idx = self.index(i, k);
                self.entries[idx] = 0.0;
                if m != 0.0 {
                    for j in k + 1..=last_col {
                        let u_kj = self.get(k, j);
                        self.add(i, j, -m * u_kj);
                    }
                }
            }
        }

        Ok(BandedLu {
            factors: self,
            pivots,
            multipliers,
        })
    }
}

/// `P A = L U` with the unit lower factor kept as the multipliers of each elimination step.
#[derive(Debug, Clone)]
struct BandedLu {
    factors: BandMatrix,
    pivots: Vec<usize>,
    multipliers: Vec<f64>,
}

impl BandedLu {
    fn solve_in_place(&self, b: &mut DVector<f64>) {
        let n = self.factors.n;
        let lower = self.factors.lower;

        for k in 0..n {
            b.swap_rows(k, self.pivots[k]);
            let b_k = b[k];
            for i in k + 1..=(k + lower).min(n - 1) {
                b[i] -= self.multipliers[k * lower + (i - k - 1)] * b_k;
            }
        }

        for i in (0..n).rev() {
            let mut sum = b[i];
            for j in i + 1..=self.factors.last_upper_col(i) {
                sum -= self.factors.get(i, j) * b[j];
            }
            b[i] = sum / self.factors.get(i, i);
        }
    }
}

/// Solves a singular system `A x = b` whose left and right nullspace are both spanned by
/// `nullspace`.
///
/// The nullspace components are removed from the right-hand side, one degree of freedom per
/// nullspace vector is pinned to zero so that the remaining system is regular, and the
/// nullspace components are removed from the solution.
pub fn solve_with_nullspace(
    solver: &mut dyn LinearSolver,
    matrix: &CsrMatrix<f64>,
    rhs: &DVectorView<f64>,
    nullspace: &NullSpace,
    solution: &mut DVectorViewMut<f64>,
) -> Result<(), LinearSolverError> {
    check_dimensions(matrix, rhs.len(), solution.len())?;
    let mut projected_rhs = rhs.clone_owned();
    nullspace.project_out(&mut DVectorViewMut::from(&mut projected_rhs));

    let pivots = nullspace.pivot_dofs();
    let pinned = pin_dofs(matrix, &pivots);
    for &dof in &pivots {
        projected_rhs[dof] = 0.0;
    }

    solver.solve(&pinned, &DVectorView::from(&projected_rhs), solution)?;
    nullspace.project_out(solution);
    Ok(())
}

/// Replaces the rows and columns of `dofs` by rows and columns of the identity scaled by a
/// representative diagonal entry.
fn pin_dofs(matrix: &CsrMatrix<f64>, dofs: &[usize]) -> CsrMatrix<f64> {
    let mut is_pinned = vec![false; matrix.nrows()];
    for &dof in dofs {
        is_pinned[dof] = true;
    }
    let scale = matrix
        .triplet_iter()
        .filter(|(i, j, v)| i == j && !is_pinned[*i] && **v != 0.0)
        .map(|(_, _, v)| v.abs())
        .next()
        .unwrap_or(1.0);

    let mut coo = CooMatrix::new(matrix.nrows(), matrix.ncols());
    for (i, j, &v) in matrix.triplet_iter() {
        if !is_pinned[i] && !is_pinned[j] {
            coo.push(i, j, v);
        }
    }
    for &dof in dofs {
        coo.push(dof, dof, scale);
    }
    CsrMatrix::from(&coo)
}
