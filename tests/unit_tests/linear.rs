use matrixcompare::{assert_matrix_eq, prop_assert_matrix_eq};
use proptest::prelude::*;
use steady_flow::linear::{solve_with_nullspace, BandedLuSolver, DenseLuSolver, LinearSolver, LinearSolverError};
use steady_flow::nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use steady_flow::nalgebra_sparse::CsrMatrix;
use steady_flow::nullspace::NullSpace;

fn solve(
    solver: &mut dyn LinearSolver,
    matrix: &DMatrix<f64>,
    rhs: &DVector<f64>,
) -> Result<DVector<f64>, LinearSolverError> {
    let csr = CsrMatrix::from(matrix);
    let mut solution = DVector::zeros(rhs.len());
    solver.solve(&csr, &DVectorView::from(rhs), &mut DVectorViewMut::from(&mut solution))?;
    Ok(solution)
}

/// Laplacian of a path graph with `n` vertices, whose nullspace is spanned by constants.
fn path_laplacian(n: usize) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(n, n);
    for i in 0..n - 1 {
        matrix[(i, i)] += 1.0;
        matrix[(i + 1, i + 1)] += 1.0;
        matrix[(i, i + 1)] -= 1.0;
        matrix[(i + 1, i)] -= 1.0;
    }
    matrix
}

#[test]
fn solvers_handle_zero_diagonal_with_pivoting() {
    let matrix = DMatrix::from_row_slice(3, 3, &[0.0, 2.0, 0.0, 1.0, 0.0, 3.0, 0.0, 4.0, 1.0]);
    let expected = DVector::from_column_slice(&[1.0, -2.0, 0.5]);
    let rhs = &matrix * &expected;

    let banded = solve(&mut BandedLuSolver::new(), &matrix, &rhs).unwrap();
    let dense = solve(&mut DenseLuSolver, &matrix, &rhs).unwrap();
    assert_matrix_eq!(banded, expected, comp = abs, tol = 1e-12);
    assert_matrix_eq!(dense, expected, comp = abs, tol = 1e-12);
}

#[test]
fn singular_matrix_is_reported() {
    let matrix = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
    let rhs = DVector::from_element(3, 1.0);
    assert_eq!(solve(&mut BandedLuSolver::new(), &matrix, &rhs), Err(LinearSolverError::Singular));
    assert_eq!(solve(&mut DenseLuSolver, &matrix, &rhs), Err(LinearSolverError::Singular));
}

#[test]
fn dimension_mismatch_is_reported() {
    let matrix = DMatrix::<f64>::identity(3, 3);
    let rhs = DVector::from_element(4, 1.0);
    let result = solve(&mut BandedLuSolver::new(), &matrix, &rhs);
    assert!(matches!(result, Err(LinearSolverError::DimensionMismatch { .. })));
}

#[test]
fn banded_solver_reuses_ordering_across_values() {
    let mut solver = BandedLuSolver::new();
    let mut matrix = path_laplacian(6);
    matrix += DMatrix::identity(6, 6);
    let rhs = DVector::from_fn(6, |i, _| i as f64);
    let first = solve(&mut solver, &matrix, &rhs).unwrap();
    assert_matrix_eq!(&matrix * &first, rhs, comp = abs, tol = 1e-12);

    // Same pattern, different values
    matrix *= 2.0;
    let second = solve(&mut solver, &matrix, &rhs).unwrap();
    assert_matrix_eq!(second * 2.0, first, comp = abs, tol = 1e-12);
}

#[test]
fn nullspace_solve_gives_orthogonal_solution_of_projected_system() {
    let n = 7;
    let matrix = path_laplacian(n);
    let nullspace = NullSpace::from_vectors(vec![DVector::from_element(n, 1.0)]).unwrap();
    let rhs = DVector::from_fn(n, |i, _| (i as f64).sin() + 2.0);

    let mut projected_rhs = rhs.clone();
    nullspace.project_out(&mut DVectorViewMut::from(&mut projected_rhs));

    for solver in [&mut BandedLuSolver::new() as &mut dyn LinearSolver, &mut DenseLuSolver] {
        let mut solution = DVector::zeros(n);
        solve_with_nullspace(
            solver,
            &CsrMatrix::from(&matrix),
            &DVectorView::from(&rhs),
            &nullspace,
            &mut DVectorViewMut::from(&mut solution),
        )
        .unwrap();
        assert!(solution.sum().abs() < 1e-12);
        assert_matrix_eq!(&matrix * &solution, projected_rhs, comp = abs, tol = 1e-10);
    }
}

fn diagonally_dominant_system() -> impl Strategy<Value = (DMatrix<f64>, DVector<f64>)> {
    (2..12usize)
        .prop_flat_map(|n| {
            let entries = proptest::collection::vec(prop_oneof![3 => Just(0.0f64), 1 => -1.0f64..1.0], n * n);
            let rhs = proptest::collection::vec(-1.0f64..1.0, n);
            (Just(n), entries, rhs)
        })
        .prop_map(|(n, entries, rhs)| {
            let mut matrix = DMatrix::from_row_slice(n, n, &entries);
            for i in 0..n {
                let off_diagonal: f64 = matrix.row(i).iter().map(|v: &f64| v.abs()).sum();
                matrix[(i, i)] = off_diagonal + 1.0;
            }
            (matrix, DVector::from_vec(rhs))
        })
}

proptest! {
    #[test]
    fn banded_and_dense_solvers_agree((matrix, rhs) in diagonally_dominant_system()) {
        let banded = solve(&mut BandedLuSolver::new(), &matrix, &rhs).unwrap();
        let dense = solve(&mut DenseLuSolver, &matrix, &rhs).unwrap();
        prop_assert_matrix_eq!(banded.clone(), dense, comp = abs, tol = 1e-10);
        prop_assert_matrix_eq!(&matrix * &banded, rhs, comp = abs, tol = 1e-10);
    }
}
