use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use steady_flow::assembly::{apply_homogeneous_dirichlet_bc_csr, integrate_pressure, NavierStokesAssembler};
use steady_flow::form::NavierStokesWeakForm;
use steady_flow::mesh::procedural::{create_rectangular_uniform_tri_mesh_2d, create_unit_square_uniform_tri_mesh_2d};
use steady_flow::nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Point2, Vector2};
use steady_flow::nalgebra_sparse::convert::serial::convert_csr_dense;
use steady_flow::nullspace::{subtract_mean_pressure, NullSpace};
use steady_flow::quadrature::QuadratureRule;
use steady_flow::space::TaylorHoodSpace;

#[test]
fn constant_pressure_mode_is_normalized() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(2), 1).unwrap();
    let nullspace = NullSpace::constant_pressure(&space);
    assert_eq!(nullspace.dim(), 1);
    let n = &nullspace.basis()[0];
    assert_scalar_eq!(n.norm(), 1.0, comp = abs, tol = 1e-14);
    assert!(n.rows_range(space.velocity_dofs()).iter().all(|&v| v == 0.0));
    let p = n[0];
    assert!(n.rows_range(space.pressure_dofs()).iter().all(|&v| v == p));
}

#[test]
fn constant_pressure_is_left_and_right_nullspace_of_eliminated_jacobian() {
    for pressure_degree in [1, 2] {
        let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(3), pressure_degree).unwrap();
        let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(25.0).unwrap());
        let x = space.interpolate(
            |x| x.x * x.y,
            |x| Vector2::new((x.x * x.y).sin(), x.x - x.y * x.y),
        );
        let mut jacobian = assembler.assemble_jacobian(&DVectorView::from(&x));
        apply_homogeneous_dirichlet_bc_csr(&mut jacobian, &space.boundary_velocity_dofs());
        let jacobian = convert_csr_dense(&jacobian);

        let nullspace = NullSpace::constant_pressure(&space);
        let n = &nullspace.basis()[0];
        let zeros = DVector::<f64>::zeros(space.num_dofs());
        assert_matrix_eq!(&jacobian * n, zeros, comp = abs, tol = 1e-12);
        assert_matrix_eq!(jacobian.tr_mul(n), zeros, comp = abs, tol = 1e-12);
    }
}

#[test]
fn gram_schmidt_produces_orthonormal_basis() {
    let a = DVector::from_column_slice(&[1.0, 1.0, 0.0, 0.0]);
    let b = DVector::from_column_slice(&[1.0, 0.0, 1.0, 0.0]);
    let nullspace = NullSpace::from_vectors(vec![a, b]).unwrap();
    let basis = nullspace.basis_matrix();
    assert_matrix_eq!(basis.tr_mul(&basis), DMatrix::<f64>::identity(2, 2), comp = abs, tol = 1e-14);

    let dependent = NullSpace::from_vectors(vec![
        DVector::from_column_slice(&[1.0, 2.0]),
        DVector::from_column_slice(&[2.0, 4.0]),
    ]);
    assert!(dependent.is_err());

    let mismatched = NullSpace::from_vectors(vec![DVector::from_element(2, 1.0), DVector::from_element(3, 1.0)]);
    assert!(mismatched.is_err());
}

#[test]
fn projection_removes_nullspace_components() {
    let nullspace = NullSpace::from_vectors(vec![
        DVector::from_column_slice(&[1.0, 1.0, 0.0]),
        DVector::from_column_slice(&[0.0, 0.0, 1.0]),
    ])
    .unwrap();
    let mut x = DVector::from_column_slice(&[3.0, 1.0, 5.0]);
    nullspace.project_out(&mut DVectorViewMut::from(&mut x));
    assert_matrix_eq!(x, DVector::from_column_slice(&[1.0, -1.0, 0.0]), comp = abs, tol = 1e-14);
    assert!(nullspace.max_component(&DVectorView::from(&x)) < 1e-14);
}

#[test]
fn pivots_make_restricted_basis_regular() {
    let nullspace = NullSpace::from_vectors(vec![
        DVector::from_column_slice(&[1.0, 1.0, 1.0, 1.0]),
        DVector::from_column_slice(&[1.0, 2.0, 3.0, 4.0]),
    ])
    .unwrap();
    let pivots = nullspace.pivot_dofs();
    assert_eq!(pivots.len(), 2);
    assert_ne!(pivots[0], pivots[1]);
    let restricted = DMatrix::from_fn(2, 2, |i, j| nullspace.basis()[j][pivots[i]]);
    assert!(restricted.determinant().abs() > 1e-3);
}

#[test]
fn pivot_is_largest_entry_of_each_eliminated_basis_vector() {
    let nullspace = NullSpace::from_vectors(vec![DVector::from_column_slice(&[0.1, -3.0, 2.0])]).unwrap();
    assert_eq!(nullspace.pivot_dofs(), vec![1]);

    // After eliminating entry 0 with the first basis vector (the constant), the remaining
    // entries of the second vector are largest in magnitude at the last entry
    let nullspace = NullSpace::from_vectors(vec![
        DVector::from_column_slice(&[1.0, 1.0, 1.0]),
        DVector::from_column_slice(&[0.0, 1.0, 3.0]),
    ])
    .unwrap();
    assert_eq!(nullspace.pivot_dofs(), vec![0, 2]);
}

#[test]
fn mean_pressure_is_subtracted() {
    let mesh = create_rectangular_uniform_tri_mesh_2d(&Vector2::new(2.0, 1.0), [4, 2], &Point2::origin());
    let space = TaylorHoodSpace::new(mesh, 1).unwrap();
    let quadrature = QuadratureRule::triangle(4);
    let mut x = space.interpolate(|x| x.x + x.y + 5.0, |x| Vector2::new(x.y, 1.0));
    let velocity_before = x.rows_range(space.velocity_dofs()).clone_owned();

    // ∫ (x + y + 5) over [0, 2] x [0, 1] is 2 + 1 + 10, the area is 2
    let mean = subtract_mean_pressure(&space, &quadrature, &mut x);
    assert_scalar_eq!(mean, 6.5, comp = abs, tol = 1e-12);
    assert_scalar_eq!(integrate_pressure(&space, &quadrature, &DVectorView::from(&x)), 0.0, comp = abs, tol = 1e-12);
    assert_eq!(x.rows_range(space.velocity_dofs()).clone_owned(), velocity_before);
}
