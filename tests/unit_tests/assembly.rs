use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use steady_flow::assembly::{
    apply_homogeneous_dirichlet_bc_csr, apply_homogeneous_dirichlet_bc_rhs, integrate_pressure, NavierStokesAssembler,
};
use steady_flow::form::{BodyForce, NavierStokesWeakForm, ResidualTerms};
use steady_flow::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use steady_flow::nalgebra::{DVector, DVectorView, DVectorViewMut, Point2, Vector2};
use steady_flow::nalgebra_sparse::convert::serial::convert_csr_dense;
use steady_flow::optimize::calculus::{approximate_jacobian, VectorFunctionBuilder};
use steady_flow::quadrature::QuadratureRule;
use steady_flow::space::TaylorHoodSpace;

fn smooth_coefficients(space: &TaylorHoodSpace) -> DVector<f64> {
    space.interpolate(
        |x| (2.0 * x.x).sin() * x.y + 0.3,
        |x| Vector2::new((3.0 * x.y).cos() * x.x, x.x * x.y - 0.5 * x.y * x.y),
    )
}

#[test]
fn jacobian_matches_finite_difference_approximation() {
    for pressure_degree in [1, 2] {
        let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(2), pressure_degree).unwrap();
        let form = NavierStokesWeakForm::new(7.0).unwrap();
        let assembler = NavierStokesAssembler::new(&space, form);
        let x = smooth_coefficients(&space);

        let jacobian = convert_csr_dense(&assembler.assemble_jacobian(&DVectorView::from(&x)));
        let residual = VectorFunctionBuilder::with_dimension(space.num_dofs()).with_function(
            |f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| {
                assembler.assemble_residual_into(f, x, ResidualTerms::All)
            },
        );
        let approx = approximate_jacobian(residual, &x, &1e-6);

        assert_matrix_eq!(jacobian, approx, comp = abs, tol = 1e-6);
    }
}

#[test]
fn residual_is_sum_of_mass_and_momentum_terms() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(3), 1).unwrap();
    let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(50.0).unwrap());
    let x = smooth_coefficients(&space);
    let x = DVectorView::from(&x);

    let mass = assembler.assemble_residual(&x, ResidualTerms::Mass);
    let momentum = assembler.assemble_residual(&x, ResidualTerms::Momentum);
    let all = assembler.assemble_residual(&x, ResidualTerms::All);
    assert_matrix_eq!(&mass + &momentum, all, comp = abs, tol = 1e-13);

    // The mass term only tests with pressure functions, the momentum term with velocity functions
    assert!(mass.rows_range(space.velocity_dofs()).iter().all(|&r| r == 0.0));
    assert!(momentum.rows_range(space.pressure_dofs()).iter().all(|&r| r == 0.0));
}

#[test]
fn global_residual_is_sum_of_element_residuals() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(2), 1).unwrap();
    let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(3.0).unwrap());
    let x = smooth_coefficients(&space);
    let x = DVectorView::from(&x);

    let mut summed = DVector::zeros(space.num_dofs());
    for cell_index in 0..space.mesh().num_cells() {
        let (dofs, local) = assembler.element_residual(cell_index, &x, ResidualTerms::All);
        assert_eq!(dofs, space.cell_dofs(cell_index));
        for (&dof, value) in dofs.iter().zip(local.iter()) {
            summed[dof] += value;
        }
    }
    let global = assembler.assemble_residual(&x, ResidualTerms::All);
    assert_matrix_eq!(summed, global, comp = abs, tol = 1e-13);
}

/// Source terms for which `u = (y², x²)`, `p = x - y` solves the equations with `Re = 2`.
struct PolynomialSource;

const POLYNOMIAL_RE: f64 = 2.0;

impl BodyForce for PolynomialSource {
    fn momentum_source(&self, x: &Point2<f64>) -> Vector2<f64> {
        // grad(u) u = (2 x² y, 2 x y²), grad(p) = (1, -1), div(sym(grad(u))) = (1, 1)
        let viscous = 2.0 / POLYNOMIAL_RE;
        Vector2::new(
            2.0 * x.x * x.x * x.y + 1.0 - viscous,
            2.0 * x.x * x.y * x.y - 1.0 - viscous,
        )
    }
}

#[test]
fn discrete_exact_solution_has_zero_interior_residual() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(3), 1).unwrap();
    let source = PolynomialSource;
    let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(POLYNOMIAL_RE).unwrap())
        .with_body_force(Some(&source as &dyn BodyForce));
    let x = space.interpolate(|x| x.x - x.y, |x| Vector2::new(x.y * x.y, x.x * x.x));
    let residual = assembler.assemble_residual(&DVectorView::from(&x), ResidualTerms::All);

    // Integration by parts leaves boundary terms in the rows of boundary velocity functions
    let mut is_boundary = vec![false; space.num_dofs()];
    for dof in space.boundary_velocity_dofs() {
        is_boundary[dof] = true;
    }
    for (dof, &r) in residual.iter().enumerate() {
        if !is_boundary[dof] {
            assert!(r.abs() < 1e-12, "residual of dof {} is {}", dof, r);
        }
    }
}

#[test]
fn jacobian_pattern_is_symmetric_with_full_diagonal() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(2), 1).unwrap();
    let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(1.0).unwrap());
    let x = DVector::zeros(space.num_dofs());
    let jacobian = assembler.assemble_jacobian(&DVectorView::from(&x));
    let pattern = jacobian.pattern();

    for row in 0..space.num_dofs() {
        let lane = pattern.lane(row);
        assert!(lane.contains(&row));
        for &col in lane {
            assert!(pattern.lane(col).contains(&row));
        }
    }
}

#[test]
fn dirichlet_elimination_zeroes_rows_and_columns() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(2), 1).unwrap();
    let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(10.0).unwrap());
    let x = smooth_coefficients(&space);
    let x = DVectorView::from(&x);
    let mut jacobian = assembler.assemble_jacobian(&x);
    let original = convert_csr_dense(&jacobian);
    let dofs = space.boundary_velocity_dofs();
    apply_homogeneous_dirichlet_bc_csr(&mut jacobian, &dofs);
    let eliminated = convert_csr_dense(&jacobian);

    let mut is_dirichlet = vec![false; space.num_dofs()];
    for &dof in &dofs {
        is_dirichlet[dof] = true;
    }
    let scale = eliminated[(dofs[0], dofs[0])];
    assert!(scale > 0.0);
    for i in 0..space.num_dofs() {
        for j in 0..space.num_dofs() {
            let expected = if i == j && is_dirichlet[i] {
                scale
            } else if is_dirichlet[i] || is_dirichlet[j] {
                0.0
            } else {
                original[(i, j)]
            };
            assert_eq!(eliminated[(i, j)], expected);
        }
    }

    let mut rhs = assembler.assemble_residual(&x, ResidualTerms::All);
    apply_homogeneous_dirichlet_bc_rhs(&mut DVectorViewMut::from(&mut rhs), &dofs);
    assert!(dofs.iter().all(|&dof| rhs[dof] == 0.0));
}

#[test]
fn pressure_integral_of_linear_function() {
    let space = TaylorHoodSpace::new(create_unit_square_uniform_tri_mesh_2d(4), 1).unwrap();
    let x = space.interpolate(|x| 3.0 * x.x + x.y - 1.0, |_| Vector2::zeros());
    let quadrature = QuadratureRule::triangle(2);
    // ∫ 3x + y - 1 over the unit square
    let integral = integrate_pressure(&space, &quadrature, &DVectorView::from(&x));
    assert_scalar_eq!(integral, 1.0, comp = abs, tol = 1e-13);

    let assembler = NavierStokesAssembler::new(&space, NavierStokesWeakForm::new(1.0).unwrap());
    assert_scalar_eq!(assembler.integrate_pressure(&DVectorView::from(&x)), 1.0, comp = abs, tol = 1e-13);
}
