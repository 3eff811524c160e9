use matrixcompare::{assert_matrix_eq, assert_scalar_eq, prop_assert_matrix_eq};
use proptest::prelude::*;
use steady_flow::element::{AffineTriangleMap, LagrangeTriangle};
use steady_flow::nalgebra::{DMatrix, Matrix2, Point2, Vector2};
use steady_flow::proptest::nondegenerate_triangle;

#[test]
fn degree_zero_is_rejected() {
    assert!(LagrangeTriangle::new(0).is_err());
}

#[test]
fn node_counts() {
    for (degree, expected) in [(1, 3), (2, 6), (3, 10), (4, 15)] {
        let element = LagrangeTriangle::new(degree).unwrap();
        assert_eq!(element.num_nodes(), expected);
        assert_eq!(element.num_edge_interior_nodes(), degree - 1);
        assert_eq!(element.reference_nodes().len(), expected);
    }
}

#[test]
fn quadratic_element_uses_tri6_node_order() {
    let element = LagrangeTriangle::new(2).unwrap();
    let expected = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(0.0, 1.0),
        Point2::new(0.5, 0.0),
        Point2::new(0.5, 0.5),
        Point2::new(0.0, 0.5),
    ];
    for (node, expected) in element.reference_nodes().iter().zip(&expected) {
        assert_matrix_eq!(node.coords, expected.coords, comp = abs, tol = 1e-15);
    }
}

#[test]
fn basis_functions_are_nodal() {
    for degree in 1..=4 {
        let element = LagrangeTriangle::new(degree).unwrap();
        let nodes = element.reference_nodes();
        let values = DMatrix::from_columns(&nodes.iter().map(|xi| element.evaluate_basis(xi)).collect::<Vec<_>>());
        let identity = DMatrix::<f64>::identity(nodes.len(), nodes.len());
        assert_matrix_eq!(values, identity, comp = abs, tol = 1e-10);
    }
}

#[test]
fn edge_and_interior_nodes_lie_where_expected() {
    let element = LagrangeTriangle::new(4).unwrap();
    let nodes = element.reference_nodes();
    for m in 1..4 {
        let s = m as f64 / 4.0;
        assert_matrix_eq!(nodes[element.edge_node(0, m)].coords, Vector2::new(s, 0.0), comp = abs, tol = 1e-15);
        assert_matrix_eq!(nodes[element.edge_node(1, m)].coords, Vector2::new(1.0 - s, s), comp = abs, tol = 1e-15);
        assert_matrix_eq!(nodes[element.edge_node(2, m)].coords, Vector2::new(0.0, 1.0 - s), comp = abs, tol = 1e-15);
    }
    assert_eq!(element.interior_nodes().len(), 3);
    for node in element.interior_nodes() {
        let xi = nodes[node];
        assert!(xi.x > 0.0 && xi.y > 0.0 && xi.x + xi.y < 1.0);
    }
}

#[test]
fn reference_gradients_match_finite_differences() {
    let h = 1e-6;
    let xi = Point2::new(0.23, 0.41);
    for degree in 1..=3 {
        let element = LagrangeTriangle::new(degree).unwrap();
        let gradients = element.reference_gradients(&xi);
        let basis_at = |x: f64, y: f64| element.evaluate_basis(&Point2::new(x, y));
        let dx = (basis_at(xi.x + h, xi.y) - basis_at(xi.x - h, xi.y)) / (2.0 * h);
        let dy = (basis_at(xi.x, xi.y + h) - basis_at(xi.x, xi.y - h)) / (2.0 * h);
        assert_matrix_eq!(gradients.row(0).transpose(), dx, comp = abs, tol = 1e-6);
        assert_matrix_eq!(gradients.row(1).transpose(), dy, comp = abs, tol = 1e-6);
    }
}

#[test]
fn tabulation_matches_pointwise_evaluation() {
    let element = LagrangeTriangle::new(3).unwrap();
    let points = [Point2::new(0.1, 0.2), Point2::new(0.5, 0.25)];
    let table = element.tabulate(&points);
    for (q, xi) in points.iter().enumerate() {
        assert_eq!(table.values[q], element.evaluate_basis(xi));
        assert_eq!(table.gradients[q], element.reference_gradients(xi));
    }

    let mut values = vec![0.0; element.num_nodes()];
    element.populate_basis(&mut values, &points[0]);
    assert_eq!(values.as_slice(), table.values[0].as_slice());
}

#[test]
fn degenerate_triangle_map_is_rejected() {
    let collinear = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)];
    assert!(AffineTriangleMap::from_vertices(collinear).is_err());
}

#[test]
fn affine_map_of_reference_triangle_is_identity() {
    let reference_vertices = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
    let map = AffineTriangleMap::from_vertices(reference_vertices).unwrap();
    assert_scalar_eq!(map.determinant(), 1.0, comp = abs, tol = 1e-15);
    assert_matrix_eq!(*map.jacobian(), Matrix2::<f64>::identity(), comp = abs, tol = 1e-15);
}

proptest! {
    #[test]
    fn physical_gradient_recovers_gradient_of_affine_function(
        vertices in nondegenerate_triangle(),
        gx in -2.0..2.0f64,
        gy in -2.0..2.0f64,
    ) {
        let map = AffineTriangleMap::from_vertices(vertices).unwrap();
        let g = Vector2::new(gx, gy);
        // f(x) = g · x pulled back to the reference triangle has gradient Jᵀ g
        let reference_gradient = map.jacobian().transpose() * g;
        prop_assert_matrix_eq!(map.physical_gradient(&reference_gradient), g, comp = abs, tol = 1e-9);
    }

    #[test]
    fn basis_is_partition_of_unity(degree in 1..=4usize, x in 0.0..1.0, t in 0.0..1.0) {
        let element = LagrangeTriangle::new(degree).unwrap();
        let xi = Point2::new(x, t * (1.0 - x));
        let sum: f64 = element.evaluate_basis(&xi).sum();
        prop_assert!((sum - 1.0).abs() < 1e-10);
        let gradient_sum = element.reference_gradients(&xi).column_sum();
        prop_assert_matrix_eq!(gradient_sum, Vector2::<f64>::zeros(), comp = abs, tol = 1e-9);
    }

    #[test]
    fn affine_map_round_trips(vertices in nondegenerate_triangle(), x in 0.0..1.0, t in 0.0..1.0) {
        let map = AffineTriangleMap::from_vertices(vertices).unwrap();
        let xi = Point2::new(x, t * (1.0 - x));
        let mapped = map.map_reference_coords(&xi);
        let back = map.map_physical_coords(&mapped);
        prop_assert_matrix_eq!(back.coords, xi.coords, comp = abs, tol = 1e-8);
        prop_assert!(map.determinant() > 0.0);
    }

    #[test]
    fn physical_gradients_of_linear_basis_reproduce_linear_functions(vertices in nondegenerate_triangle()) {
        // The P1 interpolant of f(x) = c . x is exact, so its physical gradient equals c
        let map = AffineTriangleMap::from_vertices(vertices).unwrap();
        let element = LagrangeTriangle::new(1).unwrap();
        let c = Vector2::new(0.3, -1.2);
        let gradients = map.physical_gradients(&element.reference_gradients(&Point2::new(0.2, 0.2)));
        let mut gradient = Vector2::<f64>::zeros();
        for (vertex, column) in vertices.iter().zip(gradients.column_iter()) {
            gradient += column * c.dot(&vertex.coords);
        }
        prop_assert_matrix_eq!(gradient, c, comp = abs, tol = 1e-8);
    }
}
