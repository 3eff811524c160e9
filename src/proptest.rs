use crate::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use crate::mesh::TriangleMesh2d;
use ::proptest::prelude::*;
use nalgebra::Point2;

pub fn point2() -> impl Strategy<Value = Point2<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone()].prop_map(|[x, y]| Point2::new(x, y))
}

/// Counter-clockwise triangles whose area is not too small compared to their edge lengths.
pub fn nondegenerate_triangle() -> impl Strategy<Value = [Point2<f64>; 3]> {
    [point2(), point2(), point2()]
        .prop_map(|[a, b, c]| {
            let signed_area = 0.5 * (b - a).perp(&(c - a));
            if signed_area < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .prop_filter("triangle must not be degenerate", |[a, b, c]| {
            let area = 0.5 * (b - a).perp(&(c - a)).abs();
            let max_edge = [(b - a).norm(), (c - b).norm(), (a - c).norm()]
                .into_iter()
                .fold(0.0, f64::max);
            area > 1e-2 * max_edge * max_edge
        })
}

/// Uniform triangulations of the unit square with between 1 and `max_cells_per_dim` cells
/// per dimension.
pub fn unit_square_mesh(max_cells_per_dim: usize) -> impl Strategy<Value = TriangleMesh2d> {
    (1..=max_cells_per_dim.max(1)).prop_map(create_unit_square_uniform_tri_mesh_2d)
}
