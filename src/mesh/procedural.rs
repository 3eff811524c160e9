//! Basic procedural mesh generation routines.
use crate::mesh::{Tri3Connectivity, TriangleMesh2d};
use nalgebra::{Point2, Vector2};

pub fn create_unit_square_uniform_tri_mesh_2d(cells_per_dim: usize) -> TriangleMesh2d {
    create_rectangular_uniform_tri_mesh_2d(
        &Vector2::new(1.0, 1.0),
        [cells_per_dim, cells_per_dim],
        &Point2::origin(),
    )
}

/// Generates an axis-aligned rectangular triangle mesh.
///
/// The rectangle `[origin, origin + extents]` is divided into `cells[0] x cells[1]` uniform
/// rectangles, each of which is split into two counter-clockwise triangles along the diagonal
/// from its bottom-left to its top-right corner. Vertices are numbered row by row, starting at
/// `origin`.
///
/// Returns an empty mesh if either cell count is zero.
pub fn create_rectangular_uniform_tri_mesh_2d(
    extents: &Vector2<f64>,
    cells: [usize; 2],
    origin: &Point2<f64>,
) -> TriangleMesh2d {
    let [num_cells_x, num_cells_y] = cells;
    if num_cells_x == 0 || num_cells_y == 0 {
        return TriangleMesh2d::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let num_vertices_x = num_cells_x + 1;
    let num_vertices_y = num_cells_y + 1;
    let h_x = extents.x / num_cells_x as f64;
    let h_y = extents.y / num_cells_y as f64;

    let to_global_vertex_index = |i: usize, j: usize| num_vertices_x * j + i;

    let mut vertices = Vec::with_capacity(num_vertices_x * num_vertices_y);
    for j in 0..num_vertices_y {
        for i in 0..num_vertices_x {
            vertices.push(origin + Vector2::new(i as f64 * h_x, j as f64 * h_y));
        }
    }

    let mut connectivity = Vec::with_capacity(2 * num_cells_x * num_cells_y);
    for j in 0..num_cells_y {
        for i in 0..num_cells_x {
            let bottom_left = to_global_vertex_index(i, j);
            let bottom_right = to_global_vertex_index(i + 1, j);
            let top_left = to_global_vertex_index(i, j + 1);
            let top_right = to_global_vertex_index(i + 1, j + 1);
            connectivity.push(Tri3Connectivity([bottom_left, bottom_right, top_right]));
            connectivity.push(Tri3Connectivity([bottom_left, top_right, top_left]));
        }
    }

    TriangleMesh2d::from_vertices_and_connectivity(vertices, connectivity)
}
