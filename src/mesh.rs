use crate::element::AffineTriangleMap;
use eyre::eyre;
use itertools::Itertools;
use nalgebra::{Point2, Vector3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub mod procedural;

/// Connectivity of a linear triangle, given by indices into the vertex list of a mesh.
///
/// Counter-clockwise ordering is customary, but not required.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tri3Connectivity(pub [usize; 3]);

impl Tri3Connectivity {
    pub fn vertex_indices(&self) -> &[usize; 3] {
        &self.0
    }

    /// The three edges `0 -> 1`, `1 -> 2`, `2 -> 0` as pairs of global vertex indices.
    pub fn edges(&self) -> [[usize; 2]; 3] {
        let [a, b, c] = self.0;
        [[a, b], [b, c], [c, a]]
    }
}

/// A conforming two-dimensional triangle mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh2d {
    vertices: Vec<Point2<f64>>,
    cells: Vec<Tri3Connectivity>,
}

/// The location of a point inside a mesh.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLocation {
    pub cell_index: usize,
    /// Coordinates of the point on the reference triangle of the cell.
    pub reference_coords: Point2<f64>,
}

impl TriangleMesh2d {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// # Panics
    ///
    /// Panics if any cell references a vertex that does not exist.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point2<f64>>, cells: Vec<Tri3Connectivity>) -> Self {
        Self::try_from_vertices_and_connectivity(vertices, cells).expect("Connectivity must reference valid vertices")
    }

    /// Construct a mesh from vertices and connectivity, checking that all vertex indices are
    /// in bounds and that no cell references the same vertex twice.
    pub fn try_from_vertices_and_connectivity(
        vertices: Vec<Point2<f64>>,
        cells: Vec<Tri3Connectivity>,
    ) -> eyre::Result<Self> {
        for (cell_index, cell) in cells.iter().enumerate() {
            if let Some(&v) = cell.vertex_indices().iter().find(|&&v| v >= vertices.len()) {
                return Err(eyre!(
                    "Cell {} references vertex {}, but the mesh only has {} vertices",
                    cell_index,
                    v,
                    vertices.len()
                ));
            }
            if !cell.vertex_indices().iter().all_unique() {
                return Err(eyre!("Cell {} references the same vertex more than once", cell_index));
            }
        }
        Ok(Self { vertices, cells })
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn cells(&self) -> &[Tri3Connectivity] {
        &self.cells
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The corners of the given cell.
    pub fn cell_vertices(&self, cell_index: usize) -> [Point2<f64>; 3] {
        let [a, b, c] = *self.cells[cell_index].vertex_indices();
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    pub fn cell_area(&self, cell_index: usize) -> f64 {
        let [a, b, c] = self.cell_vertices(cell_index);
        0.5 * (b - a).perp(&(c - a)).abs()
    }

    pub fn area(&self) -> f64 {
        (0..self.num_cells()).map(|i| self.cell_area(i)).sum()
    }

    /// Edges which belong to exactly one cell, with vertex indices sorted in ascending order.
    ///
    /// The result is sorted.
    pub fn boundary_edges(&self) -> Vec<[usize; 2]> {
        let mut edge_counts = FxHashMap::default();
        for cell in &self.cells {
            for [a, b] in cell.edges() {
                *edge_counts.entry(sorted_edge(a, b)).or_insert(0usize) += 1;
            }
        }
        edge_counts
            .into_iter()
            .filter_map(|(edge, count)| (count == 1).then_some(edge))
            .sorted_unstable()
            .collect()
    }

    /// Sorted indices of vertices that lie on the boundary of the mesh.
    pub fn boundary_vertices(&self) -> Vec<usize> {
        self.boundary_edges()
            .into_iter()
            .flatten()
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Finds a cell containing the given point.
    ///
    /// Points on shared edges are attributed to the first matching cell. This is a linear search
    /// over all cells, which is fine for sampling a handful of points but not for bulk queries.
    pub fn locate_point(&self, point: &Point2<f64>) -> Option<PointLocation> {
        let eps = 1e-12;
        (0..self.num_cells()).find_map(|cell_index| {
            let map = AffineTriangleMap::from_vertices(self.cell_vertices(cell_index)).ok()?;
            let xi = map.map_physical_coords(point);
            let barycentric = Vector3::new(1.0 - xi.x - xi.y, xi.x, xi.y);
            barycentric.iter().all(|&l| l >= -eps).then_some(PointLocation {
                cell_index,
                reference_coords: xi,
            })
        })
    }
}

pub(crate) fn sorted_edge(a: usize, b: usize) -> [usize; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}
