//! Finite element spaces on triangle meshes.
use crate::element::{AffineTriangleMap, LagrangeTriangle};
use crate::mesh::{sorted_edge, TriangleMesh2d};
use eyre::{eyre, WrapErr};
use itertools::Itertools;
use nalgebra::{DVector, DVectorView, Point2, Vector2};
use rustc_hash::FxHashMap;
use std::ops::Range;

/// Globally numbered nodes of a continuous scalar Lagrange space of fixed degree.
///
/// Nodes are numbered as follows: first the mesh vertices referenced by at least one cell, in
/// ascending vertex order, then the interior nodes of each edge in the order edges are first
/// encountered, then the interior nodes of each cell. Edge nodes are numbered from the lower to
/// the higher vertex index, so that two cells sharing an edge agree on the nodes regardless
/// of their orientation.
#[derive(Debug, Clone)]
pub struct LagrangeSpace {
    element: LagrangeTriangle,
    node_coords: Vec<Point2<f64>>,
    cell_nodes: Vec<usize>,
    boundary_nodes: Vec<usize>,
}

impl LagrangeSpace {
    pub fn new(mesh: &TriangleMesh2d, degree: usize) -> eyre::Result<Self> {
        let element = LagrangeTriangle::new(degree)?;
        let k = degree;
        let nodes_per_edge = element.num_edge_interior_nodes();
        let num_interior = element.interior_nodes().len();

        let mut vertex_nodes = vec![usize::MAX; mesh.vertices().len()];
        let mut node_coords = Vec::new();
        for v in mesh.cells().iter().flat_map(|cell| cell.vertex_indices()).copied().sorted_unstable().dedup() {
            vertex_nodes[v] = node_coords.len();
            node_coords.push(mesh.vertices()[v]);
        }

        let mut edge_offsets: FxHashMap<[usize; 2], usize> = FxHashMap::default();
        let mut cell_nodes = vec![usize::MAX; mesh.num_cells() * element.num_nodes()];

        for (cell_index, cell) in mesh.cells().iter().enumerate() {
            let map = AffineTriangleMap::from_vertices(mesh.cell_vertices(cell_index))
                .wrap_err_with(|| format!("Invalid geometry for cell {}", cell_index))?;
            let local = &mut cell_nodes[cell_index * element.num_nodes()..(cell_index + 1) * element.num_nodes()];

            for (local_vertex, &v) in cell.vertex_indices().iter().enumerate() {
                local[local_vertex] = vertex_nodes[v];
            }

            for (edge, [a, b]) in cell.edges().into_iter().enumerate() {
                let [lo, hi] = sorted_edge(a, b);
                let offset = *edge_offsets.entry([lo, hi]).or_insert_with(|| {
                    let offset = node_coords.len();
                    let (x_lo, x_hi) = (mesh.vertices()[lo], mesh.vertices()[hi]);
                    for t in 1..k {
                        let s = t as f64 / k as f64;
                        node_coords.push(x_lo + (x_hi - x_lo) * s);
                    }
                    offset
                });
                for m in 1..k {
                    // Position along the edge counted from the lower vertex index
                    let t = if a < b { m } else { k - m };
                    local[element.edge_node(edge, m)] = offset + t - 1;
                }
            }

            let interior_offset = node_coords.len();
            for (n, local_index) in element.interior_nodes().enumerate() {
                let [i, j] = element.lattice()[local_index];
                let xi = Point2::new(i as f64 / k as f64, j as f64 / k as f64);
                node_coords.push(map.map_reference_coords(&xi));
                local[local_index] = interior_offset + n;
            }
            debug_assert_eq!(node_coords.len(), interior_offset + num_interior);
        }

        let mut boundary_nodes = Vec::new();
        for [lo, hi] in mesh.boundary_edges() {
            boundary_nodes.push(vertex_nodes[lo]);
            boundary_nodes.push(vertex_nodes[hi]);
            if let Some(&offset) = edge_offsets.get(&[lo, hi]) {
                boundary_nodes.extend(offset..offset + nodes_per_edge);
            }
        }
        boundary_nodes.sort_unstable();
        boundary_nodes.dedup();

        Ok(Self {
            element,
            node_coords,
            cell_nodes,
            boundary_nodes,
        })
    }

    pub fn element(&self) -> &LagrangeTriangle {
        &self.element
    }

    pub fn degree(&self) -> usize {
        self.element.degree()
    }

    pub fn num_nodes(&self) -> usize {
        self.node_coords.len()
    }

    pub fn node_coords(&self) -> &[Point2<f64>] {
        &self.node_coords
    }

    /// Global node indices of the given cell, in the local order of the element.
    pub fn cell_nodes(&self, cell_index: usize) -> &[usize] {
        let n = self.element.num_nodes();
        &self.cell_nodes[n * cell_index..n * (cell_index + 1)]
    }

    /// Sorted indices of the nodes that lie on the boundary of the mesh.
    pub fn boundary_nodes(&self) -> &[usize] {
        &self.boundary_nodes
    }

    /// Nodal interpolation of a scalar function.
    pub fn interpolate(&self, f: impl Fn(&Point2<f64>) -> f64) -> DVector<f64> {
        DVector::from_iterator(self.num_nodes(), self.node_coords.iter().map(f))
    }
}

/// The Taylor-Hood mixed space: continuous pressure of degree `d` and continuous velocity of
/// degree `d + 1`.
///
/// Degrees of freedom are laid out with the pressure block first, followed by the velocity
/// block with the two components of each node stored next to each other:
///
/// ```text
/// [p_0, ..., p_{n_p - 1}, u_0^x, u_0^y, u_1^x, u_1^y, ...]
/// ```
///
/// Local degrees of freedom of a cell follow the same convention.
#[derive(Debug, Clone)]
pub struct TaylorHoodSpace {
    mesh: TriangleMesh2d,
    cell_maps: Vec<AffineTriangleMap>,
    pressure: LagrangeSpace,
    velocity: LagrangeSpace,
}

impl TaylorHoodSpace {
    pub fn new(mesh: TriangleMesh2d, pressure_degree: usize) -> eyre::Result<Self> {
        if pressure_degree == 0 {
            return Err(eyre!("Taylor-Hood pressure element degree must be at least 1"));
        }
        if mesh.is_empty() {
            return Err(eyre!("Cannot construct a Taylor-Hood space on an empty mesh"));
        }
        let pressure = LagrangeSpace::new(&mesh, pressure_degree).wrap_err("Failed to construct pressure space")?;
        let velocity =
            LagrangeSpace::new(&mesh, pressure_degree + 1).wrap_err("Failed to construct velocity space")?;
        let cell_maps = (0..mesh.num_cells())
            .map(|i| AffineTriangleMap::from_vertices(mesh.cell_vertices(i)))
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(Self {
            mesh,
            cell_maps,
            pressure,
            velocity,
        })
    }

    pub fn mesh(&self) -> &TriangleMesh2d {
        &self.mesh
    }

    pub fn cell_map(&self, cell_index: usize) -> &AffineTriangleMap {
        &self.cell_maps[cell_index]
    }

    pub fn pressure_space(&self) -> &LagrangeSpace {
        &self.pressure
    }

    pub fn velocity_space(&self) -> &LagrangeSpace {
        &self.velocity
    }

    pub fn pressure_degree(&self) -> usize {
        self.pressure.degree()
    }

    pub fn velocity_degree(&self) -> usize {
        self.velocity.degree()
    }

    pub fn num_pressure_dofs(&self) -> usize {
        self.pressure.num_nodes()
    }

    pub fn num_velocity_dofs(&self) -> usize {
        2 * self.velocity.num_nodes()
    }

    pub fn num_dofs(&self) -> usize {
        self.num_pressure_dofs() + self.num_velocity_dofs()
    }

    /// The global degrees of freedom of the pressure field.
    pub fn pressure_dofs(&self) -> Range<usize> {
        0..self.num_pressure_dofs()
    }

    /// The global degrees of freedom of the velocity field.
    pub fn velocity_dofs(&self) -> Range<usize> {
        self.num_pressure_dofs()..self.num_dofs()
    }

    pub fn pressure_dof(&self, pressure_node: usize) -> usize {
        pressure_node
    }

    pub fn velocity_dof(&self, velocity_node: usize, component: usize) -> usize {
        debug_assert!(component < 2);
        self.num_pressure_dofs() + 2 * velocity_node + component
    }

    pub fn num_local_pressure_dofs(&self) -> usize {
        self.pressure.element().num_nodes()
    }

    pub fn num_local_velocity_dofs(&self) -> usize {
        2 * self.velocity.element().num_nodes()
    }

    pub fn num_local_dofs(&self) -> usize {
        self.num_local_pressure_dofs() + self.num_local_velocity_dofs()
    }

    /// Writes the global degrees of freedom of a cell into `dofs`, in local order.
    pub fn populate_cell_dofs(&self, dofs: &mut [usize], cell_index: usize) {
        assert_eq!(dofs.len(), self.num_local_dofs());
        let (pressure_dofs, velocity_dofs) = dofs.split_at_mut(self.num_local_pressure_dofs());
        for (dof, &node) in pressure_dofs.iter_mut().zip(self.pressure.cell_nodes(cell_index)) {
            *dof = self.pressure_dof(node);
        }
        for (pair, &node) in velocity_dofs
            .chunks_exact_mut(2)
            .zip(self.velocity.cell_nodes(cell_index))
        {
            pair[0] = self.velocity_dof(node, 0);
            pair[1] = self.velocity_dof(node, 1);
        }
    }

    pub fn cell_dofs(&self, cell_index: usize) -> Vec<usize> {
        let mut dofs = vec![0; self.num_local_dofs()];
        self.populate_cell_dofs(&mut dofs, cell_index);
        dofs
    }

    /// Global velocity degrees of freedom on the boundary of the mesh.
    pub fn boundary_velocity_dofs(&self) -> Vec<usize> {
        self.velocity
            .boundary_nodes()
            .iter()
            .flat_map(|&node| [self.velocity_dof(node, 0), self.velocity_dof(node, 1)])
            .collect()
    }

    /// Builds a coefficient vector by nodal interpolation of the given fields.
    pub fn interpolate(
        &self,
        pressure: impl Fn(&Point2<f64>) -> f64,
        velocity: impl Fn(&Point2<f64>) -> Vector2<f64>,
    ) -> DVector<f64> {
        let mut coefficients = DVector::zeros(self.num_dofs());
        for (node, x) in self.pressure.node_coords().iter().enumerate() {
            coefficients[self.pressure_dof(node)] = pressure(x);
        }
        for (node, x) in self.velocity.node_coords().iter().enumerate() {
            let u = velocity(x);
            coefficients[self.velocity_dof(node, 0)] = u.x;
            coefficients[self.velocity_dof(node, 1)] = u.y;
        }
        coefficients
    }

    /// Copies the coefficients of a cell from a global vector into `local`, in local order.
    pub fn gather_cell_coefficients(
        &self,
        local: &mut [f64],
        dofs: &mut [usize],
        global: &DVectorView<f64>,
        cell_index: usize,
    ) {
        self.populate_cell_dofs(dofs, cell_index);
        for (value, &dof) in local.iter_mut().zip(dofs.iter()) {
            *value = global[dof];
        }
    }
}
