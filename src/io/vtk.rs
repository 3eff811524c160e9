//! Export of flow solutions to legacy VTK files.
use crate::fields::SolutionFields;
use eyre::{eyre, WrapErr};
use rustc_hash::FxHashMap;
use std::convert::TryInto;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, Piece,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Builds a VTK data set for the velocity and pressure of a solution.
///
/// The points of the data set are the velocity nodes. Each cell is split along the velocity
/// node lattice into linear triangles, so that higher-order velocity fields are rendered at
/// full nodal resolution. The pressure is evaluated at every velocity node.
pub struct FlowDataSetBuilder<'a> {
    fields: &'a SolutionFields<'a>,
    // Only used for exporting directly to file
    title: Option<String>,
}

impl<'a> FlowDataSetBuilder<'a> {
    pub fn from_fields(fields: &'a SolutionFields<'a>) -> Self {
        Self { fields, title: None }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            fields: self.fields,
            title: Some(title.into()),
        }
    }

    pub fn try_build(&self) -> eyre::Result<DataSet> {
        let space = self.fields.space();
        let velocity_space = space.velocity_space();
        let element = velocity_space.element();
        let num_nodes = velocity_space.num_nodes();

        let points: Vec<f64> = velocity_space
            .node_coords()
            .iter()
            .flat_map(|x| [x.x, x.y, 0.0])
            .collect();

        let velocity: Vec<f64> = (0..num_nodes)
            .flat_map(|node| {
                let u = self.fields.velocity_at_node(node);
                [u.x, u.y, 0.0]
            })
            .collect();

        // Nodes are shared between cells and the pressure is continuous, so any cell
        // containing a node gives the same value
        let mut pressure = vec![0.0; num_nodes];
        let reference_nodes = element.reference_nodes();
        for cell_index in 0..space.mesh().num_cells() {
            for (&node, xi) in velocity_space.cell_nodes(cell_index).iter().zip(&reference_nodes) {
                pressure[node] = self.fields.pressure_in_cell(cell_index, xi);
            }
        }

        let local_triangles = lattice_triangles(element.lattice(), element.degree());
        let num_cells = space.mesh().num_cells() * local_triangles.len();
        // Vertices are laid out as follows: N, i_1, i_2, ... i_N
        let mut vertices = Vec::with_capacity(4 * num_cells);
        for cell_index in 0..space.mesh().num_cells() {
            let cell_nodes = velocity_space.cell_nodes(cell_index);
            for triangle in &local_triangles {
                vertices.push(3);
                for &local in triangle {
                    vertices.push(
                        cell_nodes[local]
                            .try_into()
                            .wrap_err("Node index does not fit into VTK index type")?,
                    );
                }
            }
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: num_cells
                        .try_into()
                        .wrap_err("Number of cells does not fit into VTK index type")?,
                    vertices,
                },
                types: vec![CellType::Triangle; num_cells],
            },
            data: Attributes {
                point: vec![
                    Attribute::DataArray(DataArray {
                        name: "pressure".to_string(),
                        elem: ElementType::Scalars {
                            num_comp: 1,
                            lookup_table: None,
                        },
                        data: pressure.into(),
                    }),
                    Attribute::DataArray(DataArray {
                        name: "velocity".to_string(),
                        elem: ElementType::Vectors,
                        data: velocity.into(),
                    }),
                ],
                cell: vec![],
            },
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a file.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> eyre::Result<()> {
        let filepath = filename.as_ref();
        if let Some(parent) = filepath.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the filepath the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export(filepath)
        .map_err(|err| eyre!("Failed to export VTK file {}: {}", filepath.display(), err))
    }
}

/// Splits the reference lattice of degree `k` into `k²` triangles, given as local node indices
/// with counter-clockwise orientation.
pub fn lattice_triangles(lattice: &[[usize; 2]], degree: usize) -> Vec<[usize; 3]> {
    let local_index: FxHashMap<[usize; 2], usize> = lattice
        .iter()
        .enumerate()
        .map(|(local, &coords)| (coords, local))
        .collect();
    let node = |i: usize, j: usize| local_index[&[i, j]];

    let mut triangles = Vec::with_capacity(degree * degree);
    for j in 0..degree {
        for i in 0..degree - j {
            triangles.push([node(i, j), node(i + 1, j), node(i, j + 1)]);
            if i + j + 2 <= degree {
                triangles.push([node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)]);
            }
        }
    }
    triangles
}
