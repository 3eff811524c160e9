use crate::lid_driven_cavity_builder;
use steady_flow::element::LagrangeTriangle;
use steady_flow::io::vtk::{lattice_triangles, FlowDataSetBuilder};
use steady_flow::vtkio::model::{DataSet, Piece, VertexNumbers};

#[test]
fn lattice_is_split_into_degree_squared_triangles() {
    for degree in 1..=4 {
        let element = LagrangeTriangle::new(degree).unwrap();
        let triangles = lattice_triangles(element.lattice(), degree);
        assert_eq!(triangles.len(), degree * degree);

        let nodes = element.reference_nodes();
        let total_area: f64 = triangles
            .iter()
            .map(|&[a, b, c]| {
                let signed_area = 0.5 * (nodes[b] - nodes[a]).perp(&(nodes[c] - nodes[a]));
                assert!(signed_area > 0.0);
                signed_area
            })
            .sum();
        assert!((total_area - 0.5).abs() < 1e-14);
    }
}

#[test]
fn data_set_contains_velocity_nodes_and_subdivided_cells() {
    let simulation = lid_driven_cavity_builder(2, 1.0).build().unwrap();
    let fields = simulation.solution_fields();
    let data_set = FlowDataSetBuilder::from_fields(&fields).try_build().unwrap();

    let DataSet::UnstructuredGrid { pieces, .. } = data_set else {
        panic!("expected an unstructured grid");
    };
    let Piece::Inline(piece) = &pieces[0] else {
        panic!("expected an inline piece");
    };
    let num_velocity_nodes = simulation.space().velocity_space().num_nodes();
    assert_eq!(piece.points.len(), 3 * num_velocity_nodes);
    assert_eq!(piece.cells.types.len(), 8 * 4);
    match &piece.cells.cell_verts {
        VertexNumbers::Legacy { num_cells, vertices } => {
            assert_eq!(*num_cells, 32);
            assert_eq!(vertices.len(), 4 * 32);
        }
        _ => panic!("expected legacy vertex numbers"),
    }
    assert_eq!(piece.data.point.len(), 2);
}

#[test]
fn solution_is_written_to_vtk_file() {
    let mut simulation = lid_driven_cavity_builder(2, 1.0).build().unwrap();
    simulation.solve().unwrap();
    let path = "data/unit_tests/io/lid_driven_cavity.vtk";
    simulation.write_vtk(path).unwrap();
    assert!(std::path::Path::new(path).exists());
}
