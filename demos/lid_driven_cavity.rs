//! Lid-driven cavity flow on the unit square, solved by continuation in the Reynolds number.
//!
//! Usage: `cargo run --release --example lid_driven_cavity -- [config.json]`
//!
//! The Reynolds number in the optional configuration file is the final target of the
//! continuation. Without a configuration file the target is `Re = 400`.
use steady_flow::bc::VelocityBoundaryCondition;
use steady_flow::config::SimulationConfig;
use steady_flow::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use steady_flow::nalgebra::{Point2, Vector2};
use steady_flow::simulation::SimulationBuilder;

const CELLS_PER_DIM: usize = 16;

fn main() -> eyre::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::new(400.0),
    };
    let target = config.reynolds_number;

    let mut reynolds_numbers: Vec<f64> = [1.0, 10.0, 100.0, 400.0]
        .into_iter()
        .filter(|&re| re < target)
        .collect();
    reynolds_numbers.push(target);

    let mut simulation = SimulationBuilder::from_config(&config)?
        .with_mesh(create_unit_square_uniform_tri_mesh_2d(CELLS_PER_DIM))
        .with_reynolds_number(reynolds_numbers[0])
        .with_boundary_condition(VelocityBoundaryCondition::no_slip())
        // The lid takes precedence in the two top corners
        .with_boundary_condition(VelocityBoundaryCondition::new(
            |x: &Point2<f64>| x.y >= 1.0 - 1e-12,
            |_| Vector2::new(1.0, 0.0),
        ))
        .build()?;

    println!(
        "Lid-driven cavity: {}x{} cells, P{}/P{} elements, {} unknowns",
        CELLS_PER_DIM,
        CELLS_PER_DIM,
        simulation.space().velocity_degree(),
        simulation.space().pressure_degree(),
        simulation.space().num_dofs()
    );

    for re in reynolds_numbers {
        simulation.set_reynolds_number(re)?;
        let summary = simulation.solve()?;
        println!(
            "Re = {:>6}: {:>2} Newton iterations, residual {:.3e}, mean pressure removed {:.3e}",
            summary.reynolds_number, summary.newton_iterations, summary.residual_norm, summary.mean_pressure
        );
        simulation.write_vtk(format!("data/lid_driven_cavity/cavity_re_{}.vtk", re))?;
    }

    // Horizontal velocity along the vertical centerline
    let fields = simulation.solution_fields();
    let velocity_space = simulation.space().velocity_space();
    let mut centerline: Vec<(f64, f64)> = velocity_space
        .node_coords()
        .iter()
        .enumerate()
        .filter(|(_, x)| (x.x - 0.5).abs() < 1e-12)
        .map(|(node, x)| (x.y, fields.velocity_at_node(node).x))
        .collect();
    centerline.sort_by(|a, b| a.0.total_cmp(&b.0));
    println!("u_x along x = 0.5:");
    for (y, u_x) in centerline {
        println!("  y = {:.4}: {:+.5}", y, u_x);
    }

    Ok(())
}
