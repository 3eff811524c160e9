//! Error estimates of discrete solutions against exact solutions.
use crate::fields::SolutionFields;
use crate::quadrature::QuadratureRule;
use crate::strong_form::ExactSolution;

/// Errors of a discrete solution measured in integral norms.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ErrorNorms {
    pub pressure_l2: f64,
    pub velocity_l2: f64,
    pub velocity_h1_seminorm: f64,
}

/// Estimates the errors of `fields` with the given quadrature rule.
///
/// The pressure error is measured up to the difference of the domain means, since the pressure
/// is only determined up to a constant.
pub fn estimate_errors(fields: &SolutionFields, exact: &dyn ExactSolution, quadrature: &QuadratureRule) -> ErrorNorms {
    let space = fields.space();
    let mesh = space.mesh();

    let mut pressure_mean_difference = 0.0;
    let mut pressure_squared = 0.0;
    let mut velocity_squared = 0.0;
    let mut gradient_squared = 0.0;

    for cell_index in 0..mesh.num_cells() {
        let map = space.cell_map(cell_index);
        let abs_det = map.determinant().abs();
        for (w, xi) in quadrature.weights().iter().zip(quadrature.points()) {
            let x = map.map_reference_coords(xi);
            let weight = w * abs_det;

            let e_p = fields.pressure_in_cell(cell_index, xi) - exact.pressure(&x);
            pressure_mean_difference += weight * e_p;
            pressure_squared += weight * e_p * e_p;

            let e_u = fields.velocity_in_cell(cell_index, xi) - exact.velocity(&x);
            velocity_squared += weight * e_u.norm_squared();

            let e_grad = fields.velocity_gradient_in_cell(cell_index, xi) - exact.velocity_gradient(&x);
            gradient_squared += weight * e_grad.norm_squared();
        }
    }

    // ‖e - ē‖² = ‖e‖² - |Ω| ē²
    let area = mesh.area();
    let mean = pressure_mean_difference / area;
    let pressure_l2_squared = (pressure_squared - area * mean * mean).max(0.0);

    ErrorNorms {
        pressure_l2: pressure_l2_squared.sqrt(),
        velocity_l2: velocity_squared.sqrt(),
        velocity_h1_seminorm: gradient_squared.sqrt(),
    }
}
