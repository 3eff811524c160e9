use crate::space::TaylorHoodSpace;
use nalgebra::{DVectorView, Matrix2, Point2, Vector2};

/// The named fields `p` and `u` of a coefficient vector in a [`TaylorHoodSpace`].
#[derive(Debug, Clone)]
pub struct SolutionFields<'a> {
    space: &'a TaylorHoodSpace,
    coefficients: DVectorView<'a, f64>,
}

impl<'a> SolutionFields<'a> {
    /// # Panics
    ///
    /// Panics if the number of coefficients does not match the number of degrees of freedom
    /// in the space.
    pub fn new(space: &'a TaylorHoodSpace, coefficients: impl Into<DVectorView<'a, f64>>) -> Self {
        let coefficients = coefficients.into();
        assert_eq!(
            coefficients.len(),
            space.num_dofs(),
            "Coefficient vector length must match the number of degrees of freedom"
        );
        Self { space, coefficients }
    }

    pub fn space(&self) -> &'a TaylorHoodSpace {
        self.space
    }

    /// Nodal values of the pressure.
    pub fn pressure(&self) -> DVectorView<'_, f64> {
        self.coefficients.rows(0, self.space.num_pressure_dofs())
    }

    /// Nodal values of the velocity, two components per node.
    pub fn velocity(&self) -> DVectorView<'_, f64> {
        self.coefficients
            .rows(self.space.num_pressure_dofs(), self.space.num_velocity_dofs())
    }

    pub fn velocity_at_node(&self, velocity_node: usize) -> Vector2<f64> {
        Vector2::new(
            self.coefficients[self.space.velocity_dof(velocity_node, 0)],
            self.coefficients[self.space.velocity_dof(velocity_node, 1)],
        )
    }

    pub fn pressure_in_cell(&self, cell_index: usize, xi: &Point2<f64>) -> f64 {
        let element = self.space.pressure_space().element();
        let phi = element.evaluate_basis(xi);
        self.space
            .pressure_space()
            .cell_nodes(cell_index)
            .iter()
            .zip(phi.iter())
            .map(|(&node, phi_i)| self.coefficients[self.space.pressure_dof(node)] * phi_i)
            .sum()
    }

    pub fn velocity_in_cell(&self, cell_index: usize, xi: &Point2<f64>) -> Vector2<f64> {
        let element = self.space.velocity_space().element();
        let psi = element.evaluate_basis(xi);
        self.space
            .velocity_space()
            .cell_nodes(cell_index)
            .iter()
            .zip(psi.iter())
            .map(|(&node, psi_i)| self.velocity_at_node(node) * *psi_i)
            .sum()
    }

    /// The velocity gradient with entries `(grad u)_{ab} = du_a / dx_b`.
    pub fn velocity_gradient_in_cell(&self, cell_index: usize, xi: &Point2<f64>) -> Matrix2<f64> {
        let element = self.space.velocity_space().element();
        let map = self.space.cell_map(cell_index);
        let grad_psi = map.physical_gradients(&element.reference_gradients(xi));
        self.space
            .velocity_space()
            .cell_nodes(cell_index)
            .iter()
            .zip(grad_psi.column_iter())
            .map(|(&node, grad_psi_i)| self.velocity_at_node(node) * grad_psi_i.transpose())
            .sum()
    }

    /// Evaluates the pressure at a point, or returns `None` if the point lies outside the mesh.
    pub fn pressure_at(&self, x: &Point2<f64>) -> Option<f64> {
        let location = self.space.mesh().locate_point(x)?;
        Some(self.pressure_in_cell(location.cell_index, &location.reference_coords))
    }

    /// Evaluates the velocity at a point, or returns `None` if the point lies outside the mesh.
    pub fn velocity_at(&self, x: &Point2<f64>) -> Option<Vector2<f64>> {
        let location = self.space.mesh().locate_point(x)?;
        Some(self.velocity_in_cell(location.cell_index, &location.reference_coords))
    }

    pub fn velocity_gradient_at(&self, x: &Point2<f64>) -> Option<Matrix2<f64>> {
        let location = self.space.mesh().locate_point(x)?;
        Some(self.velocity_gradient_in_cell(location.cell_index, &location.reference_coords))
    }
}
