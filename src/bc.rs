//! Dirichlet conditions on the velocity.
//!
//! The pressure never receives a Dirichlet condition. It is instead fixed by the nullspace
//! treatment in [`crate::nullspace`].
use crate::space::TaylorHoodSpace;
use nalgebra::{DVector, DVectorViewMut, Point2, Vector2};
use std::fmt;
use std::sync::Arc;

type BoundaryPredicate = dyn Fn(&Point2<f64>) -> bool + Send + Sync;
type VelocityFunction = dyn Fn(&Point2<f64>) -> Vector2<f64> + Send + Sync;

/// Prescribes the velocity on the part of the boundary where `predicate` holds.
#[derive(Clone)]
pub struct VelocityBoundaryCondition {
    predicate: Arc<BoundaryPredicate>,
    velocity: Arc<VelocityFunction>,
}

impl fmt::Debug for VelocityBoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VelocityBoundaryCondition").finish_non_exhaustive()
    }
}

impl VelocityBoundaryCondition {
    pub fn new(
        predicate: impl Fn(&Point2<f64>) -> bool + Send + Sync + 'static,
        velocity: impl Fn(&Point2<f64>) -> Vector2<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            velocity: Arc::new(velocity),
        }
    }

    /// No-slip condition on every boundary point.
    pub fn no_slip() -> Self {
        Self::new(|_| true, |_| Vector2::zeros())
    }

    pub fn applies_to(&self, x: &Point2<f64>) -> bool {
        (self.predicate)(x)
    }

    pub fn velocity(&self, x: &Point2<f64>) -> Vector2<f64> {
        (self.velocity)(x)
    }
}

/// The constrained degrees of freedom of a [`TaylorHoodSpace`] together with their values.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletConstraints {
    dofs: Vec<usize>,
    values: Vec<f64>,
}

impl DirichletConstraints {
    /// Evaluates the conditions at every velocity node on the mesh boundary.
    ///
    /// A node matched by several conditions takes the value of the one that appears last.
    /// Boundary nodes matched by no condition are left unconstrained.
    pub fn from_conditions(space: &TaylorHoodSpace, conditions: &[VelocityBoundaryCondition]) -> Self {
        let velocity_space = space.velocity_space();
        let mut dofs = Vec::new();
        let mut values = Vec::new();
        for &node in velocity_space.boundary_nodes() {
            let x = &velocity_space.node_coords()[node];
            if let Some(condition) = conditions.iter().rev().find(|bc| bc.applies_to(x)) {
                let u = condition.velocity(x);
                dofs.extend([space.velocity_dof(node, 0), space.velocity_dof(node, 1)]);
                values.extend([u.x, u.y]);
            }
        }
        Self { dofs, values }
    }

    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dofs.is_empty()
    }

    /// Overwrites the constrained entries of `x` with their prescribed values.
    pub fn apply_to_solution(&self, x: &mut DVectorViewMut<f64>) {
        for (&dof, &value) in self.dofs.iter().zip(&self.values) {
            x[dof] = value;
        }
    }

    /// The largest deviation of a constrained entry of `x` from its prescribed value.
    pub fn max_violation(&self, x: &DVector<f64>) -> f64 {
        self.dofs
            .iter()
            .zip(&self.values)
            .map(|(&dof, &value)| (x[dof] - value).abs())
            .fold(0.0, f64::max)
    }
}
