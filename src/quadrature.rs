//! Quadrature rules on the reference triangle, in `nalgebra` types.
use flow_quadrature::simplex;
use nalgebra::Point2;

#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule {
    weights: Vec<f64>,
    points: Vec<Point2<f64>>,
}

impl QuadratureRule {
    /// A rule on the reference triangle which is exact for polynomials of total degree up to
    /// `strength`.
    pub fn triangle(strength: usize) -> Self {
        let (weights, points) = simplex::triangle(strength);
        Self {
            weights,
            points: points.into_iter().map(Point2::from).collect(),
        }
    }

    /// The default strength for the Navier-Stokes forms with the given velocity degree.
    ///
    /// The convective term is the product of three velocity-related factors of degree
    /// `k`, `k - 1` and `k`, so `3k` integrates it exactly on affine cells.
    pub fn default_strength(velocity_degree: usize) -> usize {
        3 * velocity_degree
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
