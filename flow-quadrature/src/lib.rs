//! Quadrature rules for the reference domains used by `steady-flow`.
//!
//! Rules are returned as plain `(weights, points)` pairs of `f64` data, so that they can be used
//! independently of any linear algebra library.
//!
//! Conventions:
//!
//! - the reference interval is `[-1, 1]`,
//! - the reference triangle is the triangle with corners `(0, 0)`, `(1, 0)` and `(0, 1)`.

pub mod simplex;
pub mod univariate;

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    assert_eq!(weights.len(), points.len(), "Weights and points must have the same length");
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| *w * f(x))
        .sum()
}
