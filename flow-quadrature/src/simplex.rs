//! Quadrature rules for the reference triangle.
//!
//! The rules are obtained by collapsing a tensor product of Gauss rules on the unit square onto
//! the triangle (the Duffy transformation). They are not the most economical rules available,
//! but they exist for any strength, have positive weights and all points lie in the interior.

use crate::univariate::{gauss, gauss_points_for_strength};
use crate::Rule2d;

/// A quadrature rule for the reference triangle `(0, 0), (1, 0), (0, 1)` which integrates
/// polynomials of total degree up to `strength` exactly.
pub fn triangle(strength: usize) -> Rule2d {
    // The collapsed map x = s (1 - t), y = t has Jacobian determinant (1 - t), which raises
    // the polynomial degree of the integrand in t by one.
    let (weights_s, points_s) = gauss(gauss_points_for_strength(strength));
    let (weights_t, points_t) = gauss(gauss_points_for_strength(strength + 1));

    let mut weights = Vec::with_capacity(weights_s.len() * weights_t.len());
    let mut points = Vec::with_capacity(weights_s.len() * weights_t.len());

    for (&w_t, &[xi_t]) in weights_t.iter().zip(&points_t) {
        let t = 0.5 * (xi_t + 1.0);
        for (&w_s, &[xi_s]) in weights_s.iter().zip(&points_s) {
            let s = 0.5 * (xi_s + 1.0);
            weights.push(0.25 * w_s * w_t * (1.0 - t));
            points.push([s * (1.0 - t), t]);
        }
    }

    (weights, points)
}
