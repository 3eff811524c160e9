//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Value and derivative of the Legendre polynomial `P_n` at a point.
///
/// The derivative formula is singular at `|x| == 1`, so this is only suitable for evaluation in
/// the open interval `(-1, 1)`, which is where all roots live.
#[derive(Debug, Default, Clone, Copy)]
struct Legendre {
    value: f64,
    derivative: f64,
}

impl Legendre {
    fn evaluate(n: usize, x: f64) -> Self {
        // Bonnet's recursion
        //  m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut current = 1.0;
        let mut previous = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let next = ((2.0 * m - 1.0) * x * current - (m - 1.0) * previous) / m;
            previous = current;
            current = next;
        }

        let n = n as f64;
        // P'_n(x) = n (x P_n(x) - P_{n - 1}(x)) / (x^2 - 1)
        let derivative = n * (x * current - previous) / (x * x - 1.0);
        Self {
            value: current,
            derivative,
        }
    }
}

/// Gauss-Legendre quadrature for the reference interval `[-1, 1]`.
///
/// Given `n` points, the rule integrates polynomials of degree up to `2n - 1` exactly.
/// Points are returned in ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let num_positive = (n + 1) / 2;
    let mut roots = Vec::with_capacity(num_positive);
    let mut root_weights = Vec::with_capacity(num_positive);

    // Roots are symmetric about the origin, so only the non-negative half is computed
    for i in 0..num_positive {
        // Tricomi's initial guess is accurate enough for Newton to converge in a few steps
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut legendre = Legendre::evaluate(n, x);
        for _ in 0..100 {
            let dx = -legendre.value / legendre.derivative;
            x += dx;
            legendre = Legendre::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        let w = 2.0 / ((1.0 - x * x) * legendre.derivative * legendre.derivative);
        roots.push(x);
        root_weights.push(w);
    }

    let mut weights = Vec::with_capacity(n);
    let mut points = Vec::with_capacity(n);

    // Negative roots, in ascending order
    for i in 0..n / 2 {
        points.push([-roots[i]]);
        weights.push(root_weights[i]);
    }
    // For odd n the middle root is (numerically) zero
    for i in (0..num_positive).rev() {
        let x = if n % 2 == 1 && i == num_positive - 1 { 0.0 } else { roots[i] };
        points.push([x]);
        weights.push(root_weights[i]);
    }

    assert_eq!(points.len(), n, "Internal error: incorrect number of points produced");
    (weights, points)
}

/// Returns the number of Gauss points needed to integrate polynomials of the given degree.
pub fn gauss_points_for_strength(strength: usize) -> usize {
    strength / 2 + 1
}
