//! Lagrange finite elements on triangles.
//!
//! The reference triangle is the triangle with corners `(0, 0)`, `(1, 0)` and `(0, 1)`, which
//! is the convention used by `flow_quadrature::simplex`.
use eyre::eyre;
use nalgebra::{DMatrix, DVector, Matrix2, Matrix2xX, Point2, Vector2};

/// Continuous Lagrange basis functions of arbitrary degree on the reference triangle.
///
/// Nodes are placed on the equispaced lattice `(i / k, j / k)` with `i + j <= k`, and ordered
///
/// 1. the three vertices `(0, 0)`, `(1, 0)`, `(0, 1)`,
/// 2. the `k - 1` interior nodes of each edge `0 -> 1`, `1 -> 2`, `2 -> 0`, ordered from the
///    first to the second vertex of the edge,
/// 3. the interior nodes of the cell, row by row.
///
/// For degree 1 and 2 this coincides with the usual `Tri3`/`Tri6` orderings.
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeTriangle {
    degree: usize,
    lattice: Vec<[usize; 2]>,
    exponents: Vec<[usize; 2]>,
    /// Column `i` holds the monomial coefficients of basis function `i`.
    coefficients: DMatrix<f64>,
}

/// Basis values and reference gradients tabulated at a fixed set of reference points.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisTable {
    /// Values of all basis functions at each point.
    pub values: Vec<DVector<f64>>,
    /// Reference gradients of all basis functions at each point, one column per basis function.
    pub gradients: Vec<Matrix2xX<f64>>,
}

impl LagrangeTriangle {
    pub fn new(degree: usize) -> eyre::Result<Self> {
        if degree == 0 {
            return Err(eyre!("Continuous Lagrange elements require degree at least 1"));
        }

        let lattice = lattice_points(degree);
        let exponents: Vec<_> = (0..=degree)
            .flat_map(|total| (0..=total).map(move |b| [total - b, b]))
            .collect();
        assert_eq!(lattice.len(), exponents.len());

        let k = degree as f64;
        let vandermonde = DMatrix::from_fn(lattice.len(), exponents.len(), |node, m| {
            let [i, j] = lattice[node];
            monomial(&exponents[m], &Point2::new(i as f64 / k, j as f64 / k))
        });
        let coefficients = vandermonde
            .try_inverse()
            .ok_or_else(|| eyre!("Vandermonde matrix for degree {} is singular", degree))?;

        Ok(Self {
            degree,
            lattice,
            exponents,
            coefficients,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn num_nodes(&self) -> usize {
        self.lattice.len()
    }

    /// Lattice coordinates `(i, j)` of each node, so that the node lies at `(i / k, j / k)`.
    pub fn lattice(&self) -> &[[usize; 2]] {
        &self.lattice
    }

    pub fn reference_nodes(&self) -> Vec<Point2<f64>> {
        let k = self.degree as f64;
        self.lattice
            .iter()
            .map(|&[i, j]| Point2::new(i as f64 / k, j as f64 / k))
            .collect()
    }

    /// Number of nodes in the interior of each edge.
    pub fn num_edge_interior_nodes(&self) -> usize {
        self.degree - 1
    }

    /// Local index of the `m`-th node (`1 <= m < k`) on the given local edge, counted from the
    /// first vertex of the edge.
    pub fn edge_node(&self, edge: usize, m: usize) -> usize {
        debug_assert!(edge < 3 && m >= 1 && m < self.degree);
        3 + edge * (self.degree - 1) + (m - 1)
    }

    /// Local indices of the nodes in the interior of the cell.
    pub fn interior_nodes(&self) -> std::ops::Range<usize> {
        3 + 3 * (self.degree - 1)..self.num_nodes()
    }

    fn monomials(&self, xi: &Point2<f64>) -> DVector<f64> {
        DVector::from_iterator(self.exponents.len(), self.exponents.iter().map(|e| monomial(e, xi)))
    }

    pub fn populate_basis(&self, basis_values: &mut [f64], xi: &Point2<f64>) {
        assert_eq!(basis_values.len(), self.num_nodes());
        let values = self.coefficients.tr_mul(&self.monomials(xi));
        basis_values.copy_from_slice(values.as_slice());
    }

    pub fn evaluate_basis(&self, xi: &Point2<f64>) -> DVector<f64> {
        self.coefficients.tr_mul(&self.monomials(xi))
    }

    /// Gradients of all basis functions with respect to reference coordinates.
    pub fn reference_gradients(&self, xi: &Point2<f64>) -> Matrix2xX<f64> {
        let num_monomials = self.exponents.len();
        let mut monomial_gradients = Matrix2xX::zeros(num_monomials);
        for (m, &[a, b]) in self.exponents.iter().enumerate() {
            if a > 0 {
                monomial_gradients[(0, m)] = a as f64 * xi.x.powi(a as i32 - 1) * xi.y.powi(b as i32);
            }
            if b > 0 {
                monomial_gradients[(1, m)] = b as f64 * xi.x.powi(a as i32) * xi.y.powi(b as i32 - 1);
            }
        }
        monomial_gradients * &self.coefficients
    }

    pub fn tabulate(&self, points: &[Point2<f64>]) -> BasisTable {
        let values = points.iter().map(|xi| self.evaluate_basis(xi)).collect();
        let gradients = points.iter().map(|xi| self.reference_gradients(xi)).collect();
        BasisTable { values, gradients }
    }
}

fn monomial(&[a, b]: &[usize; 2], xi: &Point2<f64>) -> f64 {
    xi.x.powi(a as i32) * xi.y.powi(b as i32)
}

fn lattice_points(k: usize) -> Vec<[usize; 2]> {
    let mut points = vec![[0, 0], [k, 0], [0, k]];
    points.extend((1..k).map(|m| [m, 0]));
    points.extend((1..k).map(|m| [k - m, m]));
    points.extend((1..k).map(|m| [0, k - m]));
    for j in 1..k {
        for i in 1..k - j {
            points.push([i, j]);
        }
    }
    points
}

/// The affine map from the reference triangle to a physical triangle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AffineTriangleMap {
    origin: Point2<f64>,
    jacobian: Matrix2<f64>,
    inverse_jacobian: Matrix2<f64>,
    determinant: f64,
}

impl AffineTriangleMap {
    /// Fails if the triangle is degenerate.
    pub fn from_vertices([a, b, c]: [Point2<f64>; 3]) -> eyre::Result<Self> {
        let jacobian = Matrix2::from_columns(&[b - a, c - a]);
        let determinant = jacobian.determinant();
        let scale = (b - a).norm_squared().max((c - a).norm_squared());
        if !(determinant.abs() > 1e-14 * scale) {
            return Err(eyre!("Triangle with corners {}, {}, {} is degenerate", a, b, c));
        }
        let inverse_jacobian = jacobian
            .try_inverse()
            .ok_or_else(|| eyre!("Triangle with corners {}, {}, {} is degenerate", a, b, c))?;
        Ok(Self {
            origin: a,
            jacobian,
            inverse_jacobian,
            determinant,
        })
    }

    pub fn map_reference_coords(&self, xi: &Point2<f64>) -> Point2<f64> {
        self.origin + self.jacobian * xi.coords
    }

    pub fn map_physical_coords(&self, x: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.inverse_jacobian * (x - self.origin))
    }

    pub fn jacobian(&self) -> &Matrix2<f64> {
        &self.jacobian
    }

    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    /// Transforms gradients with respect to reference coordinates into physical gradients.
    pub fn physical_gradients(&self, reference_gradients: &Matrix2xX<f64>) -> Matrix2xX<f64> {
        self.inverse_jacobian.transpose() * reference_gradients
    }

    /// The matrix `J^{-T}` which maps reference gradients to physical gradients.
    pub fn inverse_transpose(&self) -> Matrix2<f64> {
        self.inverse_jacobian.transpose()
    }

    pub fn physical_gradient(&self, reference_gradient: &Vector2<f64>) -> Vector2<f64> {
        self.inverse_jacobian.transpose() * reference_gradient
    }
}
