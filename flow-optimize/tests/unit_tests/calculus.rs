use flow_optimize::calculus::*;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};

#[test]
fn approximate_jacobian_of_polynomial_map() {
    let function = VectorFunctionBuilder::with_dimension(2).with_function(
        |f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| {
            let (x1, x2) = (x[0], x[1]);
            f[0] = x1 * x2 + 3.0;
            f[1] = x1 * x1 + x2 * x2 + x1 + 5.0;
        },
    );

    let x = DVector::from_column_slice(&[3.0, 4.0]);
    let j = approximate_jacobian(function, &x, &1e-6);

    // J = [   x2           x1 ]
    //     [ 2*x1 + 1     2*x2 ]
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 2, &[
        4.0, 3.0,
        7.0, 8.0
    ]);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-6);
}

#[test]
fn approximate_jacobian_leaves_point_unchanged() {
    struct Quadratic;

    impl VectorFunction<f64> for Quadratic {
        fn dimension(&self) -> usize {
            3
        }

        fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
            f.copy_from(&x.component_mul(x));
        }
    }

    let x = DVector::from_column_slice(&[1.0, -2.0, 0.5]);
    let j = approximate_jacobian(Quadratic, &x, &1e-5);
    assert_eq!(x, DVector::from_column_slice(&[1.0, -2.0, 0.5]));
    assert_matrix_eq!(j, DMatrix::from_diagonal(&(2.0 * &x)), comp = abs, tol = 1e-8);
}
