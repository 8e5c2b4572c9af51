use ndarray::Array2;
use num::{Complex, Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Floating point types the grids and integrator are generic over.
pub trait WaveFloat: Float + FromPrimitive + Display + Debug + Send + Sync + 'static {}
impl<T: Float + FromPrimitive + Display + Debug + Send + Sync + 'static> WaveFloat for T {}

/// Converts an f64 constant into `T`.
pub fn lit<T: WaveFloat>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

pub fn complex_constant<T>(value: Complex<T>, shape: (usize, usize)) -> Array2<Complex<T>>
where
    T: WaveFloat,
{
    Array2::from_elem(shape, value)
}

#[test]
fn test_complex_constant_shape() {
    let grid = complex_constant(Complex::<f64>::new(1.0, -2.0), (3, 4));
    assert_eq!(grid.dim(), (3, 4));
    assert!(grid.iter().all(|c| c.re == 1.0 && c.im == -2.0));
}
