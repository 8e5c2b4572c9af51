use crate::utils::{
    complex::{complex_constant, lit, WaveFloat},
    error::RuntimeError,
};
use ndarray::{Array2, Zip};
use num::{Complex, Zero};
use qwave_common::BoundaryCondition;

/// L2 norm of the grid, treated as one flat vector
pub fn norm<T: WaveFloat>(grid: &Array2<Complex<T>>) -> T {
    grid.iter()
        .fold(T::zero(), |acc, c| acc + c.norm_sqr())
        .sqrt()
}

/// Divides every cell by the L2 norm of the grid, returning the norm it had before.
/// The grid is untouched if the norm is zero or not finite.
pub fn normalize<T: WaveFloat>(grid: &mut Array2<Complex<T>>) -> Result<T, RuntimeError> {
    let norm = norm(grid);
    if !norm.is_finite() {
        return Err(RuntimeError::NanOrInf);
    }
    if norm.is_zero() {
        return Err(RuntimeError::ZeroNorm);
    }
    let inv_norm = norm.recip();
    grid.mapv_inplace(|c| c.scale(inv_norm));
    Ok(norm)
}

/// Normalized copy of `grid`
pub fn normalized<T: WaveFloat>(
    grid: &Array2<Complex<T>>,
) -> Result<Array2<Complex<T>>, RuntimeError> {
    let mut grid = grid.clone();
    normalize(&mut grid)?;
    Ok(grid)
}

pub fn check_norm<T: WaveFloat>(grid: &Array2<Complex<T>>, tolerance: T) -> bool {
    (norm(grid) - T::one()).abs() < tolerance
}

/// Returns true if every cell is finite
pub fn check_complex_for_nans<T: WaveFloat>(grid: &Array2<Complex<T>>) -> bool {
    grid.iter().all(|c| c.re.is_finite() && c.im.is_finite())
}

/// Per-cell squared magnitude, re^2 + im^2
pub fn amplitude<T: WaveFloat>(grid: &Array2<Complex<T>>) -> Array2<T> {
    grid.mapv(|c| c.norm_sqr())
}

/// Divides every cell by the imaginary unit: (re, im) -> (im, -re)
pub fn over_i<T: WaveFloat>(grid: &Array2<Complex<T>>) -> Array2<Complex<T>> {
    grid.mapv(|c| Complex::new(c.im, -c.re))
}

/// Five point laplacian `(up + down + left + right - 4 center) / dx^2`, applied to
/// the real and imaginary parts alike. Neighbours outside the grid are resolved by `boundary`.
pub fn laplacian<T: WaveFloat>(
    grid: &Array2<Complex<T>>,
    dx: T,
    boundary: BoundaryCondition,
) -> Array2<Complex<T>> {
    let (lx, ly) = grid.dim();
    let inv_dx2 = (dx * dx).recip();
    let four: T = lit(4.0);

    let neighbour = |x: usize, y: usize, di: isize, dj: isize| -> Complex<T> {
        match (
            resolve(x as isize + di, lx, boundary),
            resolve(y as isize + dj, ly, boundary),
        ) {
            (Some(i), Some(j)) => grid[[i, j]],
            _ => Complex::zero(),
        }
    };

    let mut out = complex_constant(Complex::zero(), (lx, ly));
    Zip::indexed(&mut out).for_each(|(x, y), value| {
        let sum = neighbour(x, y, -1, 0)
            + neighbour(x, y, 1, 0)
            + neighbour(x, y, 0, -1)
            + neighbour(x, y, 0, 1);
        *value = (sum - grid[[x, y]].scale(four)).scale(inv_dx2);
    });
    out
}

/// Maps a possibly out of range index onto the grid, or None when it reads zero
fn resolve(index: isize, len: usize, boundary: BoundaryCondition) -> Option<usize> {
    let last = len as isize - 1;
    if (0..=last).contains(&index) {
        return Some(index as usize);
    }
    match boundary {
        BoundaryCondition::ZeroPad => None,
        BoundaryCondition::Replicate => Some(index.clamp(0, last) as usize),
        BoundaryCondition::Reflect => {
            if last == 0 {
                return Some(0);
            }
            let reflected = if index < 0 { -index } else { 2 * last - index };
            Some(reflected.clamp(0, last) as usize)
        }
    }
}

#[cfg(test)]
fn test_field<T: WaveFloat>(lx: usize, ly: usize, seed: f64) -> Array2<Complex<T>> {
    Array2::from_shape_fn((lx, ly), |(x, y)| {
        let t = seed + 0.37 * x as f64 + 0.91 * y as f64;
        Complex::new(lit(t.sin() + 0.2), lit((1.3 * t).cos() * 0.5))
    })
}

#[test]
fn test_normalize_2d_f64() {
    use approx::assert_abs_diff_eq;

    let mut grid = test_field::<f64>(8, 8, 0.0);
    let before = norm(&grid);
    let returned = normalize(&mut grid).unwrap();

    assert_abs_diff_eq!(returned, before, epsilon = 1e-12);
    assert_abs_diff_eq!(norm(&grid), 1.0, epsilon = 1e-9);
    assert!(check_norm(&grid, 1e-9));
}

#[test]
fn test_normalize_2d_f32() {
    use approx::assert_abs_diff_eq;

    let values = [Complex::<f32>::new(1.0, 1.0); 64];
    let mut grid = Array2::from_shape_vec((8, 8), values.to_vec()).unwrap();
    normalize(&mut grid).unwrap();

    assert_abs_diff_eq!(norm(&grid), 1.0, epsilon = 1e-6);
    assert!(check_norm(&grid, 1e-5));
}

#[test]
fn test_normalize_is_idempotent() {
    use approx::assert_abs_diff_eq;

    let once = normalized(&test_field::<f64>(7, 5, 1.5)).unwrap();
    let twice = normalized(&once).unwrap();
    for (a, b) in once.iter().zip(twice.iter()) {
        assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
        assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
    }
}

#[test]
fn test_normalize_rejects_degenerate_grids() {
    let mut zeros = complex_constant(Complex::<f64>::zero(), (4, 4));
    assert!(matches!(normalize(&mut zeros), Err(RuntimeError::ZeroNorm)));

    let mut blown_up = test_field::<f64>(4, 4, 0.0);
    blown_up[[1, 2]] = Complex::new(f64::NAN, 0.0);
    let snapshot = blown_up.clone();
    assert!(matches!(normalize(&mut blown_up), Err(RuntimeError::NanOrInf)));
    assert!(!check_complex_for_nans(&blown_up));
    assert_eq!(blown_up[[0, 0]], snapshot[[0, 0]]);
}

#[test]
fn test_over_i_twice_negates() {
    let grid = test_field::<f64>(6, 9, 0.3);
    let once = over_i(&grid);
    assert_eq!(once[[2, 3]], Complex::new(grid[[2, 3]].im, -grid[[2, 3]].re));

    let twice = over_i(&once);
    for (a, b) in twice.iter().zip(grid.iter()) {
        assert_eq!(*a, -*b);
    }
}

#[test]
fn test_over_i_is_division_by_i() {
    let grid = test_field::<f64>(3, 3, 2.0);
    let i = Complex::new(0.0, 1.0);
    for (a, b) in over_i(&grid).iter().zip(grid.iter()) {
        let expected = b / i;
        assert!((a - expected).norm() < 1e-14);
    }
}

#[test]
fn test_amplitude() {
    let mut grid = complex_constant(Complex::<f64>::zero(), (2, 3));
    grid[[1, 2]] = Complex::new(3.0, 4.0);
    let amp = amplitude(&grid);
    assert_eq!(amp[[1, 2]], 25.0);
    assert_eq!(amp.sum(), 25.0);
}

#[test]
fn test_laplacian_impulse_weights() {
    let (lx, ly) = (11, 9);
    let mut grid = complex_constant(Complex::<f64>::zero(), (lx, ly));
    grid[[5, 4]] = Complex::new(1.0, -2.0);

    for boundary in [
        BoundaryCondition::ZeroPad,
        BoundaryCondition::Replicate,
        BoundaryCondition::Reflect,
    ] {
        let lap = laplacian(&grid, 1.0, boundary);
        for ((x, y), value) in lap.indexed_iter() {
            let expected = match (x, y) {
                (5, 4) => Complex::new(-4.0, 8.0),
                (4, 4) | (6, 4) | (5, 3) | (5, 5) => Complex::new(1.0, -2.0),
                _ => Complex::zero(),
            };
            assert_eq!(*value, expected, "cell ({x}, {y}) with {boundary:?}");
        }
    }
}

#[test]
fn test_laplacian_scales_with_dx() {
    let mut grid = complex_constant(Complex::<f64>::zero(), (5, 5));
    grid[[2, 2]] = Complex::new(1.0, 0.0);
    let lap = laplacian(&grid, 0.5, BoundaryCondition::ZeroPad);
    assert_eq!(lap[[2, 2]], Complex::new(-16.0, 0.0));
    assert_eq!(lap[[1, 2]], Complex::new(4.0, 0.0));
}

#[test]
fn test_laplacian_is_linear() {
    let f1 = test_field::<f64>(9, 7, 0.0);
    let f2 = test_field::<f64>(9, 7, 4.2);
    let (a, b) = (Complex::new(0.7, -1.1), Complex::new(-2.5, 0.4));

    for boundary in [
        BoundaryCondition::ZeroPad,
        BoundaryCondition::Replicate,
        BoundaryCondition::Reflect,
    ] {
        let combined = Zip::from(&f1).and(&f2).map_collect(|&u, &v| a * u + b * v);
        let lhs = laplacian(&combined, 1.0, boundary);
        let l1 = laplacian(&f1, 1.0, boundary);
        let l2 = laplacian(&f2, 1.0, boundary);
        for ((l, u), v) in lhs.iter().zip(l1.iter()).zip(l2.iter()) {
            assert!((l - (a * u + b * v)).norm() < 1e-12);
        }
    }
}

#[test]
fn test_boundary_policies_only_differ_at_edges() {
    let grid = test_field::<f64>(6, 6, 0.8);
    let zero = laplacian(&grid, 1.0, BoundaryCondition::ZeroPad);
    let replicate = laplacian(&grid, 1.0, BoundaryCondition::Replicate);
    let reflect = laplacian(&grid, 1.0, BoundaryCondition::Reflect);

    for x in 1..5 {
        for y in 1..5 {
            assert_eq!(zero[[x, y]], replicate[[x, y]]);
            assert_eq!(zero[[x, y]], reflect[[x, y]]);
        }
    }

    // Corner (0, 0): zero pad drops both outer neighbours, replicate reuses the
    // corner itself, reflect reuses the cells at index 1.
    let c = grid[[0, 0]];
    let (down, right) = (grid[[1, 0]], grid[[0, 1]]);
    let four = Complex::new(4.0, 0.0);
    assert!((zero[[0, 0]] - (down + right - four * c)).norm() < 1e-12);
    assert!((replicate[[0, 0]] - (down + right + c + c - four * c)).norm() < 1e-12);
    assert!((reflect[[0, 0]] - (down + right + down + right - four * c)).norm() < 1e-12);
}

#[test]
fn test_resolve_reflect_single_cell() {
    assert_eq!(resolve(-1, 1, BoundaryCondition::Reflect), Some(0));
    assert_eq!(resolve(5, 5, BoundaryCondition::Reflect), Some(3));
    assert_eq!(resolve(-1, 5, BoundaryCondition::Replicate), Some(0));
    assert_eq!(resolve(5, 5, BoundaryCondition::ZeroPad), None);
}
