use crate::utils::{
    complex::{lit, WaveFloat},
    error::RuntimeError,
    grid::normalize,
};
use ndarray::{s, Array2};
use num::Complex;
use qwave_common::{DissipationParameters, InitialConditions, PotentialParameters};

/// This function produces the normalized initial wavefunction on an `lx` by `ly` grid.
/// Coordinates are cell indices.
pub fn wavefunction<T: WaveFloat>(
    ics: &InitialConditions,
    lx: usize,
    ly: usize,
) -> Result<Array2<Complex<T>>, RuntimeError> {
    let mut ψ = match *ics {
        InitialConditions::GaussianPacket {
            center,
            stiffness,
            momentum,
        } => {
            let [cx, cy] = center.unwrap_or([lx as f64 / 2.0, ly as f64 / 5.0]);
            gaussian_packet(lx, ly, [lit(cx), lit(cy)], lit(stiffness), lit(momentum))
        }
        InitialConditions::PlaneWave { wavevector } => {
            plane_wave(lx, ly, [lit(wavevector[0]), lit(wavevector[1])])
        }
    };
    normalize(&mut ψ)?;
    Ok(ψ)
}

/// exp(-0.5 * sqrt(s(x-cx)^2 + s(y-cy)^2 - i k y)), principal branch of the square root
pub fn gaussian_packet<T: WaveFloat>(
    lx: usize,
    ly: usize,
    center: [T; 2],
    stiffness: T,
    momentum: T,
) -> Array2<Complex<T>> {
    let half: T = lit(-0.5);
    Array2::from_shape_fn((lx, ly), |(x, y)| {
        let x = T::from_usize(x).unwrap_or_else(T::nan);
        let y = T::from_usize(y).unwrap_or_else(T::nan);
        let r2 = stiffness * (x - center[0]).powi(2) + stiffness * (y - center[1]).powi(2);
        Complex::new(r2, -momentum * y).sqrt().scale(half).exp()
    })
}

/// exp(i (kx x + ky y))
pub fn plane_wave<T: WaveFloat>(lx: usize, ly: usize, wavevector: [T; 2]) -> Array2<Complex<T>> {
    Array2::from_shape_fn((lx, ly), |(x, y)| {
        let x = T::from_usize(x).unwrap_or_else(T::nan);
        let y = T::from_usize(y).unwrap_or_else(T::nan);
        Complex::from_polar(T::one(), wavevector[0] * x + wavevector[1] * y)
    })
}

/// Zero everywhere except the configured walls, or the double slit if none are configured
pub fn potential<T: WaveFloat>(params: &PotentialParameters, lx: usize, ly: usize) -> Array2<T> {
    let mut v = Array2::<T>::zeros((lx, ly));
    for wall in params.walls_for(lx, ly) {
        let [x0, x1] = clamp_range(wall.rows, lx);
        let [y0, y1] = clamp_range(wall.columns, ly);
        v.slice_mut(s![x0..x1, y0..y1]).fill(lit(wall.height));
    }
    v
}

fn clamp_range([start, end]: [usize; 2], len: usize) -> [usize; 2] {
    let end = end.min(len);
    [start.min(end), end]
}

/// Absorbing border: a cubic ramp `peak * (i / thickness)^3` written `thickness - 1 - i`
/// cells in from every enabled edge, in the order top, bottom, left, right (later writes win).
/// Top and bottom bands only cover the first `span_for(ly)` columns.
pub fn dissipation<T: WaveFloat>(params: &DissipationParameters, lx: usize, ly: usize) -> Array2<T> {
    let mut b = Array2::<T>::zeros((lx, ly));
    let thickness = params.thickness.min(lx).min(ly);
    let span = params.span_for(ly);
    let edges = params.edges;

    for i in 0..thickness {
        let ramp: T = lit(params.peak * (i as f64 / params.thickness as f64).powi(3));
        let depth = thickness - 1 - i;
        if edges.top {
            b.slice_mut(s![depth, ..span]).fill(ramp);
        }
        if edges.bottom {
            b.slice_mut(s![lx - 1 - depth, ..span]).fill(ramp);
        }
        if edges.left {
            b.column_mut(depth).fill(ramp);
        }
        if edges.right {
            b.column_mut(ly - 1 - depth).fill(ramp);
        }
    }
    b
}

#[test]
fn test_gaussian_packet_is_normalized_and_centered() {
    use crate::utils::grid::{amplitude, check_norm};

    let ics = InitialConditions::GaussianPacket {
        center: None,
        stiffness: 5.0,
        momentum: 0.0,
    };
    let ψ = wavefunction::<f64>(&ics, 50, 50).unwrap();
    assert!(check_norm(&ψ, 1e-9));

    let amp = amplitude(&ψ);
    let (peak, _) = amp
        .indexed_iter()
        .fold(((0, 0), 0.0), |best, (idx, &a)| if a > best.1 { (idx, a) } else { best });
    assert_eq!(peak, (25, 10));
}

#[test]
fn test_gaussian_packet_matches_closed_form() {
    let ψ = gaussian_packet::<f64>(50, 50, [25.0, 10.0], 5.0, 100.0);
    let (x, y) = (23.0, 14.0);
    let z = Complex::new(5.0 * (x - 25.0_f64).powi(2) + 5.0 * (y - 10.0_f64).powi(2), -100.0 * y);
    let expected = (z.sqrt() * -0.5).exp();
    assert!((ψ[[23, 14]] - expected).norm() < 1e-15);
    // momentum gives the packet a nonzero phase
    assert!(ψ[[23, 14]].im.abs() > 0.0);
}

#[test]
fn test_plane_wave_has_unit_modulus_before_normalization() {
    let ψ = plane_wave::<f64>(4, 6, [0.3, -0.2]);
    assert!(ψ.iter().all(|c| (c.norm() - 1.0).abs() < 1e-14));
    assert!((ψ[[2, 3]].arg() - (0.6 - 0.6)).abs() < 1e-14);
}

#[test]
fn test_reference_potential() {
    let v = potential::<f64>(&PotentialParameters::default(), 50, 50);
    assert_eq!(v.sum(), 50.0 * 2.0 * (18 + 7 + 17) as f64);
    assert_eq!(v[[0, 20]], 50.0);
    assert_eq!(v[[17, 21]], 50.0);
    // slits
    assert_eq!(v[[18, 20]], 0.0);
    assert_eq!(v[[30, 21]], 0.0);
    assert_eq!(v[[49, 21]], 50.0);
    assert_eq!(v[[10, 22]], 0.0);
}

#[test]
fn test_potential_walls_are_clamped() {
    use qwave_common::Wall;

    let params = PotentialParameters {
        walls: Some(vec![Wall {
            rows: [3, 100],
            columns: [90, 120],
            height: 1.0,
        }]),
    };
    let v = potential::<f64>(&params, 10, 10);
    assert_eq!(v.sum(), 0.0);
}

#[test]
fn test_double_slit_follows_grid_size() {
    let v = potential::<f64>(&PotentialParameters::default(), 100, 100);
    // band moves to int(100 / 2.5) and the last segment reaches the far edge
    assert_eq!(v[[70, 40]], 50.0);
    assert_eq!(v[[99, 41]], 50.0);
    assert_eq!(v[[70, 20]], 0.0);
    assert_eq!(v[[20, 40]], 0.0);
    assert_eq!(v.sum(), 50.0 * 2.0 * (18 + 7 + 67) as f64);

    let b = dissipation::<f64>(&DissipationParameters::default(), 100, 100);
    let ramp = |i: usize| 100.0 * (i as f64 / 10.0).powi(3);
    assert_eq!(b[[0, 30]], ramp(9));
    assert_eq!(b[[99, 39]], ramp(9));
    assert_eq!(b[[0, 40]], 0.0);
}

#[test]
fn test_reference_dissipation_profile() {
    let params = DissipationParameters::default();
    let b = dissipation::<f64>(&params, 50, 50);
    let ramp = |i: usize| 100.0 * (i as f64 / 10.0).powi(3);

    // left border covers every row
    assert_eq!(b[[25, 0]], ramp(9));
    assert_eq!(b[[25, 9]], ramp(0));
    assert_eq!(b[[25, 3]], ramp(6));
    // top and bottom bands stop at the wall band
    assert_eq!(b[[0, 15]], ramp(9));
    assert_eq!(b[[49, 15]], ramp(9));
    assert_eq!(b[[47, 19]], ramp(7));
    assert_eq!(b[[0, 20]], 0.0);
    assert_eq!(b[[49, 35]], 0.0);
    // interior
    assert_eq!(b[[25, 25]], 0.0);
}

#[test]
fn test_right_edge_has_no_dissipation_by_default() {
    let b = dissipation::<f64>(&DissipationParameters::default(), 50, 50);
    assert!(b.column(49).iter().all(|&x| x == 0.0));
    assert!(b.column(0).iter().all(|&x| x > 0.0));

    let mut params = DissipationParameters::default();
    params.edges.right = true;
    let b = dissipation::<f64>(&params, 50, 50);
    assert!(b.column(49).iter().all(|&x| x > 0.0));
}

#[test]
fn test_dissipation_later_writes_win() {
    // Row 0 is written at i = 9 and overwrites the left band value written
    // earlier for the columns it covers.
    let b = dissipation::<f64>(&DissipationParameters::default(), 50, 50);
    let ramp = |i: usize| 100.0 * (i as f64 / 10.0).powi(3);
    assert_eq!(b[[0, 5]], ramp(9));
    // Row 5 (i = 4) is overwritten by column 0 (i = 9)
    assert_eq!(b[[5, 0]], ramp(9));
    // Row 5 keeps its value for columns whose left band index is lower
    assert_eq!(b[[5, 8]], ramp(4));
}
