use crate::utils::{
    complex::{lit, WaveFloat},
    error::RuntimeError,
    grid::{laplacian, normalize, over_i},
};
use ndarray::{Array2, Zip};
use num::Complex;
use qwave_common::{BoundaryCondition, CommonError};

/// Explicit Euler integrator for the dissipative Schrödinger equation with
/// hamiltonian H = alpha ∇² + V + i ħ B, alpha = -ħ²/(2m).
#[derive(Clone, Debug)]
pub struct Integrator<T> {
    pub hbar: T,
    pub mass: T,
    /// Timestep
    pub dt: T,
    /// Spatial cell size
    pub dx: T,
    pub boundary: BoundaryCondition,
}

impl<T: WaveFloat> Integrator<T> {
    pub fn new(
        hbar: T,
        mass: T,
        dt: T,
        dx: T,
        boundary: BoundaryCondition,
    ) -> Result<Self, RuntimeError> {
        let invalid = |name: &'static str, value: T| CommonError::InvalidParameter {
            name,
            msg: format!("got {value}"),
        };
        if !(dt > T::zero() && dt.is_finite()) {
            return Err(invalid("dt", dt).into());
        }
        if !(dx > T::zero() && dx.is_finite()) {
            return Err(invalid("dx", dx).into());
        }
        if hbar == T::zero() || !hbar.is_finite() {
            return Err(invalid("hbar", hbar).into());
        }
        if mass == T::zero() || !mass.is_finite() {
            return Err(invalid("mass", mass).into());
        }
        Ok(Integrator {
            hbar,
            mass,
            dt,
            dx,
            boundary,
        })
    }

    /// Coefficient of the laplacian, -ħ²/(2m)
    pub fn alpha(&self) -> T {
        -self.hbar * self.hbar / (lit::<T>(2.0) * self.mass)
    }

    /// dψ/dt = ((alpha ∇²ψ + Vψ) / ħ) / i - Bψ
    pub fn derivative(
        &self,
        ψ: &Array2<Complex<T>>,
        v: &Array2<T>,
        b: &Array2<T>,
    ) -> Array2<Complex<T>> {
        let alpha = self.alpha();
        let hbar = self.hbar;

        let mut energy = laplacian(ψ, self.dx, self.boundary);
        Zip::from(&mut energy)
            .and(ψ)
            .and(v)
            .for_each(|h, &ψ, &v| *h = (h.scale(alpha) + ψ.scale(v)).unscale(hbar));

        let mut dψdt = over_i(&energy);
        Zip::from(&mut dψdt)
            .and(ψ)
            .and(b)
            .for_each(|d, &ψ, &b| *d = *d - ψ.scale(b));
        dψdt
    }

    /// ψ += dψ/dt * dt, without renormalizing
    pub fn advance(
        &self,
        ψ: &mut Array2<Complex<T>>,
        v: &Array2<T>,
        b: &Array2<T>,
    ) -> Result<(), RuntimeError> {
        check_shape(ψ.dim(), v.dim())?;
        check_shape(ψ.dim(), b.dim())?;

        let dψdt = self.derivative(ψ, v, b);
        let dt = self.dt;
        Zip::from(ψ)
            .and(&dψdt)
            .for_each(|ψ, &d| *ψ = *ψ + d.scale(dt));
        Ok(())
    }

    /// One full step: Euler update followed by renormalization to unit norm.
    /// Fails if the norm blew up or vanished.
    pub fn step(
        &self,
        ψ: &mut Array2<Complex<T>>,
        v: &Array2<T>,
        b: &Array2<T>,
    ) -> Result<(), RuntimeError> {
        self.advance(ψ, v, b)?;
        normalize(ψ)?;
        Ok(())
    }
}

fn check_shape(expected: (usize, usize), found: (usize, usize)) -> Result<(), RuntimeError> {
    if expected == found {
        Ok(())
    } else {
        Err(RuntimeError::ShapeMismatch { expected, found })
    }
}

#[cfg(test)]
fn reference_integrator() -> Integrator<f64> {
    Integrator::new(1.0, 0.1, 1e-4, 1.0, BoundaryCondition::ZeroPad).unwrap()
}

#[test]
fn test_alpha() {
    assert_eq!(reference_integrator().alpha(), -5.0);
}

#[test]
fn test_new_rejects_bad_constants() {
    let integrator = Integrator::<f64>::new(1.0, 0.1, -1e-4, 1.0, BoundaryCondition::ZeroPad);
    assert!(matches!(
        integrator,
        Err(RuntimeError::TomlReadError {
            err: CommonError::InvalidParameter { name: "dt", .. }
        })
    ));
    assert!(Integrator::<f64>::new(1.0, 0.0, 1e-4, 1.0, BoundaryCondition::ZeroPad).is_err());
    assert!(Integrator::<f64>::new(0.0, 0.1, 1e-4, 1.0, BoundaryCondition::ZeroPad).is_err());
}

#[test]
fn test_derivative_of_impulse_touches_only_stencil() {
    use crate::utils::complex::complex_constant;
    use num::Zero;

    let integrator = reference_integrator();
    let mut ψ = complex_constant(Complex::<f64>::zero(), (9, 9));
    ψ[[4, 4]] = Complex::new(1.0, 0.0);
    let zeros = Array2::<f64>::zeros((9, 9));

    let dψdt = integrator.derivative(&ψ, &zeros, &zeros);
    // alpha ∇²ψ / ħ is real here: -4 alpha at the center, alpha at the neighbours.
    // Dividing by i moves it to the imaginary part with a sign flip.
    for ((x, y), d) in dψdt.indexed_iter() {
        let expected = match (x, y) {
            (4, 4) => Complex::new(0.0, -20.0),
            (3, 4) | (5, 4) | (4, 3) | (4, 5) => Complex::new(0.0, 5.0),
            _ => Complex::zero(),
        };
        assert!((d - expected).norm() < 1e-12, "cell ({x}, {y}): {d}");
    }
}

#[test]
fn test_derivative_potential_and_dissipation_terms() {
    let integrator = reference_integrator();
    let ψ = Array2::from_elem((1, 1), Complex::new(0.6, 0.8));
    let v = Array2::from_elem((1, 1), 2.0);
    let b = Array2::from_elem((1, 1), 3.0);

    // Single cell grid: laplacian is -4ψ with zero padding.
    let energy = ψ[[0, 0]] * (-5.0 * -4.0 + 2.0);
    let expected = energy / Complex::new(0.0, 1.0) - ψ[[0, 0]] * 3.0;
    let dψdt = integrator.derivative(&ψ, &v, &b);
    assert!((dψdt[[0, 0]] - expected).norm() < 1e-12);
}

#[test]
fn test_step_restores_unit_norm() {
    use crate::ics::gaussian_packet;
    use crate::utils::grid::{check_norm, norm};
    use approx::assert_abs_diff_eq;

    let integrator = reference_integrator();
    // deliberately not normalized
    let mut ψ = gaussian_packet::<f64>(20, 20, [10.0, 10.0], 5.0, 0.0);
    ψ.mapv_inplace(|c| c * 10.0);
    assert!(norm(&ψ) > 5.0);
    let v = Array2::from_shape_fn((20, 20), |(x, _)| if x < 3 { 50.0 } else { 0.0 });
    let b = Array2::from_shape_fn((20, 20), |(_, y)| y as f64);

    for _ in 0..5 {
        integrator.step(&mut ψ, &v, &b).unwrap();
        assert_abs_diff_eq!(norm(&ψ), 1.0, epsilon = 1e-12);
        assert!(check_norm(&ψ, 1e-9));
    }
}

#[test]
fn test_step_rejects_mismatched_grids() {
    let integrator = reference_integrator();
    let mut ψ = Array2::from_elem((4, 4), Complex::new(0.25, 0.0));
    let v = Array2::zeros((4, 5));
    let b = Array2::zeros((4, 4));
    assert!(matches!(
        integrator.step(&mut ψ, &v, &b),
        Err(RuntimeError::ShapeMismatch {
            expected: (4, 4),
            found: (4, 5)
        })
    ));
}

#[test]
fn test_step_reports_blow_up() {
    let integrator = reference_integrator();
    let mut ψ = Array2::from_elem((3, 3), Complex::new(1.0, 0.0));
    ψ[[1, 1]] = Complex::new(f64::INFINITY, 0.0);
    let zeros = Array2::zeros((3, 3));
    assert!(integrator.step(&mut ψ, &zeros, &zeros).is_err());
}
