use crate::{
    ics,
    integrator::Integrator,
    utils::{
        complex::{lit, WaveFloat},
        error::RuntimeError,
        grid::{amplitude, check_complex_for_nans},
    },
};
use ndarray::Array2;
use num::Complex;
use qwave_common::{
    wall_clock, BoundaryCondition, DissipationParameters, InitialConditions, PotentialParameters,
    TomlParameters,
};
use std::fmt::Display;
use std::time::Duration;

/// This struct holds the wavefunction and the static fields it evolves in
pub struct SimulationGrid<T> {
    /// The array which stores the wavefunction
    pub ψ: Array2<Complex<T>>,

    /// Potential, fixed at setup
    pub v: Array2<T>,

    /// Dissipation, fixed at setup
    pub b: Array2<T>,
}

/// This `Parameters` struct stores simulations parameters
#[derive(Clone, Debug)]
pub struct SimulationParameters<T> {
    // Grid Parameters
    /// Number of cells along x
    pub lx: usize,
    /// Number of cells along y
    pub ly: usize,
    /// Spatial cell size
    pub dx: T,
    /// Edge handling of the laplacian
    pub boundary: BoundaryCondition,

    // Temporal Parameters
    /// Current simulation time
    pub time: T,
    /// Simulated time at which the run stops, if any
    pub final_sim_time: Option<T>,
    /// Timestep
    pub dt: T,

    // Physical Parameters
    pub hbar: T,
    pub mass: T,

    // Display Parameters
    /// Target frame rate
    pub fps: f64,
    /// Minimum wall-clock time between drawn frames, `1 / fps`
    pub frame_interval: Duration,
    /// Minimum wall-clock duration of one loop iteration
    pub pacing_interval: Duration,
    /// Upscaling factor of displayed frames
    pub display_scale: u32,
    /// Optional gif the displayed frames are appended to
    pub record: Option<String>,

    // Setup
    pub ics: InitialConditions,
    pub potential: PotentialParameters,
    pub dissipation: DissipationParameters,

    // Metadata
    /// Simulation name
    pub sim_name: String,
}

/// Validates the toml and converts it into `SimulationParameters`.
/// When no pacing interval is given, `dt` is reused as seconds of wall-clock time.
pub fn parameters_from_toml<T: WaveFloat>(
    toml: TomlParameters,
) -> Result<SimulationParameters<T>, RuntimeError> {
    toml.validate()?;

    let [lx, ly] = toml.size;
    let frame_interval = wall_clock("fps", toml.fps.recip())?;
    let pacing_interval = wall_clock("pacing_interval", toml.pacing_interval.unwrap_or(toml.dt))?;
    Ok(SimulationParameters {
        lx,
        ly,
        dx: lit(toml.dx),
        boundary: toml.boundary,
        time: T::zero(),
        final_sim_time: toml.final_sim_time.map(lit),
        dt: lit(toml.dt),
        hbar: lit(toml.hbar),
        mass: lit(toml.mass),
        fps: toml.fps,
        frame_interval,
        pacing_interval,
        display_scale: toml.display_scale,
        record: toml.record,
        ics: toml.ics,
        potential: toml.potential,
        dissipation: toml.dissipation,
        sim_name: toml.sim_name,
    })
}

impl<T: Display> Display for SimulationParameters<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, "sim_name        = {}", self.sim_name)?;
        writeln!(f, "grid            = {} x {}", self.lx, self.ly)?;
        writeln!(f, "dx              = {}", self.dx)?;
        writeln!(f, "boundary        = {:?}", self.boundary)?;
        writeln!(f, "dt              = {}", self.dt)?;
        writeln!(f, "current_time    = {}", self.time)?;
        match &self.final_sim_time {
            Some(t) => writeln!(f, "final_sim_time  = {t}")?,
            None => writeln!(f, "final_sim_time  = none")?,
        }
        writeln!(f, "hbar            = {}", self.hbar)?;
        writeln!(f, "mass            = {}", self.mass)?;
        writeln!(f, "fps             = {}", self.fps)?;
        writeln!(f, "pacing_interval = {:?}", self.pacing_interval)?;
        writeln!(f, "display_scale   = {}", self.display_scale)?;
        match &self.potential.walls {
            Some(walls) => writeln!(f, "walls           = {}", walls.len())?,
            None => writeln!(f, "walls           = double slit")?,
        }
        writeln!(f, "border          = {} cells", self.dissipation.thickness)?;
        if let Some(path) = &self.record {
            writeln!(f, "record          = {path}")?;
        }
        writeln!(f, "{}", "-".repeat(40))?;
        Ok(())
    }
}

/// This stores a `SimulationGrid` which has the wavefunction, potential and dissipation,
/// the `SimulationParameters`, and the integrator that advances the grid.
pub struct SimulationObject<T> {
    /// This has the wavefunction and the static fields
    pub grid: SimulationGrid<T>,

    /// This has the simulation parameters
    pub parameters: SimulationParameters<T>,

    /// Steps taken so far
    pub steps: u64,

    integrator: Integrator<T>,
}

impl<T: WaveFloat> SimulationObject<T> {
    /// Builds the initial wavefunction, potential and dissipation described by `parameters`
    pub fn new_from_params(parameters: SimulationParameters<T>) -> Result<Self, RuntimeError> {
        let (lx, ly) = (parameters.lx, parameters.ly);
        let ψ = ics::wavefunction(&parameters.ics, lx, ly)?;
        let v = ics::potential(&parameters.potential, lx, ly);
        let b = ics::dissipation(&parameters.dissipation, lx, ly);
        Self::new(SimulationGrid { ψ, v, b }, parameters)
    }

    /// Fails on mismatched shapes or a non-finite wavefunction
    pub fn new(
        grid: SimulationGrid<T>,
        parameters: SimulationParameters<T>,
    ) -> Result<Self, RuntimeError> {
        let expected = (parameters.lx, parameters.ly);
        for found in [grid.ψ.dim(), grid.v.dim(), grid.b.dim()] {
            if found != expected {
                return Err(RuntimeError::ShapeMismatch { expected, found });
            }
        }
        if !check_complex_for_nans(&grid.ψ) {
            return Err(RuntimeError::NanOrInf);
        }
        let integrator = Integrator::new(
            parameters.hbar,
            parameters.mass,
            parameters.dt,
            parameters.dx,
            parameters.boundary,
        )?;
        Ok(SimulationObject {
            grid,
            parameters,
            steps: 0,
            integrator,
        })
    }

    /// This function advances the wavefunction by one timestep
    pub fn update(&mut self) -> Result<(), RuntimeError> {
        self.integrator
            .step(&mut self.grid.ψ, &self.grid.v, &self.grid.b)?;
        self.parameters.time = self.parameters.time + self.parameters.dt;
        self.steps += 1;
        log::trace!("step {} at t = {}", self.steps, self.parameters.time);
        Ok(())
    }

    pub fn not_finished(&self) -> bool {
        match self.parameters.final_sim_time {
            Some(final_time) => self.parameters.time < final_time,
            None => true,
        }
    }

    pub fn integrator(&self) -> &Integrator<T> {
        &self.integrator
    }

    /// Largest |ψ|^2 on the grid
    pub fn peak_amplitude(&self) -> T {
        amplitude(&self.grid.ψ)
            .iter()
            .fold(T::zero(), |acc, &a| acc.max(a))
    }
}

#[cfg(test)]
fn small_toml() -> TomlParameters {
    TomlParameters {
        size: [24, 24],
        dissipation: DissipationParameters {
            thickness: 4,
            ..Default::default()
        },
        potential: PotentialParameters {
            walls: Some(vec![]),
        },
        ..Default::default()
    }
}

#[test]
fn test_new_sim_parameters() {
    let params = parameters_from_toml::<f64>(TomlParameters::default()).unwrap();
    assert_eq!((params.lx, params.ly), (50, 50));
    assert_eq!(params.dt, 1e-4);
    assert_eq!(params.pacing_interval, Duration::from_secs_f64(1e-4));
    assert_eq!(params.time, 0.0);
    println!("{}", params);
}

#[test]
fn test_pacing_interval_is_independent_of_dt() {
    let toml = TomlParameters {
        pacing_interval: Some(0.0),
        ..Default::default()
    };
    let params = parameters_from_toml::<f64>(toml).unwrap();
    assert_eq!(params.pacing_interval, Duration::ZERO);
    assert_eq!(params.dt, 1e-4);
    assert_eq!(params.frame_interval, Duration::from_secs_f64(1.0 / 30.0));
}

#[test]
fn test_parameters_from_invalid_toml() {
    let toml = TomlParameters {
        fps: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        parameters_from_toml::<f64>(toml),
        Err(RuntimeError::TomlReadError { .. })
    ));

    // 1 / fps does not fit a Duration
    let toml = TomlParameters {
        fps: 1e-300,
        ..Default::default()
    };
    assert!(parameters_from_toml::<f64>(toml).is_err());
}

#[test]
fn test_reference_simulation_object() {
    use crate::utils::grid::check_norm;

    let params = parameters_from_toml::<f64>(TomlParameters::default()).unwrap();
    let simulation_object = SimulationObject::new_from_params(params).unwrap();
    assert!(check_norm(&simulation_object.grid.ψ, 1e-9));
    assert_eq!(simulation_object.grid.v[[0, 20]], 50.0);
    assert_eq!(simulation_object.grid.b[[25, 49]], 0.0);
    assert_eq!(simulation_object.integrator().alpha(), -5.0);
}

#[test]
fn test_update_advances_clock() {
    use crate::utils::grid::check_norm;
    use approx::assert_abs_diff_eq;

    let toml = TomlParameters {
        final_sim_time: Some(3.5e-4),
        ..small_toml()
    };
    let params = parameters_from_toml::<f64>(toml).unwrap();
    let mut simulation_object = SimulationObject::new_from_params(params).unwrap();

    let mut steps = 0;
    while simulation_object.not_finished() {
        simulation_object.update().unwrap();
        assert!(check_norm(&simulation_object.grid.ψ, 1e-9));
        steps += 1;
    }
    assert_eq!(steps, 4);
    assert_eq!(simulation_object.steps, 4);
    assert_abs_diff_eq!(simulation_object.parameters.time, 4e-4, epsilon = 1e-12);
    assert!(simulation_object.peak_amplitude() > 0.0);
}

#[test]
fn test_new_rejects_mismatched_fields() {
    let params = parameters_from_toml::<f64>(small_toml()).unwrap();
    let grid = SimulationGrid {
        ψ: Array2::from_elem((24, 24), Complex::new(1.0 / 24.0, 0.0)),
        v: Array2::zeros((24, 24)),
        b: Array2::zeros((24, 23)),
    };
    assert!(matches!(
        SimulationObject::new(grid, params),
        Err(RuntimeError::ShapeMismatch {
            expected: (24, 24),
            found: (24, 23)
        })
    ));
}

#[test]
fn test_new_rejects_non_finite_wavefunction() {
    let params = parameters_from_toml::<f64>(small_toml()).unwrap();
    let mut ψ = Array2::from_elem((24, 24), Complex::new(1.0 / 24.0, 0.0));
    ψ[[3, 7]] = Complex::new(0.0, f64::INFINITY);
    let grid = SimulationGrid {
        ψ,
        v: Array2::zeros((24, 24)),
        b: Array2::zeros((24, 24)),
    };
    assert!(matches!(
        SimulationObject::new(grid, params),
        Err(RuntimeError::NanOrInf)
    ));
}
