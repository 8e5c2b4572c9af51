use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    constants::*,
    error::CommonError,
    ics::{BoundaryCondition, InitialConditions},
};

/// Simulation parameters as read from a toml file. Every field is optional;
/// missing fields take the values of the reference double slit run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TomlParameters {
    /// Name of simulation (used for logs and window titles)
    pub sim_name: String,
    /// Number of grid cells along x and y
    pub size: [usize; 2],
    /// Spatial cell size
    pub dx: f64,
    /// Integration timestep (simulated time)
    pub dt: f64,
    /// Minimum wall-clock seconds per loop iteration. Defaults to `dt`.
    pub pacing_interval: Option<f64>,
    /// Stop once the simulated time reaches this value. Runs until quit if omitted.
    pub final_sim_time: Option<f64>,
    /// Reduced Planck constant
    pub hbar: f64,
    /// Particle mass
    pub mass: f64,
    /// Target display frame rate
    pub fps: f64,
    /// Upscaling factor of displayed frames
    pub display_scale: u32,
    /// Edge handling of the laplacian
    pub boundary: BoundaryCondition,
    /// Initial Conditions
    pub ics: InitialConditions,
    /// Potential walls
    pub potential: PotentialParameters,
    /// Absorbing border
    pub dissipation: DissipationParameters,
    /// If set, displayed frames are appended to an animated gif at this path
    pub record: Option<String>,
}

impl Default for TomlParameters {
    fn default() -> Self {
        TomlParameters {
            sim_name: "double-slit".to_string(),
            size: GRID_SIZE,
            dx: 1.0,
            dt: DT,
            pacing_interval: None,
            final_sim_time: None,
            hbar: HBAR,
            mass: MASS,
            fps: FPS,
            display_scale: DISPLAY_SCALE,
            boundary: BoundaryCondition::default(),
            ics: InitialConditions::default(),
            potential: PotentialParameters::default(),
            dissipation: DissipationParameters::default(),
            record: None,
        }
    }
}

/// A rectangle of constant potential. Ranges are half-open cell indices and
/// are clamped to the grid.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Wall {
    /// `[start, end)` along x
    pub rows: [usize; 2],
    /// `[start, end)` along y
    pub columns: [usize; 2],
    pub height: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PotentialParameters {
    /// Explicit walls. When omitted, the double slit is laid out on the configured grid.
    pub walls: Option<Vec<Wall>>,
}

impl PotentialParameters {
    /// The walls to place on an `lx` by `ly` grid
    pub fn walls_for(&self, lx: usize, ly: usize) -> Vec<Wall> {
        match &self.walls {
            Some(walls) => walls.clone(),
            None => double_slit(lx, ly),
        }
    }
}

/// Three wall segments on a two cell wide band starting at `wall_band_start(ly)`,
/// leaving the slits at rows 18..22 and 29..33 open. The last segment runs to the edge.
pub fn double_slit(lx: usize, ly: usize) -> Vec<Wall> {
    let band_start = wall_band_start(ly);
    let columns = [band_start, band_start + 2];
    [[0, 18], [22, 29], [33, lx]]
        .into_iter()
        .map(|rows| Wall {
            rows,
            columns,
            height: WALL_HEIGHT,
        })
        .collect()
}

/// First column of the slit wall, `int(ly / 2.5)`
pub fn wall_band_start(ly: usize) -> usize {
    (ly as f64 / WALL_BAND_DIVISOR) as usize
}

/// Which edges of the grid carry an absorbing border
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BorderEdges {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Default for BorderEdges {
    /// The right edge is left open in the reference run.
    fn default() -> Self {
        BorderEdges {
            top: true,
            bottom: true,
            left: true,
            right: false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DissipationParameters {
    /// Width of the border in cells
    pub thickness: usize,
    /// Scale of the cubic ramp `peak * (i / thickness)^3`
    pub peak: f64,
    /// Number of leading columns covered by the top and bottom bands.
    /// `None` stops them at the slit wall, `wall_band_start(ly)`.
    pub span: Option<usize>,
    pub edges: BorderEdges,
}

impl Default for DissipationParameters {
    fn default() -> Self {
        DissipationParameters {
            thickness: BORDER_THICKNESS,
            peak: BORDER_PEAK,
            span: None,
            edges: BorderEdges::default(),
        }
    }
}

impl DissipationParameters {
    /// Columns covered by the top and bottom bands on a grid `ly` cells wide
    pub fn span_for(&self, ly: usize) -> usize {
        self.span.unwrap_or_else(|| wall_band_start(ly)).min(ly)
    }
}

impl TomlParameters {
    /// Rejects parameter sets the integrator or renderer cannot run with.
    pub fn validate(&self) -> Result<(), CommonError> {
        let [lx, ly] = self.size;
        if lx == 0 || ly == 0 {
            return Err(invalid("size", format!("grid must be nonempty, got {lx}x{ly}")));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(invalid("dt", format!("must be positive, got {}", self.dt)));
        }
        if !(self.dx > 0.0 && self.dx.is_finite()) {
            return Err(invalid("dx", format!("must be positive, got {}", self.dx)));
        }
        if let Some(interval) = self.pacing_interval {
            if !(interval >= 0.0 && interval.is_finite()) {
                return Err(invalid(
                    "pacing_interval",
                    format!("must be non-negative, got {interval}"),
                ));
            }
        }
        if self.hbar == 0.0 || !self.hbar.is_finite() {
            return Err(invalid("hbar", format!("must be nonzero, got {}", self.hbar)));
        }
        if self.mass == 0.0 || !self.mass.is_finite() {
            return Err(invalid("mass", format!("must be nonzero, got {}", self.mass)));
        }
        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(invalid("fps", format!("must be positive, got {}", self.fps)));
        }
        wall_clock("fps", self.fps.recip())?;
        wall_clock("pacing_interval", self.pacing_interval.unwrap_or(self.dt))?;
        if self.display_scale == 0 {
            return Err(invalid("display_scale", "must be at least 1".to_string()));
        }
        if self.dissipation.thickness > lx.min(ly) {
            return Err(invalid(
                "dissipation.thickness",
                format!(
                    "border of {} cells does not fit a {lx}x{ly} grid",
                    self.dissipation.thickness
                ),
            ));
        }
        Ok(())
    }
}

/// Converts seconds of wall-clock time into a `Duration`, rejecting values it cannot hold
pub fn wall_clock(name: &'static str, seconds: f64) -> Result<Duration, CommonError> {
    Duration::try_from_secs_f64(seconds).map_err(|e| invalid(name, format!("{e} ({seconds} s)")))
}

fn invalid(name: &'static str, msg: String) -> CommonError {
    CommonError::InvalidParameter { name, msg }
}

/// This function reads toml files
pub fn read_toml(path: &str) -> Result<TomlParameters, CommonError> {
    // Read toml config file
    let toml_contents: &str =
        &std::fs::read_to_string(path).map_err(|_| CommonError::TomlReadError {
            path: path.to_string(),
        })?;

    // Return parsed toml from str
    let parameters: TomlParameters =
        toml::from_str(toml_contents).map_err(|e| CommonError::TomlParseError {
            msg: format!("{e:?}"),
        })?;
    parameters.validate()?;
    Ok(parameters)
}

#[test]
fn test_default_walls_match_reference_geometry() {
    let walls = PotentialParameters::default().walls_for(50, 50);
    assert_eq!(walls.len(), 3);
    assert_eq!(walls[0].rows, [0, 18]);
    assert_eq!(walls[1].rows, [22, 29]);
    assert_eq!(walls[2].rows, [33, 50]);
    for wall in walls {
        assert_eq!(wall.columns, [20, 22]);
        assert_eq!(wall.height, 50.0);
    }
}

#[test]
fn test_empty_toml_is_reference_run() {
    let toml: TomlParameters = toml::from_str("").unwrap();
    assert_eq!(toml, TomlParameters::default());
    assert!(toml.validate().is_ok());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let toml_contents = "\
    sim_name = \"free-particle\"\n\
    size     = [32, 24]\n\
    dt       = 0.001\n\
    boundary = \"Reflect\"\n\n\
    [ics]\n\
    type = \"PlaneWave\"\n\
    wavevector = [0.1, 0.2]\n\n\
    [potential]\n\
    walls = []\n\n\
    [dissipation.edges]\n\
    right = true\n\
    ";
    let toml: TomlParameters = toml::from_str(toml_contents).unwrap();

    assert_eq!(toml.sim_name, "free-particle");
    assert_eq!(toml.size, [32, 24]);
    assert_eq!(toml.dt, 0.001);
    assert_eq!(toml.boundary, BoundaryCondition::Reflect);
    assert_eq!(
        toml.ics,
        InitialConditions::PlaneWave {
            wavevector: [0.1, 0.2]
        }
    );
    assert_eq!(toml.potential.walls, Some(vec![]));
    assert!(toml.potential.walls_for(32, 24).is_empty());
    assert_eq!(toml.dissipation.thickness, BORDER_THICKNESS);
    assert!(toml.dissipation.edges.right);
    assert!(toml.dissipation.edges.left);
    assert_eq!(toml.hbar, HBAR);
    assert_eq!(toml.record, None);
}

#[test]
fn test_validate_rejects_bad_parameters() {
    let mut toml = TomlParameters::default();
    toml.dt = 0.0;
    assert!(matches!(
        toml.validate(),
        Err(CommonError::InvalidParameter { name: "dt", .. })
    ));

    let mut toml = TomlParameters::default();
    toml.mass = 0.0;
    assert!(matches!(
        toml.validate(),
        Err(CommonError::InvalidParameter { name: "mass", .. })
    ));

    let mut toml = TomlParameters::default();
    toml.size = [8, 8];
    assert!(matches!(
        toml.validate(),
        Err(CommonError::InvalidParameter {
            name: "dissipation.thickness",
            ..
        })
    ));
}

#[test]
fn test_validate_rejects_unrepresentable_intervals() {
    let toml = TomlParameters {
        fps: 1e-300,
        ..Default::default()
    };
    assert!(matches!(
        toml.validate(),
        Err(CommonError::InvalidParameter { name: "fps", .. })
    ));

    let toml = TomlParameters {
        pacing_interval: Some(1e30),
        ..Default::default()
    };
    assert!(matches!(
        toml.validate(),
        Err(CommonError::InvalidParameter {
            name: "pacing_interval",
            ..
        })
    ));

    assert_eq!(wall_clock("fps", 0.25).unwrap(), Duration::from_millis(250));
}

#[test]
fn test_read_toml_from_disk() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "fps = 60.0\nfinal_sim_time = 0.5").unwrap();
    let toml = read_toml(file.path().to_str().unwrap()).unwrap();
    assert_eq!(toml.fps, 60.0);
    assert_eq!(toml.final_sim_time, Some(0.5));

    assert!(matches!(
        read_toml("definitely/not/here.toml"),
        Err(CommonError::TomlReadError { .. })
    ));
}

#[test]
fn test_default_geometry_follows_grid_size() {
    let walls = PotentialParameters::default().walls_for(100, 100);
    assert_eq!(walls.len(), 3);
    assert_eq!(walls[2].rows, [33, 100]);
    for wall in &walls {
        assert_eq!(wall.columns, [40, 42]);
    }

    let dissipation = DissipationParameters::default();
    assert_eq!(dissipation.span_for(50), 20);
    assert_eq!(dissipation.span_for(100), 40);

    let full = DissipationParameters {
        span: Some(1000),
        ..Default::default()
    };
    assert_eq!(full.span_for(64), 64);
}
