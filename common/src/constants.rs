// Reduced Planck constant (natural units)
pub const HBAR: f64 = 1.0;

/// Particle mass
pub const MASS: f64 = 0.1;

/// Integration timestep
pub const DT: f64 = 1e-4;

/// Number of grid cells along x and y
pub const GRID_SIZE: [usize; 2] = [50, 50];

/// Target frame rate of the display
pub const FPS: f64 = 30.0;

/// Each grid cell is drawn as a DISPLAY_SCALE x DISPLAY_SCALE block
pub const DISPLAY_SCALE: u32 = 6;

/// Width (in cells) of the absorbing border
pub const BORDER_THICKNESS: usize = 10;

/// Dissipation at the outermost cell of the border is BORDER_PEAK * (1 - 1/BORDER_THICKNESS)^3
pub const BORDER_PEAK: f64 = 100.0;

/// Height of the slit walls
pub const WALL_HEIGHT: f64 = 50.0;

/// The slit wall starts at column `int(ly / WALL_BAND_DIVISOR)`
pub const WALL_BAND_DIVISOR: f64 = 2.5;

/// Spatial stiffness of the initial wave packet
pub const PACKET_STIFFNESS: f64 = 5.0;

/// Momentum imposed on the initial wave packet along y
pub const PACKET_MOMENTUM: f64 = 100.0;
