pub mod ics;
pub mod integrator;
pub mod render;
pub mod simulation_loop;
pub mod simulation_object;
pub mod utils;
