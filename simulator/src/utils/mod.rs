pub mod complex;
pub mod error;
pub mod grid;
