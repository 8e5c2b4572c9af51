use qwave_common::CommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to write to disk: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Failed to encode frame: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("A NaN or Inf value was produced")]
    NanOrInf,

    #[error("Cannot normalize a wavefunction with zero norm")]
    ZeroNorm,

    #[error("Grid shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Error in common: {err}")]
    TomlReadError {
        #[from]
        err: CommonError,
    },
}
