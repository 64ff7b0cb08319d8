use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire scene module.
pub type Result<T> = std::result::Result<T, SurfaceErr>;

/// Failures of a rendering surface or of the scene drawing on it.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceErr {
    InvalidSize {
        width: usize,
        height: usize,
    },
    Unavailable {
        name: String,
    },
    Readback {
        got: usize,
        expected: usize,
    },
    NonFinite {
        what: &'static str,
    },
}

impl Display for SurfaceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceErr::InvalidSize { width, height } => {
                write!(f, "invalid surface size {width}x{height}, both sides must be non zero")
            }
            SurfaceErr::Unavailable { name } => write!(f, "surface {name} is unavailable"),
            SurfaceErr::Readback { got, expected } => write!(
                f,
                "surface readback returned {got} pixels, expected {expected}"
            ),
            SurfaceErr::NonFinite { what } => write!(f, "{what} has non finite components"),
        }
    }
}

impl Error for SurfaceErr {}
