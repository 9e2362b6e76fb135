#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// The requested number of points is not valid for a quadrature family
    InvalidSize(String),
    /// The requested angular degree is larger than the largest tabulated
    /// rule
    UnsupportedDegree {
        requested: usize,
        maximal: usize,
    },
    /// A radial transform produced negative or non-finite coordinates
    Domain(String),
    /// Two atomic centers are (almost) at the same position
    DegenerateGeometry {
        first: usize,
        second: usize,
        distance: f64,
    },
    /// The size of an array given by the caller does not match the grid
    SizeMismatch {
        expected: usize,
        got: usize,
    },
    /// The operation is not available with the current grid configuration
    UnsupportedOperation(String),
    /// The boundary-value problem for the `(l, m)` channel could not be
    /// solved
    Convergence {
        l: usize,
        m: isize,
        residual: f64,
    },
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Error used for failed internal consistency check, i.e. bugs in
    /// molgrid.
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::InvalidSize(e) => write!(f, "invalid size: {}", e),
            Error::UnsupportedDegree { requested, maximal } => write!(f,
                "unsupported angular degree: requested {}, but the largest available rule has degree {}",
                requested, maximal
            ),
            Error::Domain(e) => write!(f, "domain error: {}", e),
            Error::DegenerateGeometry { first, second, distance } => write!(f,
                "degenerate geometry: atoms {} and {} are separated by {:e}",
                first, second, distance
            ),
            Error::SizeMismatch { expected, got } => write!(f,
                "size mismatch: expected an array with {} values, got {}",
                expected, got
            ),
            Error::UnsupportedOperation(e) => write!(f, "unsupported operation: {}", e),
            Error::Convergence { l, m, residual } => write!(f,
                "failed to solve the radial boundary-value problem for channel l={} m={} (residual is {:e})",
                l, m, residual
            ),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Internal(e) => write!(f, "internal molgrid error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::InvalidSize(_) |
            Error::UnsupportedDegree { .. } |
            Error::Domain(_) |
            Error::DegenerateGeometry { .. } |
            Error::SizeMismatch { .. } |
            Error::UnsupportedOperation(_) |
            Error::Convergence { .. } |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

/// Check that an array of values provided by the user matches the size of
/// the grid it will be used with
pub(crate) fn check_size(expected: usize, got: usize) -> Result<(), Error> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::SizeMismatch { expected, got })
    }
}
