//! Error types for sketch construction and updates

/// Errors reported by the lossy counter
///
/// Both variants are detected before any state is touched, so a call that
/// returns an error leaves the sketch exactly as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum LossyCountError {
    /// A construction parameter is out of range (e.g. `epsilon` outside (0, 1))
    InvalidParameter {
        name: &'static str,
        value: f64,
    },
    /// An update argument is out of range (e.g. a negative weight)
    InvalidArgument {
        name: &'static str,
        value: i64,
    },
}

impl core::fmt::Display for LossyCountError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LossyCountError::InvalidParameter { name, value } => {
                write!(f, "invalid parameter: {} = {} must be in (0, 1)", name, value)
            }
            LossyCountError::InvalidArgument { name, value } => {
                write!(f, "invalid argument: {} = {} must not be negative", name, value)
            }
        }
    }
}

impl std::error::Error for LossyCountError {}

/// Result alias used by fallible sketch operations
pub type Result<T> = core::result::Result<T, LossyCountError>;
