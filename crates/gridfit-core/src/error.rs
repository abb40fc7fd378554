//! Unified error types for gridfit.
//!
//! [`GridError`] is the error returned at API boundaries. Construction-time
//! problems with the network data are reported through the more specific
//! [`NetworkError`], which converts into `GridError` with `?`.
//!
//! Numerical non-convergence of the power flow is *not* an error: the solver
//! reports it as a failed outcome so that callers scoring many candidates can
//! keep going.
//!
//! # Example
//!
//! ```
//! use gridfit_core::{GridError, NetworkBuilder, NetworkError};
//!
//! let err = NetworkBuilder::new(100.0).build().unwrap_err();
//! assert!(matches!(err, GridError::Network(NetworkError::NoBuses)));
//! ```

use crate::{BranchId, BusId, GenId};
use thiserror::Error;

/// Unified error type for all gridfit operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid network data detected while building the model
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Configuration errors (decision-vector layout, solver settings, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Solver/algorithm errors that are not ordinary non-convergence
    #[error("Solver error: {0}")]
    Solver(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Construction-time problems with network data.
///
/// All of these are fatal configuration errors: a network that fails one of
/// these checks is never handed to the solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("network has no buses")]
    NoBuses,

    #[error("system MVA base must be positive and finite, got {0}")]
    InvalidBase(f64),

    #[error("bus {0:?} is defined more than once")]
    DuplicateBus(BusId),

    #[error("network has no slack bus")]
    MissingSlack,

    #[error("network has more than one slack bus: {0:?}")]
    MultipleSlack(Vec<BusId>),

    #[error("{element} references unknown bus {bus:?}")]
    UnknownBus { element: String, bus: BusId },

    #[error("branch {0:?} has zero impedance")]
    ZeroImpedance(BranchId),

    #[error("branch {0:?} has negative or non-finite resistance/reactance")]
    NegativeImpedance(BranchId),

    #[error("branch {0:?} connects a bus to itself")]
    SelfLoop(BranchId),

    #[error("more than one generator is connected to bus {0:?}")]
    DuplicateGenerator(BusId),

    #[error("more than one generator carries the slack flag: {0:?}")]
    MultipleSlackGenerators(Vec<GenId>),

    #[error("slack generator {gen:?} sits on bus {bus:?}, which is not the slack bus")]
    SlackGeneratorMismatch { gen: GenId, bus: BusId },

    #[error("generator {gen:?} has inverted {what} limits")]
    InvalidLimits { gen: GenId, what: &'static str },

    #[error("buses not connected to the slack bus: {0:?}")]
    Islanded(Vec<BusId>),
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

// JSON parsing errors
impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}
