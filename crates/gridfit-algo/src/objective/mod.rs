//! Dispatch objective: decision vector → scalar cost.
//!
//! ```text
//! total = Σ generation cost
//!       + capacity     (per Q-limit breach, slack P-limit breach)
//!       + active loss  (linear, MW)
//!       + reactive loss(linear, Mvar)
//!       + voltage      (quadratic outside the band)
//!       + congestion   (quadratic above threshold × rating)
//! ```
//!
//! A non-converged solve short-circuits to
//! [`PenaltyWeights::non_convergence`].

mod evaluator;
mod layout;
pub mod penalty;

pub use evaluator::{DispatchObjective, ObjectiveBreakdown};
pub use layout::{DecisionLayout, DecisionVariable, GenSetpoint, Setpoints, VariableKind};
pub use penalty::PenaltyWeights;

use gridfit_core::GridResult;
use serde::{Deserialize, Serialize};

use crate::power_flow::SolverSettings;

/// The seam between the scoring function and an external optimizer.
pub trait Objective: Send + Sync {
    /// Length of the decision vector
    fn dimension(&self) -> usize;

    /// `(lower, upper)` per decision value
    fn bounds(&self) -> Vec<(f64, f64)>;

    /// Score one decision vector; lower is better.
    fn evaluate(&self, x: &[f64]) -> GridResult<f64>;
}

/// Solver settings and penalty constants for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub solver: SolverSettings,
    pub penalties: PenaltyWeights,
}
