//! # gridfit-algo: Power Flow and Dispatch Scoring
//!
//! Numerical core of gridfit. The pipeline is:
//!
//! ```text
//! Network ──YBus::from_network──▶ YBus (once per run)
//!                                   │
//! decision vector ──DecisionLayout::decode──▶ Setpoints
//!                                   │            │ apply onto a fresh BusState
//!                                   ▼            ▼
//!                          NewtonRaphson::solve ──▶ PowerFlowOutcome
//!                                                        │
//!                                   generation cost + penalties ──▶ f64
//! ```
//!
//! The [`YBus`] and the [`gridfit_core::Network`] are shared read-only; every
//! evaluation works on its own [`BusState`], so [`DispatchObjective`] can be
//! called from many threads at once.
//!
//! ## Example
//!
//! ```no_run
//! use gridfit_algo::{DispatchObjective, Objective, ObjectiveConfig};
//! # fn network() -> gridfit_core::Network { unimplemented!() }
//!
//! let objective = DispatchObjective::new(network(), ObjectiveConfig::default())?;
//! let x = objective.base_point()?;
//! let cost = objective.evaluate(&x)?;
//! println!("cost = {cost:.2}");
//! # Ok::<(), gridfit_core::GridError>(())
//! ```

pub mod branch_flow;
pub mod history;
pub mod objective;
pub mod power_flow;
pub mod ybus;

pub use branch_flow::{branch_flows, BranchFlow};
pub use history::{GenerationRecord, RunHistory};
pub use objective::{
    DecisionLayout, DecisionVariable, DispatchObjective, GenSetpoint, Objective,
    ObjectiveBreakdown, ObjectiveConfig, PenaltyWeights, Setpoints, VariableKind,
};
pub use power_flow::{
    BusResult, BusState, NewtonRaphson, NonConvergence, PowerFlowOutcome, SolvedState,
    SolverSettings,
};
pub use ybus::YBus;
