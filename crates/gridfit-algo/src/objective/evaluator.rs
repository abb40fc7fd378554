use std::sync::Arc;

use gridfit_core::{GridResult, Network};
use rayon::prelude::*;
use serde::Serialize;
use tracing::trace;

use super::layout::DecisionLayout;
use super::penalty::{congestion_penalty, outside, voltage_penalty};
use super::{Objective, ObjectiveConfig};
use crate::branch_flow::branch_flows;
use crate::power_flow::{BusState, NewtonRaphson, PowerFlowOutcome, SolvedState};
use crate::ybus::YBus;

/// Every term of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ObjectiveBreakdown {
    pub converged: bool,
    pub generation_cost: f64,
    pub capacity: f64,
    pub active_loss: f64,
    pub reactive_loss: f64,
    pub voltage: f64,
    pub congestion: f64,
    /// Non-zero only when `converged` is false
    pub non_convergence: f64,
    pub capacity_violations: usize,
    pub voltage_violations: usize,
    pub congested_branches: usize,
    pub total: f64,
}

impl ObjectiveBreakdown {
    /// Breakdown of a vector whose power flow did not converge.
    pub fn failed(penalty: f64) -> Self {
        Self {
            converged: false,
            non_convergence: penalty,
            total: penalty,
            ..Self::default()
        }
    }

    pub fn penalty_total(&self) -> f64 {
        self.total - self.generation_cost
    }
}

/// Scores generator setpoints against a fixed network.
///
/// The network, Y-bus and base state are built once; each call clones the
/// base state, so evaluations never share mutable data.
#[derive(Debug, Clone)]
pub struct DispatchObjective {
    network: Arc<Network>,
    ybus: Arc<YBus>,
    base_state: BusState,
    layout: DecisionLayout,
    solver: NewtonRaphson,
    config: ObjectiveConfig,
}

impl DispatchObjective {
    pub fn new(network: impl Into<Arc<Network>>, config: ObjectiveConfig) -> GridResult<Self> {
        let network = network.into();
        let ybus = Arc::new(YBus::from_network(&network)?);
        let base_state = BusState::from_network(&network);
        let layout = DecisionLayout::new(&network, config.penalties.voltage_band());
        Ok(Self {
            network,
            ybus,
            base_state,
            layout,
            solver: NewtonRaphson::new(config.solver),
            config,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn ybus(&self) -> &YBus {
        &self.ybus
    }

    pub fn layout(&self) -> &DecisionLayout {
        &self.layout
    }

    pub fn config(&self) -> &ObjectiveConfig {
        &self.config
    }

    pub fn base_state(&self) -> &BusState {
        &self.base_state
    }

    /// Decision vector of the setpoints stored in the network data.
    pub fn base_point(&self) -> GridResult<Vec<f64>> {
        self.layout
            .encode(&self.layout.base_setpoints(&self.network))
    }

    /// Run the power flow for `x` without scoring it.
    pub fn solve_setpoints(&self, x: &[f64]) -> GridResult<PowerFlowOutcome> {
        let setpoints = self.layout.decode(x)?;
        let mut state = self.base_state.clone();
        setpoints.apply(&mut state, self.network.base_mva());
        Ok(self.solver.solve(&self.ybus, state))
    }

    pub fn evaluate_detailed(&self, x: &[f64]) -> GridResult<ObjectiveBreakdown> {
        let breakdown = match self.solve_setpoints(x)? {
            PowerFlowOutcome::Converged(solved) => self.score(&solved),
            PowerFlowOutcome::Failed { .. } => {
                ObjectiveBreakdown::failed(self.config.penalties.non_convergence)
            }
        };
        trace!(
            total = breakdown.total,
            converged = breakdown.converged,
            "evaluated decision vector"
        );
        Ok(breakdown)
    }

    /// Cost and penalties of a converged operating point.
    pub fn score(&self, solved: &SolvedState) -> ObjectiveBreakdown {
        let network = &*self.network;
        let weights = &self.config.penalties;
        let base = network.base_mva();
        let state = solved.state();
        let mut out = ObjectiveBreakdown {
            converged: true,
            ..ObjectiveBreakdown::default()
        };

        for (g, gen) in network.generators().iter().enumerate() {
            let bus = network.generator_bus(g);
            let p_mw = state.p_gen[bus] * base;
            let q_mvar = state.q_gen[bus] * base;
            out.generation_cost += gen.cost.evaluate(p_mw, q_mvar);

            if outside(q_mvar, gen.qmin.value(), gen.qmax.value()) {
                out.capacity += weights.capacity;
                out.capacity_violations += 1;
            }
        }

        let slack = network.slack_index();
        if let Some(g) = network.generator_at(slack) {
            let gen = &network.generators()[g];
            let p_mw = state.p_gen[slack] * base;
            if outside(p_mw, gen.pmin.value(), gen.pmax.value()) {
                out.capacity += weights.capacity;
                out.capacity_violations += 1;
            }
        }

        out.active_loss = weights.active_loss * solved.active_loss() * base;
        out.reactive_loss = weights.reactive_loss * solved.reactive_loss() * base;

        for &vm in &state.vm {
            let penalty =
                voltage_penalty(vm, weights.voltage_min, weights.voltage_max, weights.voltage);
            if penalty > 0.0 {
                out.voltage += penalty;
                out.voltage_violations += 1;
            }
        }

        for (branch, flow) in network.branches().iter().zip(branch_flows(network, state)) {
            let Some(rating) = branch.rating else {
                continue;
            };
            let penalty = congestion_penalty(
                flow.apparent_from(),
                rating.to_per_unit(base),
                weights.congestion_threshold,
                weights.congestion,
            );
            if penalty > 0.0 {
                out.congestion += penalty;
                out.congested_branches += 1;
            }
        }

        out.total = out.generation_cost
            + out.capacity
            + out.active_loss
            + out.reactive_loss
            + out.voltage
            + out.congestion;
        out
    }

    /// Score many vectors in parallel.
    pub fn evaluate_population(&self, population: &[Vec<f64>]) -> Vec<GridResult<f64>> {
        population
            .par_iter()
            .map(|x| self.evaluate(x))
            .collect()
    }
}

impl Objective for DispatchObjective {
    fn dimension(&self) -> usize {
        self.layout.len()
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        self.layout.bounds()
    }

    fn evaluate(&self, x: &[f64]) -> GridResult<f64> {
        Ok(self.evaluate_detailed(x)?.total)
    }
}
