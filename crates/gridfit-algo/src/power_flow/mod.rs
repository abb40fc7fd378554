//! AC power flow.
//!
//! ## Bus Types
//!
//! ```text
//! BUS TYPE │ SPECIFIED     │ UNKNOWN     │ EQUATIONS
//! ─────────┼───────────────┼─────────────┼──────────
//! Slack    │ |V|, θ = 0    │ P, Q        │ none
//! PV       │ P, |V|        │ θ           │ ΔP
//! PQ       │ P, Q          │ θ, |V|      │ ΔP, ΔQ
//! ```
//!
//! All quantities inside this module are per-unit on the network MVA base.
//! [`BusState`] is the only mutable data: the solver consumes one, and on
//! success returns a [`SolvedState`] wrapping the updated copy.

mod newton;

pub use newton::NewtonRaphson;

use gridfit_core::{BusId, BusType, Network, SolverKind};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::ybus::YBus;

/// Per-bus electrical state, struct-of-arrays indexed by bus index.
///
/// Injections follow the generator convention: `p_gen` and `q_gen` are
/// produced power, `p_load` and `q_load` consumed power, both positive.
#[derive(Debug, Clone, PartialEq)]
pub struct BusState {
    pub bus_type: Vec<BusType>,
    /// Voltage magnitude (pu)
    pub vm: Vec<f64>,
    /// Voltage angle (rad)
    pub va: Vec<f64>,
    pub p_gen: Vec<f64>,
    pub q_gen: Vec<f64>,
    pub p_load: Vec<f64>,
    pub q_load: Vec<f64>,
}

impl BusState {
    /// Initial state from the network data.
    ///
    /// Voltage-controlled buses start at their generator's setpoint when one
    /// is connected, otherwise at the bus voltage. Generation is the sum of
    /// the generators' initial outputs.
    pub fn from_network(network: &Network) -> Self {
        let base = network.base_mva();
        let n = network.bus_count();
        let mut state = Self {
            bus_type: Vec::with_capacity(n),
            vm: Vec::with_capacity(n),
            va: Vec::with_capacity(n),
            p_gen: vec![0.0; n],
            q_gen: vec![0.0; n],
            p_load: Vec::with_capacity(n),
            q_load: Vec::with_capacity(n),
        };

        for (i, bus) in network.buses().iter().enumerate() {
            state.bus_type.push(bus.bus_type);
            let vm = match network.generator_at(i) {
                Some(g) if bus.bus_type.controls_voltage() => {
                    network.generators()[g].voltage_setpoint.value()
                }
                _ => bus.voltage_pu.value(),
            };
            state.vm.push(vm);
            state.va.push(if i == network.slack_index() {
                0.0
            } else {
                bus.angle_rad.value()
            });
            state.p_load.push(bus.load_p.to_per_unit(base));
            state.q_load.push(bus.load_q.to_per_unit(base));
        }

        for (g, gen) in network.generators().iter().enumerate() {
            let bus = network.generator_bus(g);
            state.p_gen[bus] += gen.active_power.to_per_unit(base);
            state.q_gen[bus] += gen.reactive_power.to_per_unit(base);
        }

        state
    }

    pub fn len(&self) -> usize {
        self.vm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vm.is_empty()
    }

    /// Complex voltage phasor at bus `i`
    pub fn voltage(&self, i: usize) -> Complex64 {
        Complex64::from_polar(self.vm[i], self.va[i])
    }

    /// Specified net injections (generation minus load)
    pub fn specified_injections(&self) -> (Vec<f64>, Vec<f64>) {
        let p = self
            .p_gen
            .iter()
            .zip(&self.p_load)
            .map(|(g, l)| g - l)
            .collect();
        let q = self
            .q_gen
            .iter()
            .zip(&self.q_load)
            .map(|(g, l)| g - l)
            .collect();
        (p, q)
    }
}

/// Calculated injections S = V ⊙ conj(Y·V), returned as (P, Q).
///
/// ```text
/// P_i = Σ V_i·V_j·(G_ij·cos(θ_ij) + B_ij·sin(θ_ij))
/// Q_i = Σ V_i·V_j·(G_ij·sin(θ_ij) − B_ij·cos(θ_ij))
/// ```
pub fn compute_injections(ybus: &YBus, vm: &[f64], va: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = vm.len();
    let mut p = vec![0.0; n];
    let mut q = vec![0.0; n];

    for i in 0..n {
        for (j, g_ij) in ybus.g_row_iter(i) {
            let theta_ij = va[i] - va[j];
            let vv = vm[i] * vm[j];
            p[i] += vv * g_ij * theta_ij.cos();
            q[i] += vv * g_ij * theta_ij.sin();
        }
        for (j, b_ij) in ybus.b_row_iter(i) {
            let theta_ij = va[i] - va[j];
            let vv = vm[i] * vm[j];
            p[i] += vv * b_ij * theta_ij.sin();
            q[i] -= vv * b_ij * theta_ij.cos();
        }
    }

    (p, q)
}

/// Newton-Raphson settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Largest tolerated |ΔP| or |ΔQ| (pu)
    pub tolerance: f64,
    pub max_iterations: usize,
    pub linear_solver: SolverKind,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 30,
            linear_solver: SolverKind::Gauss,
        }
    }
}

impl SolverSettings {
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_linear_solver(mut self, kind: SolverKind) -> Self {
        self.linear_solver = kind;
        self
    }
}

/// Why a solve did not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NonConvergence {
    #[error("singular Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize },
    #[error("no convergence within {max_iterations} iterations")]
    IterationLimit { max_iterations: usize },
    #[error("power mismatch became non-finite at iteration {iteration}")]
    Diverged { iteration: usize },
}

/// A converged operating point.
///
/// Only [`NewtonRaphson::solve`] constructs one. Generation at every bus has
/// been back-computed as calculated injection plus load.
#[derive(Debug, Clone)]
pub struct SolvedState {
    state: BusState,
    iterations: usize,
    max_mismatch: f64,
}

impl SolvedState {
    pub fn state(&self) -> &BusState {
        &self.state
    }

    pub fn into_state(self) -> BusState {
        self.state
    }

    /// Newton updates applied before the tolerance was met
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn max_mismatch(&self) -> f64 {
        self.max_mismatch
    }

    /// Total active generation minus total active load (pu)
    pub fn active_loss(&self) -> f64 {
        self.state.p_gen.iter().sum::<f64>() - self.state.p_load.iter().sum::<f64>()
    }

    /// Total reactive generation minus total reactive load (pu)
    pub fn reactive_loss(&self) -> f64 {
        self.state.q_gen.iter().sum::<f64>() - self.state.q_load.iter().sum::<f64>()
    }

    /// Per-bus rows in engineering units for reporting.
    pub fn bus_results(&self, network: &Network) -> Vec<BusResult> {
        let base = network.base_mva();
        network
            .buses()
            .iter()
            .enumerate()
            .map(|(i, bus)| BusResult {
                bus: bus.id,
                bus_type: bus.bus_type,
                vm_pu: self.state.vm[i],
                va_deg: self.state.va[i].to_degrees(),
                p_gen_mw: self.state.p_gen[i] * base,
                q_gen_mvar: self.state.q_gen[i] * base,
                p_load_mw: self.state.p_load[i] * base,
                q_load_mvar: self.state.q_load[i] * base,
            })
            .collect()
    }
}

/// One reporting row of a solved state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusResult {
    pub bus: BusId,
    pub bus_type: BusType,
    pub vm_pu: f64,
    pub va_deg: f64,
    pub p_gen_mw: f64,
    pub q_gen_mvar: f64,
    pub p_load_mw: f64,
    pub q_load_mvar: f64,
}

/// Result of a power-flow solve.
#[derive(Debug, Clone)]
pub enum PowerFlowOutcome {
    Converged(SolvedState),
    /// `state` is the input state, untouched.
    Failed {
        state: BusState,
        reason: NonConvergence,
    },
}

impl PowerFlowOutcome {
    pub fn converged(&self) -> bool {
        matches!(self, PowerFlowOutcome::Converged(_))
    }

    pub fn solved(&self) -> Option<&SolvedState> {
        match self {
            PowerFlowOutcome::Converged(solved) => Some(solved),
            PowerFlowOutcome::Failed { .. } => None,
        }
    }

    /// Final state: solved on success, the original input on failure.
    pub fn state(&self) -> &BusState {
        match self {
            PowerFlowOutcome::Converged(solved) => solved.state(),
            PowerFlowOutcome::Failed { state, .. } => state,
        }
    }

    /// `(state, converged)`
    pub fn into_parts(self) -> (BusState, bool) {
        match self {
            PowerFlowOutcome::Converged(solved) => (solved.into_state(), true),
            PowerFlowOutcome::Failed { state, .. } => (state, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfit_core::{Branch, BranchId, Bus, BusId, Gen, GenId, NetworkBuilder};

    fn network() -> Network {
        let mut builder = NetworkBuilder::new(100.0);
        builder
            .add_bus(Bus::new(BusId::new(0), BusType::Slack).with_voltage(1.0))
            .add_bus(Bus::new(BusId::new(1), BusType::PV).with_voltage(0.98))
            .add_bus(Bus::new(BusId::new(2), BusType::PQ).with_load(80.0, 30.0))
            .add_branch(Branch::new(BranchId::new(0), BusId::new(0), BusId::new(1), 0.01, 0.1))
            .add_branch(Branch::new(BranchId::new(1), BusId::new(1), BusId::new(2), 0.01, 0.1))
            .add_generator(
                Gen::new(GenId::new(0), BusId::new(0))
                    .with_voltage_setpoint(1.03)
                    .as_slack(),
            )
            .add_generator(
                Gen::new(GenId::new(1), BusId::new(1))
                    .with_output(40.0, 0.0)
                    .with_voltage_setpoint(1.01),
            );
        builder.build().unwrap()
    }

    #[test]
    fn test_state_from_network() {
        let state = BusState::from_network(&network());
        assert_eq!(state.len(), 3);
        assert_eq!(state.vm, vec![1.03, 1.01, 1.0]);
        assert_eq!(state.p_gen, vec![0.0, 0.4, 0.0]);
        assert_eq!(state.p_load, vec![0.0, 0.0, 0.8]);
        let (p_spec, q_spec) = state.specified_injections();
        assert!((p_spec[2] + 0.8).abs() < 1e-12);
        assert!((q_spec[2] + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_flat_start_has_no_injection() {
        let network = network();
        let ybus = YBus::from_network(&network).unwrap();
        let (p, q) = compute_injections(&ybus, &[1.0; 3], &[0.0; 3]);
        assert!(p.iter().chain(q.iter()).all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = SolverSettings::default();
        assert_eq!(settings.tolerance, 1e-6);
        assert_eq!(settings.max_iterations, 30);
        assert_eq!(settings.linear_solver, SolverKind::Gauss);

        let parsed: SolverSettings = serde_json::from_str(r#"{"max_iterations": 12}"#).unwrap();
        assert_eq!(parsed.max_iterations, 12);
        assert_eq!(parsed.tolerance, 1e-6);
    }

    #[test]
    fn test_non_convergence_display() {
        let reason = NonConvergence::SingularJacobian { iteration: 2 };
        assert!(reason.to_string().contains("singular"));
    }
}
