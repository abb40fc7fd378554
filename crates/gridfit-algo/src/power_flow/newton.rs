//! Newton-Raphson iteration in polar coordinates.
//!
//! Unknowns are θ at every non-slack bus followed by |V| at every PQ bus.
//! Each iteration solves
//!
//! ```text
//! ┌ J11  J12 ┐ ┌ Δθ ┐   ┌ ΔP ┐      J11 = ∂P/∂θ   J12 = ∂P/∂V
//! │          │ │    │ = │    │      J21 = ∂Q/∂θ   J22 = ∂Q/∂V
//! └ J21  J22 ┘ └ ΔV ┘   └ ΔQ ┘
//! ```
//!
//! with ΔP over non-slack buses and ΔQ over PQ buses.

use std::fmt;
use std::sync::Arc;

use gridfit_core::{BusType, LinearSystemBackend};
use tracing::{debug, warn};

use super::{
    compute_injections, BusState, NonConvergence, PowerFlowOutcome, SolvedState, SolverSettings,
};
use crate::ybus::YBus;

/// Newton-Raphson AC power-flow solver.
///
/// Holds only settings and the linear backend, so one instance can serve
/// any number of concurrent solves.
#[derive(Clone)]
pub struct NewtonRaphson {
    settings: SolverSettings,
    backend: Arc<dyn LinearSystemBackend>,
}

impl fmt::Debug for NewtonRaphson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewtonRaphson")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new(SolverSettings::default())
    }
}

impl NewtonRaphson {
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            settings,
            backend: settings.linear_solver.build_solver(),
        }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Solve for the operating point starting from `state`.
    ///
    /// On failure the returned outcome carries `state` exactly as given.
    pub fn solve(&self, ybus: &YBus, state: BusState) -> PowerFlowOutcome {
        let n = state.len();
        let pvpq: Vec<usize> = (0..n)
            .filter(|&i| state.bus_type[i] != BusType::Slack)
            .collect();
        let pq: Vec<usize> = (0..n)
            .filter(|&i| state.bus_type[i] == BusType::PQ)
            .collect();
        let n_p = pvpq.len();

        let (p_spec, q_spec) = state.specified_injections();
        let mut vm = state.vm.clone();
        let mut va = state.va.clone();
        let mut mismatch = vec![0.0; n_p + pq.len()];

        for iteration in 0..=self.settings.max_iterations {
            let (p_calc, q_calc) = compute_injections(ybus, &vm, &va);

            // ΔP for non-slack buses, ΔQ for PQ buses
            for (k, &i) in pvpq.iter().enumerate() {
                mismatch[k] = p_spec[i] - p_calc[i];
            }
            for (k, &i) in pq.iter().enumerate() {
                mismatch[n_p + k] = q_spec[i] - q_calc[i];
            }

            if mismatch.iter().any(|m| !m.is_finite()) {
                warn!(iteration, "power mismatch is not finite; abandoning solve");
                return PowerFlowOutcome::Failed {
                    state,
                    reason: NonConvergence::Diverged { iteration },
                };
            }

            let max_mismatch = mismatch.iter().fold(0.0_f64, |acc, m| acc.max(m.abs()));
            debug!(iteration, max_mismatch, "newton-raphson iteration");

            if max_mismatch < self.settings.tolerance {
                return PowerFlowOutcome::Converged(finish(
                    state,
                    vm,
                    va,
                    &p_calc,
                    &q_calc,
                    iteration,
                    max_mismatch,
                ));
            }
            if iteration == self.settings.max_iterations {
                break;
            }

            let jacobian = build_jacobian(ybus, &vm, &va, &p_calc, &q_calc, &pvpq, &pq);
            let delta = match self.backend.solve(&jacobian, &mismatch) {
                Ok(delta) if delta.iter().all(|d| d.is_finite()) => delta,
                Ok(_) => {
                    warn!(iteration, "Jacobian solve produced non-finite corrections");
                    return PowerFlowOutcome::Failed {
                        state,
                        reason: NonConvergence::SingularJacobian { iteration },
                    };
                }
                Err(err) => {
                    warn!(iteration, error = %err, "singular Jacobian");
                    return PowerFlowOutcome::Failed {
                        state,
                        reason: NonConvergence::SingularJacobian { iteration },
                    };
                }
            };

            for (k, &i) in pvpq.iter().enumerate() {
                va[i] += delta[k];
            }
            for (k, &i) in pq.iter().enumerate() {
                vm[i] += delta[n_p + k];
            }
        }

        warn!(
            max_iterations = self.settings.max_iterations,
            "power flow did not converge"
        );
        PowerFlowOutcome::Failed {
            state,
            reason: NonConvergence::IterationLimit {
                max_iterations: self.settings.max_iterations,
            },
        }
    }
}

/// Write the solution back and recompute generation as injection plus load.
fn finish(
    mut state: BusState,
    vm: Vec<f64>,
    va: Vec<f64>,
    p_calc: &[f64],
    q_calc: &[f64],
    iterations: usize,
    max_mismatch: f64,
) -> SolvedState {
    state.vm = vm;
    state.va = va;
    for i in 0..state.len() {
        state.p_gen[i] = p_calc[i] + state.p_load[i];
        state.q_gen[i] = q_calc[i] + state.q_load[i];
    }
    SolvedState {
        state,
        iterations,
        max_mismatch,
    }
}

/// Assemble the dense Jacobian.
///
/// Off-diagonal terms (θ_ij = θ_i − θ_j):
///
/// ```text
/// J11 =  V_i·V_j·(G_ij·sin θ_ij − B_ij·cos θ_ij)
/// J12 =  V_i·(G_ij·cos θ_ij + B_ij·sin θ_ij)
/// J21 = −V_i·V_j·(G_ij·cos θ_ij + B_ij·sin θ_ij)
/// J22 =  V_i·(G_ij·sin θ_ij − B_ij·cos θ_ij)
/// ```
///
/// Diagonal terms:
///
/// ```text
/// J11 = −Q_i − V_i²·B_ii     J12 = P_i/V_i + V_i·G_ii
/// J21 =  P_i − V_i²·G_ii     J22 = Q_i/V_i − V_i·B_ii
/// ```
pub(crate) fn build_jacobian(
    ybus: &YBus,
    vm: &[f64],
    va: &[f64],
    p_calc: &[f64],
    q_calc: &[f64],
    pvpq: &[usize],
    pq: &[usize],
) -> Vec<Vec<f64>> {
    let n = vm.len();
    let n_p = pvpq.len();
    let n_vars = n_p + pq.len();

    // Column of θ_j and of V_j; the ΔQ row of a PQ bus shares its V column.
    let mut theta_col = vec![None; n];
    for (k, &i) in pvpq.iter().enumerate() {
        theta_col[i] = Some(k);
    }
    let mut v_col = vec![None; n];
    for (k, &i) in pq.iter().enumerate() {
        v_col[i] = Some(n_p + k);
    }

    let mut jacobian = vec![vec![0.0; n_vars]; n_vars];

    for (row_p, &i) in pvpq.iter().enumerate() {
        let row_q = v_col[i];

        for (j, g_ij) in ybus.g_row_iter(i) {
            if j == i {
                continue;
            }
            let (sin_ij, cos_ij) = (va[i] - va[j]).sin_cos();
            if let Some(col) = theta_col[j] {
                jacobian[row_p][col] += vm[i] * vm[j] * g_ij * sin_ij;
                if let Some(row) = row_q {
                    jacobian[row][col] -= vm[i] * vm[j] * g_ij * cos_ij;
                }
            }
            if let Some(col) = v_col[j] {
                jacobian[row_p][col] += vm[i] * g_ij * cos_ij;
                if let Some(row) = row_q {
                    jacobian[row][col] += vm[i] * g_ij * sin_ij;
                }
            }
        }

        for (j, b_ij) in ybus.b_row_iter(i) {
            if j == i {
                continue;
            }
            let (sin_ij, cos_ij) = (va[i] - va[j]).sin_cos();
            if let Some(col) = theta_col[j] {
                jacobian[row_p][col] -= vm[i] * vm[j] * b_ij * cos_ij;
                if let Some(row) = row_q {
                    jacobian[row][col] -= vm[i] * vm[j] * b_ij * sin_ij;
                }
            }
            if let Some(col) = v_col[j] {
                jacobian[row_p][col] += vm[i] * b_ij * sin_ij;
                if let Some(row) = row_q {
                    jacobian[row][col] -= vm[i] * b_ij * cos_ij;
                }
            }
        }

        let g_ii = ybus.g(i, i);
        let b_ii = ybus.b(i, i);
        let v2 = vm[i] * vm[i];
        jacobian[row_p][row_p] = -q_calc[i] - v2 * b_ii;
        if let Some(row) = row_q {
            jacobian[row_p][row] = p_calc[i] / vm[i] + vm[i] * g_ii;
            jacobian[row][row_p] = p_calc[i] - v2 * g_ii;
            jacobian[row][row] = q_calc[i] / vm[i] - vm[i] * b_ii;
        }
    }

    jacobian
}
