use anyhow::Result;
use gridfit_algo::{BusResult, DispatchObjective, ObjectiveBreakdown, PowerFlowOutcome};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::solve::{branch_rows, BranchRow};
use super::{load_case, write_json};
use crate::cli::SolverArgs;

#[derive(Debug, Serialize)]
struct EvaluationReport {
    x: Vec<f64>,
    #[serde(flatten)]
    breakdown: ObjectiveBreakdown,
    buses: Vec<BusResult>,
    branches: Vec<BranchRow>,
}

pub fn handle(case: &Path, x: Option<&[f64]>, solver: &SolverArgs, pretty: bool) -> Result<()> {
    let (network, config) = load_case(case)?;
    let config = solver.apply(config)?;
    let objective = DispatchObjective::new(network, config)?;

    let x = match x {
        Some(values) => values.to_vec(),
        None => {
            info!("no --x given, scoring the case setpoints");
            objective.base_point()?
        }
    };

    let (breakdown, buses, branches) = match objective.solve_setpoints(&x)? {
        PowerFlowOutcome::Converged(solved) => {
            let breakdown = objective.score(&solved);
            info!(total = breakdown.total, "objective evaluated");
            (
                breakdown,
                solved.bus_results(objective.network()),
                branch_rows(objective.network(), solved.state()),
            )
        }
        PowerFlowOutcome::Failed { reason, .. } => {
            let breakdown =
                ObjectiveBreakdown::failed(objective.config().penalties.non_convergence);
            warn!(
                penalty = breakdown.non_convergence,
                "power flow did not converge for this decision vector: {reason}"
            );
            (breakdown, Vec::new(), Vec::new())
        }
    };

    write_json(
        &EvaluationReport {
            x,
            breakdown,
            buses,
            branches,
        },
        pretty,
    )
}
