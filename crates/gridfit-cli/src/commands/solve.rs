use anyhow::{bail, Result};
use gridfit_algo::{
    branch_flows, BusResult, BusState, NewtonRaphson, PowerFlowOutcome, SolvedState, YBus,
};
use gridfit_core::{BranchId, Network};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;
use tabwriter::TabWriter;
use tracing::info;

use super::{load_case, write_json};
use crate::cli::SolverArgs;

#[derive(Debug, Serialize)]
struct SolveReport {
    converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    iterations: Option<usize>,
    max_mismatch: Option<f64>,
    active_loss_mw: Option<f64>,
    reactive_loss_mvar: Option<f64>,
    buses: Vec<BusResult>,
    branches: Vec<BranchRow>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BranchRow {
    branch: BranchId,
    p_from_mw: f64,
    q_from_mvar: f64,
    p_to_mw: f64,
    q_to_mvar: f64,
    loss_mw: f64,
    /// |S_from| / rating, absent for unrated branches
    #[serde(skip_serializing_if = "Option::is_none")]
    loading: Option<f64>,
}

pub(crate) fn branch_rows(network: &Network, state: &BusState) -> Vec<BranchRow> {
    let base = network.base_mva();
    network
        .branches()
        .iter()
        .zip(branch_flows(network, state))
        .map(|(branch, flow)| BranchRow {
            branch: flow.branch,
            p_from_mw: flow.s_from.re * base,
            q_from_mvar: flow.s_from.im * base,
            p_to_mw: flow.s_to.re * base,
            q_to_mvar: flow.s_to.im * base,
            loss_mw: flow.loss().re * base,
            loading: branch
                .rating
                .and_then(|rating| flow.loading(rating.to_per_unit(base))),
        })
        .collect()
}

pub fn handle(case: &Path, solver: &SolverArgs, table: bool, pretty: bool) -> Result<()> {
    let (network, config) = load_case(case)?;
    let config = solver.apply(config)?;

    let start = Instant::now();
    let ybus = YBus::from_network(&network)?;
    let newton = NewtonRaphson::new(config.solver);
    let outcome = newton.solve(&ybus, BusState::from_network(&network));
    info!(
        "AC power flow ({}) finished in {:.2?}",
        config.solver.linear_solver.as_str(),
        start.elapsed()
    );

    let report = match &outcome {
        PowerFlowOutcome::Converged(solved) => converged_report(&network, solved),
        PowerFlowOutcome::Failed { reason, .. } => SolveReport {
            converged: false,
            reason: Some(reason.to_string()),
            iterations: None,
            max_mismatch: None,
            active_loss_mw: None,
            reactive_loss_mvar: None,
            buses: Vec::new(),
            branches: Vec::new(),
        },
    };

    if table {
        write_tables(&report)?;
    } else {
        write_json(&report, pretty)?;
    }

    if let PowerFlowOutcome::Failed { reason, .. } = outcome {
        bail!("power flow did not converge: {reason}");
    }
    Ok(())
}

fn converged_report(network: &Network, solved: &SolvedState) -> SolveReport {
    let base = network.base_mva();
    info!(
        iterations = solved.iterations(),
        max_mismatch = solved.max_mismatch(),
        "power flow converged"
    );
    SolveReport {
        converged: true,
        reason: None,
        iterations: Some(solved.iterations()),
        max_mismatch: Some(solved.max_mismatch()),
        active_loss_mw: Some(solved.active_loss() * base),
        reactive_loss_mvar: Some(solved.reactive_loss() * base),
        buses: solved.bus_results(network),
        branches: branch_rows(network, solved.state()),
    }
}

fn write_tables(report: &SolveReport) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "BUS\tTYPE\tVM (pu)\tVA (deg)\tPG (MW)\tQG (Mvar)\tPD (MW)\tQD (Mvar)")?;
    for row in &report.buses {
        writeln!(
            writer,
            "{}\t{:?}\t{:.4}\t{:.3}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
            row.bus.value(),
            row.bus_type,
            row.vm_pu,
            row.va_deg,
            row.p_gen_mw,
            row.q_gen_mvar,
            row.p_load_mw,
            row.q_load_mvar
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "BRANCH\tP FROM (MW)\tQ FROM (Mvar)\tP TO (MW)\tLOSS (MW)\tLOADING")?;
    for row in &report.branches {
        let loading = row
            .loading
            .map(|l| format!("{:.1}%", l * 100.0))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{:.2}\t{:.2}\t{:.2}\t{:.3}\t{}",
            row.branch.value(),
            row.p_from_mw,
            row.q_from_mvar,
            row.p_to_mw,
            row.loss_mw,
            loading
        )?;
    }
    writer.flush()?;

    match (report.iterations, report.active_loss_mw) {
        (Some(iterations), Some(loss)) => {
            eprintln!("Converged in {iterations} iterations, losses {loss:.3} MW");
        }
        _ => eprintln!(
            "Did not converge: {}",
            report.reason.as_deref().unwrap_or("unknown")
        ),
    }
    Ok(())
}
