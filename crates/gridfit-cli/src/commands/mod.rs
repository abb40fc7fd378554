pub mod evaluate;
pub mod layout;
pub mod solve;

use anyhow::{Context, Result};
use gridfit_algo::ObjectiveConfig;
use gridfit_core::{Diagnostics, Network, SolverKind};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::case::CaseFile;
use crate::cli::SolverArgs;

/// Load, build and check a case; diagnostics are logged, not fatal.
pub(crate) fn load_case(path: &Path) -> Result<(Network, ObjectiveConfig)> {
    let case = CaseFile::load(path)?;
    let network = case
        .network()
        .with_context(|| format!("building network from {}", path.display()))?;
    info!("loaded {}: {}", path.display(), network.stats());

    let mut diag = Diagnostics::new();
    network.validate_into(&mut diag);
    if !diag.is_empty() {
        warn!("network check: {}", diag.summary());
    }
    for issue in diag.iter() {
        warn!("{issue}");
    }
    Ok((network, case.objective_config()))
}

impl SolverArgs {
    /// Layer command-line overrides on top of the case settings.
    pub(crate) fn apply(&self, mut config: ObjectiveConfig) -> Result<ObjectiveConfig> {
        if let Some(name) = &self.solver {
            let kind: SolverKind = name.parse()?;
            config.solver = config.solver.with_linear_solver(kind);
        }
        if let Some(tol) = self.tolerance {
            config.solver = config.solver.with_tolerance(tol);
        }
        if let Some(max_iter) = self.max_iterations {
            config.solver = config.solver.with_max_iterations(max_iter);
        }
        Ok(config)
    }
}

pub(crate) fn write_json<T: Serialize>(data: &T, pretty: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut writer, data)?;
    } else {
        serde_json::to_writer(&mut writer, data)?;
    }
    writeln!(writer)?;
    Ok(())
}
