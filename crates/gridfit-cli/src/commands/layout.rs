use anyhow::Result;
use gridfit_algo::{DecisionLayout, DecisionVariable, VariableKind};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;

use super::{load_case, write_json};

#[derive(Debug, Serialize)]
struct LayoutRow {
    index: usize,
    #[serde(flatten)]
    variable: DecisionVariable,
    /// Value stored in the case file
    initial: f64,
}

pub fn handle(case: &Path, json: bool) -> Result<()> {
    let (network, config) = load_case(case)?;
    let layout = DecisionLayout::new(&network, config.penalties.voltage_band());
    let initial = layout.encode(&layout.base_setpoints(&network))?;

    let rows: Vec<LayoutRow> = layout
        .variables()
        .iter()
        .cloned()
        .zip(initial)
        .enumerate()
        .map(|(index, (variable, initial))| LayoutRow {
            index,
            variable,
            initial,
        })
        .collect();

    if json {
        return write_json(&rows, true);
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "INDEX\tKIND\tBUS\tGEN\tLOWER\tUPPER\tINITIAL")?;
    for row in &rows {
        let kind = match row.variable.kind {
            VariableKind::ActivePower => "P (MW)",
            VariableKind::VoltageSetpoint => "V (pu)",
        };
        let gen = row
            .variable
            .gen
            .map(|g| g.value().to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.index,
            kind,
            row.variable.bus.value(),
            gen,
            row.variable.lower,
            row.variable.upper,
            row.initial
        )?;
    }
    writer.flush()?;
    eprintln!("{} decision values", layout.len());
    Ok(())
}
