//! Decision-vector layout.
//!
//! The vector handed to the optimizer is laid out as
//!
//! ```text
//! for each non-slack generator, in ascending bus id:
//!     [P (MW)]   only when p_max > 0
//!     V (pu)
//! V_slack (pu)
//! ```
//!
//! `bounds()` and `decode()` both walk the same entry list, so the two cannot
//! disagree on the order.
//!
//! A generator on a PQ bus still owns a V slot. The power flow solves for
//! that bus voltage, so the value only seeds the initial guess and does not
//! move the converged operating point.

use gridfit_core::{BusId, GenId, GridError, GridResult, Network};
use serde::Serialize;

use crate::power_flow::BusState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Active power setpoint in MW
    ActivePower,
    /// Voltage magnitude setpoint in pu
    VoltageSetpoint,
}

/// One slot of the decision vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionVariable {
    pub kind: VariableKind,
    pub bus: BusId,
    /// `None` for the slack voltage when no generator sits on the slack bus
    pub gen: Option<GenId>,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone)]
struct Entry {
    gen_index: usize,
    bus_index: usize,
    dispatchable: bool,
}

/// Setpoints of one non-slack generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenSetpoint {
    pub gen_index: usize,
    pub bus_index: usize,
    pub p_mw: Option<f64>,
    pub vm_pu: f64,
}

/// A decoded decision vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Setpoints {
    pub generators: Vec<GenSetpoint>,
    pub slack_bus: usize,
    pub slack_vm_pu: f64,
}

impl Setpoints {
    /// Write the setpoints onto `state`.
    pub fn apply(&self, state: &mut BusState, base_mva: f64) {
        for sp in &self.generators {
            if let Some(p_mw) = sp.p_mw {
                state.p_gen[sp.bus_index] = p_mw / base_mva;
            }
            state.vm[sp.bus_index] = sp.vm_pu;
        }
        state.vm[self.slack_bus] = self.slack_vm_pu;
    }
}

/// The explicit order in which decision values map onto generators.
#[derive(Debug, Clone)]
pub struct DecisionLayout {
    entries: Vec<Entry>,
    slack_bus: usize,
    variables: Vec<DecisionVariable>,
}

impl DecisionLayout {
    /// Layout for `network`; voltage variables are bounded by `voltage_band`.
    pub fn new(network: &Network, voltage_band: (f64, f64)) -> Self {
        let slack_bus = network.slack_index();
        let (vmin, vmax) = voltage_band;

        // Bus indices follow bus id order, so this sorts by bus id.
        let mut entries: Vec<Entry> = (0..network.generators().len())
            .filter(|&g| network.generator_bus(g) != slack_bus)
            .map(|g| Entry {
                gen_index: g,
                bus_index: network.generator_bus(g),
                dispatchable: network.generators()[g].is_dispatchable(),
            })
            .collect();
        entries.sort_by_key(|e| e.bus_index);

        let mut variables = Vec::with_capacity(2 * entries.len() + 1);
        for entry in &entries {
            let gen = &network.generators()[entry.gen_index];
            if entry.dispatchable {
                variables.push(DecisionVariable {
                    kind: VariableKind::ActivePower,
                    bus: gen.bus,
                    gen: Some(gen.id),
                    lower: gen.pmin.value(),
                    upper: gen.pmax.value(),
                });
            }
            variables.push(DecisionVariable {
                kind: VariableKind::VoltageSetpoint,
                bus: gen.bus,
                gen: Some(gen.id),
                lower: vmin,
                upper: vmax,
            });
        }
        variables.push(DecisionVariable {
            kind: VariableKind::VoltageSetpoint,
            bus: network.buses()[slack_bus].id,
            gen: network
                .generator_at(slack_bus)
                .map(|g| network.generators()[g].id),
            lower: vmin,
            upper: vmax,
        });

        Self {
            entries,
            slack_bus,
            variables,
        }
    }

    /// Number of decision values
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variables(&self) -> &[DecisionVariable] {
        &self.variables
    }

    /// `(lower, upper)` per decision value, in vector order
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.variables.iter().map(|v| (v.lower, v.upper)).collect()
    }

    /// Split `x` into generator setpoints.
    ///
    /// A length mismatch is a configuration error.
    pub fn decode(&self, x: &[f64]) -> GridResult<Setpoints> {
        if x.len() != self.len() {
            return Err(GridError::Config(format!(
                "decision vector has {} values, layout expects {}",
                x.len(),
                self.len()
            )));
        }

        let mut values = x.iter().copied();
        let mut next = || values.next().unwrap_or(f64::NAN);
        let generators = self
            .entries
            .iter()
            .map(|entry| {
                let p_mw = entry.dispatchable.then(&mut next);
                GenSetpoint {
                    gen_index: entry.gen_index,
                    bus_index: entry.bus_index,
                    p_mw,
                    vm_pu: next(),
                }
            })
            .collect();
        let slack_vm_pu = next();

        Ok(Setpoints {
            generators,
            slack_bus: self.slack_bus,
            slack_vm_pu,
        })
    }

    /// Flatten setpoints back into a decision vector.
    pub fn encode(&self, setpoints: &Setpoints) -> GridResult<Vec<f64>> {
        let shape_matches = setpoints.generators.len() == self.entries.len()
            && setpoints.slack_bus == self.slack_bus
            && self
                .entries
                .iter()
                .zip(&setpoints.generators)
                .all(|(e, sp)| e.gen_index == sp.gen_index && e.dispatchable == sp.p_mw.is_some());
        if !shape_matches {
            return Err(GridError::Config(
                "setpoints do not match the decision layout".to_string(),
            ));
        }

        let mut x = Vec::with_capacity(self.len());
        for sp in &setpoints.generators {
            if let Some(p_mw) = sp.p_mw {
                x.push(p_mw);
            }
            x.push(sp.vm_pu);
        }
        x.push(setpoints.slack_vm_pu);
        Ok(x)
    }

    /// Setpoints as stored in the network data.
    pub fn base_setpoints(&self, network: &Network) -> Setpoints {
        let generators = self
            .entries
            .iter()
            .map(|entry| {
                let gen = &network.generators()[entry.gen_index];
                GenSetpoint {
                    gen_index: entry.gen_index,
                    bus_index: entry.bus_index,
                    p_mw: entry.dispatchable.then(|| gen.active_power.value()),
                    vm_pu: gen.voltage_setpoint.value(),
                }
            })
            .collect();
        let slack_vm_pu = match network.generator_at(self.slack_bus) {
            Some(g) => network.generators()[g].voltage_setpoint.value(),
            None => network.buses()[self.slack_bus].voltage_pu.value(),
        };

        Setpoints {
            generators,
            slack_bus: self.slack_bus,
            slack_vm_pu,
        }
    }
}
