//! Incremental network builder.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{GridResult, NetworkError};
use crate::graph_utils::unreachable_from;
use crate::{Branch, Bus, BusId, BusType, Gen, Network};

/// Builder for constructing a [`Network`] incrementally.
///
/// Use `add_bus`, `add_branch` and `add_generator` to collect records in any
/// order, then call `build()` to validate and freeze them. Cross-references
/// are only checked in `build()`, so a branch may be added before its buses.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    base_mva: f64,
    buses: Vec<Bus>,
    branches: Vec<Branch>,
    generators: Vec<Gen>,
}

impl NetworkBuilder {
    /// Create a new empty builder on the given system MVA base.
    pub fn new(base_mva: f64) -> Self {
        Self {
            base_mva,
            ..Self::default()
        }
    }

    pub fn add_bus(&mut self, bus: Bus) -> &mut Self {
        self.buses.push(bus);
        self
    }

    pub fn add_branch(&mut self, branch: Branch) -> &mut Self {
        self.branches.push(branch);
        self
    }

    pub fn add_generator(&mut self, gen: Gen) -> &mut Self {
        self.generators.push(gen);
        self
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Validate and return an immutable `Network`.
    ///
    /// Buses are re-ordered by id; branch and generator order is kept.
    pub fn build(self) -> GridResult<Network> {
        let NetworkBuilder {
            base_mva,
            mut buses,
            branches,
            generators,
        } = self;

        if !(base_mva.is_finite() && base_mva > 0.0) {
            return Err(NetworkError::InvalidBase(base_mva).into());
        }
        if buses.is_empty() {
            return Err(NetworkError::NoBuses.into());
        }

        buses.sort_by_key(|b| b.id);
        let mut bus_index = HashMap::with_capacity(buses.len());
        for (idx, bus) in buses.iter().enumerate() {
            if bus_index.insert(bus.id, idx).is_some() {
                return Err(NetworkError::DuplicateBus(bus.id).into());
            }
        }

        let slack_buses: Vec<_> = buses
            .iter()
            .filter(|b| b.bus_type == BusType::Slack)
            .map(|b| b.id)
            .collect();
        let slack = match slack_buses.as_slice() {
            [] => return Err(NetworkError::MissingSlack.into()),
            [id] => bus_index[id],
            _ => return Err(NetworkError::MultipleSlack(slack_buses).into()),
        };

        let lookup = |element: String, bus: BusId| {
            bus_index
                .get(&bus)
                .copied()
                .ok_or(NetworkError::UnknownBus { element, bus })
        };

        let mut branch_terminals = Vec::with_capacity(branches.len());
        for branch in &branches {
            let from = lookup(branch.id.to_string(), branch.from_bus)?;
            let to = lookup(branch.id.to_string(), branch.to_bus)?;
            if from == to {
                return Err(NetworkError::SelfLoop(branch.id).into());
            }
            let (r, x) = (branch.resistance, branch.reactance);
            if !(r.is_finite() && x.is_finite()) || r < 0.0 || x < 0.0 {
                return Err(NetworkError::NegativeImpedance(branch.id).into());
            }
            if r == 0.0 && x == 0.0 {
                return Err(NetworkError::ZeroImpedance(branch.id).into());
            }
            branch_terminals.push((from, to));
        }

        let mut generator_bus = Vec::with_capacity(generators.len());
        let mut generator_at_bus = vec![None; buses.len()];
        for (g, gen) in generators.iter().enumerate() {
            let bus = lookup(gen.id.to_string(), gen.bus)?;
            if gen.pmin.value() > gen.pmax.value() {
                return Err(NetworkError::InvalidLimits {
                    gen: gen.id,
                    what: "active power",
                }
                .into());
            }
            if gen.qmin.value() > gen.qmax.value() {
                return Err(NetworkError::InvalidLimits {
                    gen: gen.id,
                    what: "reactive power",
                }
                .into());
            }
            if generator_at_bus[bus].replace(g).is_some() {
                return Err(NetworkError::DuplicateGenerator(gen.bus).into());
            }
            generator_bus.push(bus);
        }

        let slack_gens: Vec<_> = generators.iter().filter(|g| g.slack).collect();
        if slack_gens.len() > 1 {
            return Err(
                NetworkError::MultipleSlackGenerators(slack_gens.iter().map(|g| g.id).collect())
                    .into(),
            );
        }
        if let Some(gen) = slack_gens.first() {
            if gen.bus != buses[slack].id {
                return Err(NetworkError::SlackGeneratorMismatch {
                    gen: gen.id,
                    bus: gen.bus,
                }
                .into());
            }
        }

        let islanded = unreachable_from(buses.len(), &branch_terminals, slack);
        if !islanded.is_empty() {
            return Err(
                NetworkError::Islanded(islanded.into_iter().map(|i| buses[i].id).collect()).into(),
            );
        }

        // The slack angle is the reference.
        buses[slack].angle_rad = crate::Radians::ZERO;

        debug!(
            buses = buses.len(),
            branches = branches.len(),
            generators = generators.len(),
            slack = %buses[slack].id,
            "network built"
        );

        Ok(Network {
            base_mva,
            buses,
            branches,
            generators,
            bus_index,
            branch_terminals,
            generator_bus,
            generator_at_bus,
            slack,
        })
    }
}
