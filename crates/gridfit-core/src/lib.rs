//! # gridfit-core: Network Model
//!
//! Immutable description of a balanced, single-phase-equivalent transmission
//! network: buses, branches and generators, all on a common MVA base.
//!
//! ## Arena layout
//!
//! Records live in dense vectors. Buses are stored in ascending [`BusId`]
//! order, and the position of a bus in that vector is its *index*; every
//! numerical routine works on indices, never on ids. Branches and generators
//! keep their bus ids as foreign keys and the network resolves them to
//! indices once, at construction time:
//!
//! ```text
//!   BusId ──bus_index()──▶ usize ──buses()[i]──▶ &Bus
//!   Branch k ──branch_terminals(k)──▶ (from_idx, to_idx)
//!   Gen g    ──generator_bus(g)─────▶ bus_idx
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use gridfit_core::*;
//!
//! let mut builder = NetworkBuilder::new(100.0);
//! builder.add_bus(Bus::new(BusId::new(0), BusType::Slack));
//! builder.add_bus(Bus::new(BusId::new(1), BusType::PQ).with_load(100.0, 50.0));
//! builder.add_branch(
//!     Branch::new(BranchId::new(0), BusId::new(0), BusId::new(1), 0.01, 0.1)
//!         .with_rating(250.0),
//! );
//! builder.add_generator(
//!     Gen::new(GenId::new(0), BusId::new(0))
//!         .with_p_limits(0.0, 300.0)
//!         .as_slack(),
//! );
//!
//! let network = builder.build().unwrap();
//! assert_eq!(network.bus_count(), 2);
//! assert_eq!(network.slack_index(), 0);
//! ```
//!
//! ## Modules
//!
//! - [`builder`] - construction and configuration-error checks
//! - [`diagnostics`] - non-fatal findings about a network
//! - [`graph_utils`] - connectivity analysis
//! - [`solver`] - dense linear-system backends

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod solver;
pub mod units;

pub use builder::NetworkBuilder;
pub use diagnostics::{DiagnosticIssue, Diagnostics, IssueCategory};
pub use error::{GridError, GridResult, NetworkError};
pub use solver::{LinearSystemBackend, SolverKind};
pub use units::{Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit, Radians};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(usize);

macro_rules! impl_id {
    ($type:ident, $label:literal) => {
        impl $type {
            #[inline]
            pub fn new(value: usize) -> Self {
                $type(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", $label, self.0)
            }
        }
    };
}

impl_id!(BusId, "Bus");
impl_id!(BranchId, "Branch");
impl_id!(GenId, "Gen");

/// Bus type classification for power flow
///
/// ```text
/// BUS TYPE │ SPECIFIED     │ SOLVED FOR
/// ─────────┼───────────────┼───────────
/// Slack    │ |V|, θ = 0    │ P, Q
/// PV       │ P, |V|        │ Q, θ
/// PQ       │ P, Q          │ |V|, θ
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    Slack,
    PV,
    PQ,
}

impl BusType {
    /// Voltage magnitude is held at its setpoint (not solved for)
    pub fn controls_voltage(self) -> bool {
        !matches!(self, BusType::PQ)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    #[serde(default)]
    pub name: String,
    pub bus_type: BusType,
    /// Nominal voltage base
    #[serde(default)]
    pub base_kv: Kilovolts,
    /// Initial (PQ) or controlled (PV/Slack) voltage magnitude
    #[serde(default = "default_voltage")]
    pub voltage_pu: PerUnit,
    /// Initial voltage angle; the slack angle is always forced to zero
    #[serde(default)]
    pub angle_rad: Radians,
    /// Active power demand (consumption is positive)
    #[serde(default)]
    pub load_p: Megawatts,
    /// Reactive power demand (consumption is positive)
    #[serde(default)]
    pub load_q: Megavars,
}

fn default_voltage() -> PerUnit {
    PerUnit::ONE
}

impl Bus {
    pub fn new(id: BusId, bus_type: BusType) -> Self {
        Self {
            id,
            name: String::new(),
            bus_type,
            base_kv: Kilovolts(0.0),
            voltage_pu: PerUnit::ONE,
            angle_rad: Radians::ZERO,
            load_p: Megawatts(0.0),
            load_q: Megavars(0.0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set demand in MW / Mvar
    pub fn with_load(mut self, p_mw: f64, q_mvar: f64) -> Self {
        self.load_p = Megawatts(p_mw);
        self.load_q = Megavars(q_mvar);
        self
    }

    pub fn with_voltage(mut self, vm_pu: f64) -> Self {
        self.voltage_pu = PerUnit(vm_pu);
        self
    }

    pub fn with_base_kv(mut self, kv: f64) -> Self {
        self.base_kv = Kilovolts(kv);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    #[default]
    Line,
    Transformer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    #[serde(default)]
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series resistance (per-unit on system base)
    pub resistance: f64,
    /// Series reactance (per-unit on system base)
    pub reactance: f64,
    /// Thermal rating; `None` means unlimited
    #[serde(default)]
    pub rating: Option<MegavoltAmperes>,
    #[serde(default)]
    pub kind: BranchKind,
}

impl Branch {
    pub fn new(
        id: BranchId,
        from_bus: BusId,
        to_bus: BusId,
        resistance: f64,
        reactance: f64,
    ) -> Self {
        Self {
            id,
            name: String::new(),
            from_bus,
            to_bus,
            resistance,
            reactance,
            rating: None,
            kind: BranchKind::Line,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a thermal rating in MVA.
    pub fn with_rating(mut self, rating_mva: f64) -> Self {
        self.rating = Some(MegavoltAmperes(rating_mva));
        self
    }

    pub fn as_transformer(mut self) -> Self {
        self.kind = BranchKind::Transformer;
        self
    }
}

/// Generator operating cost.
///
/// `cost = a·P² + b·P + c + d·Q² + e·Q` with P in MW and Q in Mvar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenCost {
    #[serde(default)]
    pub cost_a: f64,
    #[serde(default)]
    pub cost_b: f64,
    #[serde(default)]
    pub cost_c: f64,
    #[serde(default)]
    pub cost_d: f64,
    #[serde(default)]
    pub cost_e: f64,
}

impl GenCost {
    /// Active-power-only quadratic cost
    pub fn quadratic(a: f64, b: f64, c: f64) -> Self {
        Self {
            cost_a: a,
            cost_b: b,
            cost_c: c,
            ..Self::default()
        }
    }

    pub fn with_reactive(mut self, d: f64, e: f64) -> Self {
        self.cost_d = d;
        self.cost_e = e;
        self
    }

    pub fn evaluate(&self, p_mw: f64, q_mvar: f64) -> f64 {
        self.cost_a * p_mw * p_mw
            + self.cost_b * p_mw
            + self.cost_c
            + self.cost_d * q_mvar * q_mvar
            + self.cost_e * q_mvar
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gen {
    pub id: GenId,
    #[serde(default)]
    pub name: String,
    /// Foreign key to the bus this generator injects into
    pub bus: BusId,
    /// Initial active power output
    #[serde(default)]
    pub active_power: Megawatts,
    /// Initial reactive power output
    #[serde(default)]
    pub reactive_power: Megavars,
    pub pmin: Megawatts,
    pub pmax: Megawatts,
    #[serde(default = "default_qmin")]
    pub qmin: Megavars,
    #[serde(default = "default_qmax")]
    pub qmax: Megavars,
    #[serde(default = "default_voltage")]
    pub voltage_setpoint: PerUnit,
    #[serde(default)]
    pub slack: bool,
    #[serde(default)]
    pub cost: GenCost,
}

fn default_qmin() -> Megavars {
    Megavars(f64::NEG_INFINITY)
}

fn default_qmax() -> Megavars {
    Megavars(f64::INFINITY)
}

impl Gen {
    /// Create a new generator with unbounded limits and no cost
    pub fn new(id: GenId, bus: BusId) -> Self {
        Self {
            id,
            name: String::new(),
            bus,
            active_power: Megawatts(0.0),
            reactive_power: Megavars(0.0),
            pmin: Megawatts(0.0),
            pmax: Megawatts(f64::INFINITY),
            qmin: default_qmin(),
            qmax: default_qmax(),
            voltage_setpoint: PerUnit::ONE,
            slack: false,
            cost: GenCost::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set active power limits (in MW)
    pub fn with_p_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = Megawatts(pmin);
        self.pmax = Megawatts(pmax);
        self
    }

    /// Set reactive power limits (in Mvar)
    pub fn with_q_limits(mut self, qmin: f64, qmax: f64) -> Self {
        self.qmin = Megavars(qmin);
        self.qmax = Megavars(qmax);
        self
    }

    /// Set the initial dispatch (MW / Mvar)
    pub fn with_output(mut self, p_mw: f64, q_mvar: f64) -> Self {
        self.active_power = Megawatts(p_mw);
        self.reactive_power = Megavars(q_mvar);
        self
    }

    pub fn with_voltage_setpoint(mut self, vm_pu: f64) -> Self {
        self.voltage_setpoint = PerUnit(vm_pu);
        self
    }

    pub fn with_cost(mut self, cost: GenCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn as_slack(mut self) -> Self {
        self.slack = true;
        self
    }

    /// Active power is a decision variable only when the unit can produce.
    pub fn is_dispatchable(&self) -> bool {
        self.pmax.value() > 0.0
    }
}

/// The validated network model.
///
/// Built by [`NetworkBuilder`]; there is no way to mutate it afterwards, so a
/// single instance can be shared read-only across threads.
#[derive(Debug, Clone)]
pub struct Network {
    base_mva: f64,
    buses: Vec<Bus>,
    branches: Vec<Branch>,
    generators: Vec<Gen>,
    bus_index: HashMap<BusId, usize>,
    branch_terminals: Vec<(usize, usize)>,
    generator_bus: Vec<usize>,
    generator_at_bus: Vec<Option<usize>>,
    slack: usize,
}

impl Network {
    /// System MVA base used for per-unit conversion
    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }

    /// Buses in ascending id order; slice position is the bus index
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn generators(&self) -> &[Gen] {
        &self.generators
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn bus_index(&self, id: BusId) -> Option<usize> {
        self.bus_index.get(&id).copied()
    }

    pub fn slack_index(&self) -> usize {
        self.slack
    }

    /// (from, to) bus indices of branch `k`
    pub fn branch_terminals(&self, k: usize) -> (usize, usize) {
        self.branch_terminals[k]
    }

    /// Bus index of generator `g`
    pub fn generator_bus(&self, g: usize) -> usize {
        self.generator_bus[g]
    }

    /// Position in [`Network::generators`] of the generator on bus `bus_idx`
    pub fn generator_at(&self, bus_idx: usize) -> Option<usize> {
        self.generator_at_bus[bus_idx]
    }

    pub fn total_load_mw(&self) -> f64 {
        self.buses.iter().map(|b| b.load_p.value()).sum()
    }

    pub fn total_capacity_mw(&self) -> f64 {
        self.generators
            .iter()
            .map(|g| g.pmax.value())
            .filter(|v| v.is_finite())
            .sum()
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            num_buses: self.buses.len(),
            num_branches: self.branches.len(),
            num_transformers: self
                .branches
                .iter()
                .filter(|b| b.kind == BranchKind::Transformer)
                .count(),
            num_gens: self.generators.len(),
            total_load_mw: self.total_load_mw(),
            total_load_mvar: self.buses.iter().map(|b| b.load_q.value()).sum(),
            total_gen_capacity_mw: self.total_capacity_mw(),
        }
    }

    /// Collect non-fatal findings about the network.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.total_gen_capacity_mw < stats.total_load_mw {
            diag.push(
                IssueCategory::Capacity,
                format!(
                    "generation capacity ({:.1} MW) is below total load ({:.1} MW)",
                    stats.total_gen_capacity_mw, stats.total_load_mw
                ),
            );
        }

        for (g, gen) in self.generators.iter().enumerate() {
            if self.buses[self.generator_bus[g]].bus_type == BusType::PQ {
                diag.push_for(
                    IssueCategory::Dispatch,
                    gen.id,
                    "generator sits on a PQ bus; its voltage setpoint is only an initial guess",
                );
            }
        }

        for branch in &self.branches {
            if branch.rating.is_none() {
                diag.push_for(
                    IssueCategory::Rating,
                    branch.id,
                    "no thermal rating; congestion is not scored",
                );
            }
        }
    }
}

/// Statistics about a network's size and capacity
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_branches: usize,
    pub num_transformers: usize,
    pub num_gens: usize,
    pub total_load_mw: f64,
    pub total_load_mvar: f64,
    pub total_gen_capacity_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} branches ({} transformers), {} gens ({:.0} MW), load {:.0} MW / {:.0} Mvar",
            self.num_buses,
            self.num_branches,
            self.num_transformers,
            self.num_gens,
            self.total_gen_capacity_mw,
            self.total_load_mw,
            self.total_load_mvar
        )
    }
}
