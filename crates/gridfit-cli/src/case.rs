//! Case files: a network plus optional objective settings.
//!
//! ```toml
//! base_mva = 100.0
//!
//! [[buses]]
//! id = 1
//! bus_type = "slack"
//!
//! [[branches]]
//! id = 1
//! from_bus = 1
//! to_bus = 2
//! resistance = 0.01
//! reactance = 0.1
//!
//! [[generators]]
//! id = 1
//! bus = 1
//! pmin = 0.0
//! pmax = 200.0
//! slack = true
//!
//! [objective.penalties]
//! capacity = 5e6
//! ```

use anyhow::{bail, Context, Result};
use gridfit_algo::ObjectiveConfig;
use gridfit_core::{Branch, Bus, Gen, GridResult, Network, NetworkBuilder};
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_base_mva() -> f64 {
    100.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseFile {
    #[serde(default = "default_base_mva")]
    pub base_mva: f64,
    #[serde(default)]
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub generators: Vec<Gen>,
    #[serde(default)]
    pub objective: Option<ObjectiveConfig>,
}

impl CaseFile {
    /// Read a case; the format follows the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading case file {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Self::from_toml(&text),
            Some("json") => Self::from_json(&text),
            _ => bail!(
                "unsupported case file {} (expected .toml or .json)",
                path.display()
            ),
        }
        .with_context(|| format!("parsing case file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate the records and build the network.
    pub fn network(&self) -> GridResult<Network> {
        let mut builder = NetworkBuilder::new(self.base_mva);
        for bus in &self.buses {
            builder.add_bus(bus.clone());
        }
        for branch in &self.branches {
            builder.add_branch(branch.clone());
        }
        for gen in &self.generators {
            builder.add_generator(gen.clone());
        }
        builder.build()
    }

    pub fn objective_config(&self) -> ObjectiveConfig {
        self.objective.unwrap_or_default()
    }
}
