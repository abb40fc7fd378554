//! Per-generation fitness summaries.
//!
//! The optimizer owns a [`RunHistory`] and pushes one [`GenerationRecord`]
//! per generation; the objective itself keeps no state between calls.

use serde::Serialize;

/// Best, mean and worst fitness of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
}

impl GenerationRecord {
    /// Summarize a generation's fitness values (lower is better).
    ///
    /// Returns `None` for an empty slice.
    pub fn from_fitness(generation: usize, fitness: &[f64]) -> Option<Self> {
        if fitness.is_empty() {
            return None;
        }
        let best = fitness.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = fitness.iter().sum::<f64>() / fitness.len() as f64;
        Some(Self {
            generation,
            best,
            mean,
            worst,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunHistory {
    records: Vec<GenerationRecord>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GenerationRecord) {
        self.records.push(record);
    }

    /// Summarize and append; empty generations are skipped.
    pub fn record(&mut self, fitness: &[f64]) -> Option<GenerationRecord> {
        let record = GenerationRecord::from_fitness(self.records.len(), fitness)?;
        self.records.push(record);
        Some(record)
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lowest fitness over all generations
    pub fn best(&self) -> Option<f64> {
        self.records.iter().map(|r| r.best).reduce(f64::min)
    }

    /// `true` when no generation ever scored below `penalty`.
    ///
    /// Such a run sits on the non-convergence floor and its "optimum" is not
    /// a solution; reporting should say so.
    pub fn never_converged(&self, penalty: f64) -> bool {
        !self.records.is_empty() && self.records.iter().all(|r| r.best >= penalty)
    }
}
