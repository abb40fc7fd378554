//! Penalty weights and the scalar penalty shapes.
//!
//! The default magnitudes matter more than their exact values: non-convergence
//! must dominate every feasible cost, and capacity violations must dominate
//! generation cost, or the search drifts into infeasible regions.

use serde::{Deserialize, Serialize};

/// Every constant of the penalty model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    /// Returned alone when the power flow does not converge
    pub non_convergence: f64,
    /// Added once per reactive-limit breach and once for a slack active-limit breach
    pub capacity: f64,
    /// Per MW of active loss
    pub active_loss: f64,
    /// Per Mvar of reactive loss
    pub reactive_loss: f64,
    /// Per pu² of distance outside the voltage band
    pub voltage: f64,
    /// Per pu² (system base) of flow above the congestion threshold
    pub congestion: f64,
    pub voltage_min: f64,
    pub voltage_max: f64,
    /// Fraction of the thermal rating where congestion starts
    pub congestion_threshold: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            non_convergence: 1e9,
            capacity: 1e6,
            active_loss: 1e3,
            reactive_loss: 1e2,
            voltage: 1e7,
            congestion: 1e7,
            voltage_min: 0.95,
            voltage_max: 1.05,
            congestion_threshold: 0.9,
        }
    }
}

impl PenaltyWeights {
    pub fn voltage_band(&self) -> (f64, f64) {
        (self.voltage_min, self.voltage_max)
    }

    pub fn with_voltage_band(mut self, vmin: f64, vmax: f64) -> Self {
        self.voltage_min = vmin;
        self.voltage_max = vmax;
        self
    }

    pub fn with_non_convergence(mut self, penalty: f64) -> Self {
        self.non_convergence = penalty;
        self
    }
}

/// `weight·d²` where d is the distance from `vm` to the band; zero inside
/// and on the band edges.
pub fn voltage_penalty(vm: f64, vmin: f64, vmax: f64, weight: f64) -> f64 {
    let d = if vm < vmin {
        vmin - vm
    } else if vm > vmax {
        vm - vmax
    } else {
        return 0.0;
    };
    weight * d * d
}

/// `weight·excess²` where excess is the flow above `threshold·rating`.
///
/// `flow` and `rating` must share a unit. A non-positive rating means the
/// branch is unlimited.
pub fn congestion_penalty(flow: f64, rating: f64, threshold: f64, weight: f64) -> f64 {
    if rating <= 0.0 {
        return 0.0;
    }
    let limit = threshold * rating;
    if flow > limit {
        let excess = flow - limit;
        weight * excess * excess
    } else {
        0.0
    }
}

/// `true` when `value` lies outside `[lo, hi]`.
pub fn outside(value: f64, lo: f64, hi: f64) -> bool {
    value < lo || value > hi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_band_edges_are_free() {
        assert_eq!(voltage_penalty(0.95, 0.95, 1.05, 1e7), 0.0);
        assert_eq!(voltage_penalty(1.05, 0.95, 1.05, 1e7), 0.0);
        assert_eq!(voltage_penalty(1.0, 0.95, 1.05, 1e7), 0.0);
    }

    #[test]
    fn voltage_just_outside_band_is_small_and_positive() {
        let penalty = voltage_penalty(0.949999, 0.95, 1.05, 1e7);
        assert!(penalty > 0.0);
        // (1e-6)² × 1e7
        assert!((penalty - 1e-5).abs() < 1e-9);
        assert!(voltage_penalty(1.06, 0.95, 1.05, 1e7) > penalty);
    }

    #[test]
    fn congestion_starts_above_threshold() {
        assert_eq!(congestion_penalty(0.9, 1.0, 0.9, 1e7), 0.0);
        assert_eq!(congestion_penalty(0.5, 1.0, 0.9, 1e7), 0.0);

        let weight = 1e7;
        let penalty = congestion_penalty(0.91, 1.0, 0.9, weight);
        let expected = weight * 0.01 * 0.01;
        assert!((penalty - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn congestion_scales_quadratically() {
        let one = congestion_penalty(0.91, 1.0, 0.9, 1.0);
        let two = congestion_penalty(0.92, 1.0, 0.9, 1.0);
        assert!((two / one - 4.0).abs() < 1e-6);
    }

    #[test]
    fn unlimited_branch_is_never_congested() {
        assert_eq!(congestion_penalty(50.0, 0.0, 0.9, 1e7), 0.0);
    }

    #[test]
    fn weights_deserialize_partially() {
        let weights: PenaltyWeights =
            serde_json::from_str(r#"{"voltage": 5.0, "voltage_min": 0.9}"#).unwrap();
        assert_eq!(weights.voltage, 5.0);
        assert_eq!(weights.voltage_band(), (0.9, 1.05));
        assert_eq!(weights.non_convergence, 1e9);
    }

    #[test]
    fn limits_check() {
        assert!(outside(-1.0, 0.0, 10.0));
        assert!(outside(10.5, 0.0, 10.0));
        assert!(!outside(10.0, 0.0, 10.0));
    }
}
