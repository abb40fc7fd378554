//! Branch power flows from a voltage solution.
//!
//! For a branch from bus f to bus t with series admittance y = 1/(r + jx):
//!
//! ```text
//! I_ft   = y·(V_f − V_t)
//! S_from = V_f·conj(I_ft)
//! S_to   = V_t·conj(−I_ft)
//! loss   = S_from + S_to
//! ```
//!
//! All values are per-unit on the network base.

use gridfit_core::{BranchId, Network};
use num_complex::Complex64;
use serde::Serialize;

use crate::power_flow::BusState;
use crate::ybus::series_admittance;

/// Complex flows at both ends of one branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BranchFlow {
    pub branch: BranchId,
    /// Power leaving the from bus
    #[serde(serialize_with = "serialize_complex")]
    pub s_from: Complex64,
    /// Power leaving the to bus
    #[serde(serialize_with = "serialize_complex")]
    pub s_to: Complex64,
}

fn serialize_complex<S: serde::Serializer>(value: &Complex64, s: S) -> Result<S::Ok, S::Error> {
    [value.re, value.im].serialize(s)
}

impl BranchFlow {
    /// Series losses (S_from + S_to)
    pub fn loss(&self) -> Complex64 {
        self.s_from + self.s_to
    }

    /// |S_from| (pu)
    pub fn apparent_from(&self) -> f64 {
        self.s_from.norm()
    }

    /// |S_from| as a fraction of `rating_pu`; `None` for an unlimited branch.
    pub fn loading(&self, rating_pu: f64) -> Option<f64> {
        (rating_pu > 0.0).then(|| self.apparent_from() / rating_pu)
    }
}

/// Flow on a single series branch.
pub fn branch_flow(r: f64, x: f64, v_from: Complex64, v_to: Complex64) -> (Complex64, Complex64) {
    let y = series_admittance(r, x).unwrap_or_default();
    let i_ft = y * (v_from - v_to);
    (v_from * i_ft.conj(), v_to * (-i_ft).conj())
}

/// Flows on every branch of `network` at `state`, in branch order.
pub fn branch_flows(network: &Network, state: &BusState) -> Vec<BranchFlow> {
    network
        .branches()
        .iter()
        .enumerate()
        .map(|(k, branch)| {
            let (f, t) = network.branch_terminals(k);
            let (s_from, s_to) = branch_flow(
                branch.resistance,
                branch.reactance,
                state.voltage(f),
                state.voltage(t),
            );
            BranchFlow {
                branch: branch.id,
                s_from,
                s_to,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flow_at_equal_voltages() {
        let v = Complex64::from_polar(1.02, -0.1);
        let (s_from, s_to) = branch_flow(0.01, 0.1, v, v);
        assert_eq!(s_from, Complex64::new(0.0, 0.0));
        assert_eq!(s_to, Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_lossless_line_transfers_all_power() {
        let (s_from, s_to) = branch_flow(
            0.0,
            0.2,
            Complex64::from_polar(1.0, 0.1),
            Complex64::from_polar(1.0, 0.0),
        );
        // P = sin(0.1)/0.2 for a lossless line
        assert!((s_from.re - 0.1_f64.sin() / 0.2).abs() < 1e-12);
        assert!((s_from.re + s_to.re).abs() < 1e-12);
    }

    #[test]
    fn test_resistive_loss_is_i_squared_r() {
        let vf = Complex64::from_polar(1.0, 0.05);
        let vt = Complex64::from_polar(0.98, 0.0);
        let (r, x) = (0.02, 0.1);
        let flow = BranchFlow {
            branch: BranchId::new(0),
            s_from: branch_flow(r, x, vf, vt).0,
            s_to: branch_flow(r, x, vf, vt).1,
        };
        let current = series_admittance(r, x).unwrap() * (vf - vt);
        let i2 = current.norm_sqr();
        assert!((flow.loss().re - i2 * r).abs() < 1e-12);
        assert!((flow.loss().im - i2 * x).abs() < 1e-12);
    }

    #[test]
    fn test_loading_fraction() {
        let flow = BranchFlow {
            branch: BranchId::new(1),
            s_from: Complex64::new(0.6, 0.8),
            s_to: Complex64::new(-0.6, -0.8),
        };
        assert!((flow.loading(2.0).unwrap() - 0.5).abs() < 1e-12);
        assert!(flow.loading(0.0).is_none());
    }
}
