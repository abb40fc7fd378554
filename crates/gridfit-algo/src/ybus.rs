//! Sparse Y-bus (admittance) matrix.
//!
//! ```text
//! I = Y × V
//!
//! where Y[i,j] = G[i,j] + jB[i,j] (conductance + j×susceptance)
//! ```
//!
//! Each branch with series impedance z = r + jx contributes y = 1/z:
//!
//! ```text
//! Y[f,f] += y    Y[f,t] -= y
//! Y[t,t] += y    Y[t,f] -= y
//! ```
//!
//! Branch parameters are expected on the system base already; no per-unit
//! conversion happens here. The real and imaginary parts are kept in separate
//! CSR matrices with identical sparsity patterns.

use gridfit_core::{GridResult, Network, NetworkError};
use num_complex::Complex64;
use sprs::{CsMat, TriMat};
use tracing::debug;

/// Sparse Y-bus matrix in CSR format, indexed by bus index.
#[derive(Debug, Clone)]
pub struct YBus {
    n_bus: usize,
    /// Real part (conductance G)
    g_matrix: CsMat<f64>,
    /// Imaginary part (susceptance B)
    b_matrix: CsMat<f64>,
}

impl YBus {
    /// Build the admittance matrix from a validated network.
    ///
    /// Fails with [`NetworkError::ZeroImpedance`] if a branch has `r == 0`
    /// and `x == 0`.
    pub fn from_network(network: &Network) -> GridResult<Self> {
        let n_bus = network.bus_count();
        if n_bus == 0 {
            return Err(NetworkError::NoBuses.into());
        }

        let mut g_triplet = TriMat::new((n_bus, n_bus));
        let mut b_triplet = TriMat::new((n_bus, n_bus));

        for (k, branch) in network.branches().iter().enumerate() {
            let (f, t) = network.branch_terminals(k);
            let y = series_admittance(branch.resistance, branch.reactance)
                .ok_or(NetworkError::ZeroImpedance(branch.id))?;

            g_triplet.add_triplet(f, f, y.re);
            b_triplet.add_triplet(f, f, y.im);
            g_triplet.add_triplet(t, t, y.re);
            b_triplet.add_triplet(t, t, y.im);
            g_triplet.add_triplet(f, t, -y.re);
            b_triplet.add_triplet(f, t, -y.im);
            g_triplet.add_triplet(t, f, -y.re);
            b_triplet.add_triplet(t, f, -y.im);
        }

        let ybus = Self {
            n_bus,
            g_matrix: g_triplet.to_csr(),
            b_matrix: b_triplet.to_csr(),
        };
        debug!(n_bus, nnz = ybus.nnz(), "built Y-bus");
        Ok(ybus)
    }

    /// Number of buses
    pub fn n_bus(&self) -> usize {
        self.n_bus
    }

    /// Get G[i,j] (conductance)
    pub fn g(&self, i: usize, j: usize) -> f64 {
        self.g_matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Get B[i,j] (susceptance)
    pub fn b(&self, i: usize, j: usize) -> f64 {
        self.b_matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Get complex Y[i,j] = G[i,j] + jB[i,j]
    pub fn y(&self, i: usize, j: usize) -> Complex64 {
        Complex64::new(self.g(i, j), self.b(i, j))
    }

    /// Number of stored entries (G and B share a pattern)
    pub fn nnz(&self) -> usize {
        self.g_matrix.nnz()
    }

    /// Iterate over stored entries in row i of G.
    pub fn g_row_iter(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        row_iter(&self.g_matrix, i)
    }

    /// Iterate over stored entries in row i of B.
    pub fn b_row_iter(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        row_iter(&self.b_matrix, i)
    }

    /// Dense copy, for reporting and tests.
    pub fn to_dense(&self) -> Vec<Vec<Complex64>> {
        let mut dense = vec![vec![Complex64::new(0.0, 0.0); self.n_bus]; self.n_bus];
        for (i, row) in dense.iter_mut().enumerate() {
            for (j, g) in self.g_row_iter(i) {
                row[j].re = g;
            }
            for (j, b) in self.b_row_iter(i) {
                row[j].im = b;
            }
        }
        dense
    }
}

/// y = 1/(r + jx), or `None` for an exactly zero impedance.
pub fn series_admittance(r: f64, x: f64) -> Option<Complex64> {
    if r == 0.0 && x == 0.0 {
        return None;
    }
    Some(Complex64::new(r, x).inv())
}

fn row_iter(matrix: &CsMat<f64>, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    let indptr = matrix.indptr();
    let start = indptr.index(i);
    let end = indptr.index(i + 1);
    let indices = &matrix.indices()[start..end];
    let data = &matrix.data()[start..end];
    indices.iter().zip(data.iter()).map(|(&j, &v)| (j, v))
}
