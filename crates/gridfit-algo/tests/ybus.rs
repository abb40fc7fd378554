//! Y-bus construction tests

use gridfit_algo::YBus;
use gridfit_core::{
    Branch, BranchId, Bus, BusId, BusType, GridError, Network, NetworkBuilder, NetworkError,
};
use num_complex::Complex64;

fn line(id: usize, from: usize, to: usize, r: f64, x: f64) -> Branch {
    Branch::new(BranchId::new(id), BusId::new(from), BusId::new(to), r, x)
}

/// Five buses, a mesh with one transformer, no load and no generation.
fn unloaded_mesh() -> Network {
    let mut builder = NetworkBuilder::new(100.0);
    builder.add_bus(Bus::new(BusId::new(0), BusType::Slack));
    for id in 1..5 {
        builder.add_bus(Bus::new(BusId::new(id), BusType::PQ));
    }
    builder
        .add_branch(line(0, 0, 1, 0.02, 0.06))
        .add_branch(line(1, 0, 2, 0.08, 0.24))
        .add_branch(line(2, 1, 2, 0.06, 0.18))
        .add_branch(line(3, 1, 3, 0.06, 0.18))
        .add_branch(line(4, 2, 3, 0.01, 0.03))
        .add_branch(line(5, 3, 4, 0.0, 0.25).as_transformer());
    builder.build().unwrap()
}

#[test]
fn ybus_is_symmetric() {
    let ybus = YBus::from_network(&unloaded_mesh()).unwrap();
    let y = ybus.to_dense();
    for i in 0..ybus.n_bus() {
        for j in 0..ybus.n_bus() {
            assert_eq!(y[i][j], y[j][i], "Y[{i}][{j}] != Y[{j}][{i}]");
        }
    }
}

#[test]
fn ybus_rows_sum_to_zero() {
    let ybus = YBus::from_network(&unloaded_mesh()).unwrap();
    for (i, row) in ybus.to_dense().iter().enumerate() {
        let sum: Complex64 = row.iter().sum();
        assert!(sum.norm() < 1e-10, "row {i} sums to {sum}");
    }
}

#[test]
fn parallel_branches_accumulate() {
    let mut builder = NetworkBuilder::new(100.0);
    builder
        .add_bus(Bus::new(BusId::new(0), BusType::Slack))
        .add_bus(Bus::new(BusId::new(1), BusType::PQ))
        .add_branch(line(0, 0, 1, 0.0, 0.2))
        .add_branch(line(1, 1, 0, 0.0, 0.2));
    let ybus = YBus::from_network(&builder.build().unwrap()).unwrap();

    // Two j0.2 lines in parallel behave like one j0.1 line.
    assert!((ybus.b(0, 0) + 10.0).abs() < 1e-12);
    assert!((ybus.b(1, 0) - 10.0).abs() < 1e-12);
}

#[test]
fn off_diagonal_is_negative_series_admittance() {
    let ybus = YBus::from_network(&unloaded_mesh()).unwrap();
    let expected = -Complex64::new(0.02, 0.06).inv();
    assert!((ybus.y(0, 1) - expected).norm() < 1e-12);
    assert_eq!(ybus.y(0, 4), Complex64::new(0.0, 0.0));
}

#[test]
fn zero_impedance_is_rejected_at_construction() {
    let mut builder = NetworkBuilder::new(100.0);
    builder
        .add_bus(Bus::new(BusId::new(0), BusType::Slack))
        .add_bus(Bus::new(BusId::new(1), BusType::PQ))
        .add_branch(line(7, 0, 1, 0.0, 0.0));

    match builder.build() {
        Err(GridError::Network(NetworkError::ZeroImpedance(id))) => {
            assert_eq!(id, BranchId::new(7))
        }
        other => panic!("expected zero-impedance error, got {:?}", other.map(|_| ())),
    }
}
