//! Dispatch objective tests

use gridfit_algo::objective::penalty::{congestion_penalty, voltage_penalty};
use gridfit_algo::{
    branch_flows, DispatchObjective, Objective, ObjectiveConfig, PenaltyWeights, RunHistory,
};
use gridfit_core::{
    Branch, BranchId, Bus, BusId, BusType, Gen, GenCost, GenId, GridError, Network, NetworkBuilder,
};

fn line(id: usize, from: usize, to: usize, r: f64, x: f64) -> Branch {
    Branch::new(BranchId::new(id), BusId::new(from), BusId::new(to), r, x)
}

/// Slack at bus 0, 100 MW / 50 Mvar load at bus 1, optional rating on the line.
fn two_bus(rating_mva: Option<f64>) -> Network {
    let mut branch = line(0, 0, 1, 0.01, 0.1);
    if let Some(rating) = rating_mva {
        branch = branch.with_rating(rating);
    }
    let mut builder = NetworkBuilder::new(100.0);
    builder
        .add_bus(Bus::new(BusId::new(0), BusType::Slack))
        .add_bus(Bus::new(BusId::new(1), BusType::PQ).with_load(100.0, 50.0))
        .add_branch(branch)
        .add_generator(
            Gen::new(GenId::new(0), BusId::new(0))
                .with_p_limits(0.0, 300.0)
                .with_q_limits(-200.0, 200.0)
                .with_cost(GenCost::quadratic(0.01, 20.0, 50.0))
                .as_slack(),
        );
    builder.build().unwrap()
}

/// Three buses; the PV unit's quadratic coefficient is a parameter.
fn three_bus(pv_cost_a: f64) -> Network {
    let mut builder = NetworkBuilder::new(100.0);
    builder
        .add_bus(Bus::new(BusId::new(0), BusType::Slack))
        .add_bus(Bus::new(BusId::new(1), BusType::PV))
        .add_bus(Bus::new(BusId::new(2), BusType::PQ).with_load(150.0, 40.0))
        .add_branch(line(0, 0, 2, 0.01, 0.08).with_rating(250.0))
        .add_branch(line(1, 1, 2, 0.01, 0.08).with_rating(250.0))
        .add_branch(line(2, 0, 1, 0.02, 0.10).with_rating(250.0))
        .add_generator(
            Gen::new(GenId::new(0), BusId::new(0))
                .with_p_limits(0.0, 250.0)
                .with_q_limits(-150.0, 150.0)
                .with_cost(GenCost::quadratic(0.02, 18.0, 0.0))
                .as_slack(),
        )
        .add_generator(
            Gen::new(GenId::new(1), BusId::new(1))
                .with_p_limits(10.0, 120.0)
                .with_q_limits(-80.0, 80.0)
                .with_cost(GenCost::quadratic(pv_cost_a, 14.0, 0.0).with_reactive(0.001, 0.0)),
        );
    builder.build().unwrap()
}

fn objective(network: Network) -> DispatchObjective {
    DispatchObjective::new(network, ObjectiveConfig::default()).unwrap()
}

#[test]
fn layout_round_trip_recovers_setpoints() {
    let objective = objective(three_bus(0.03));
    let layout = objective.layout();

    let x = vec![70.0, 1.02, 1.04];
    let setpoints = layout.decode(&x).unwrap();
    assert_eq!(setpoints.generators.len(), 1);
    assert_eq!(setpoints.generators[0].p_mw, Some(70.0));
    assert_eq!(setpoints.generators[0].vm_pu, 1.02);
    assert_eq!(setpoints.slack_vm_pu, 1.04);

    let encoded = layout.encode(&setpoints).unwrap();
    assert_eq!(encoded, x);
    assert_eq!(layout.decode(&encoded).unwrap(), setpoints);
}

#[test]
fn length_mismatch_is_a_configuration_error() {
    let objective = objective(three_bus(0.03));
    for bad in [vec![], vec![70.0, 1.02], vec![70.0, 1.02, 1.04, 1.0]] {
        assert!(matches!(objective.evaluate(&bad), Err(GridError::Config(_))));
    }
}

#[test]
fn raising_cost_a_raises_the_objective() {
    let x = [80.0, 1.02, 1.03];
    let cheap = objective(three_bus(0.01)).evaluate_detailed(&x).unwrap();
    let dear = objective(three_bus(0.05)).evaluate_detailed(&x).unwrap();

    assert!(cheap.converged && dear.converged);
    assert!(dear.total > cheap.total);
    // Only the generation cost differs: 0.04 $/MW² × (80 MW)²
    assert!((dear.generation_cost - cheap.generation_cost - 0.04 * 6400.0).abs() < 1e-2);
    assert_eq!(dear.active_loss, cheap.active_loss);
    assert_eq!(dear.voltage, cheap.voltage);
    assert_eq!(dear.capacity, cheap.capacity);
    assert_eq!(dear.congestion, cheap.congestion);
}

#[test]
fn two_bus_scenario_scores_finite_cost() {
    let objective = objective(two_bus(None));
    assert_eq!(objective.dimension(), 1);

    let breakdown = objective.evaluate_detailed(&[1.0]).unwrap();
    assert!(breakdown.converged);
    assert_eq!(breakdown.capacity_violations, 0);
    assert!(breakdown.total < 1e6);
    assert!(breakdown.active_loss > 0.0);
}

#[test]
fn singular_jacobian_returns_non_convergence_penalty() {
    let objective = objective(two_bus(None));
    // Slack voltage of zero leaves the load bus without an angle reference.
    let cost = objective.evaluate(&[0.0]).unwrap();
    assert_eq!(cost, PenaltyWeights::default().non_convergence);

    let breakdown = objective.evaluate_detailed(&[0.0]).unwrap();
    assert!(!breakdown.converged);
    assert_eq!(breakdown.generation_cost, 0.0);
}

#[test]
fn non_finite_decision_values_return_non_convergence_penalty() {
    let objective = objective(three_bus(0.03));
    let penalty = PenaltyWeights::default().non_convergence;
    for x in [
        [f64::NAN, 1.02, 1.03],
        [f64::INFINITY, 1.02, 1.03],
        [70.0, f64::NAN, 1.03],
        [70.0, 1.02, f64::NEG_INFINITY],
    ] {
        assert_eq!(objective.evaluate(&x).unwrap(), penalty, "x = {x:?}");
        let breakdown = objective.evaluate_detailed(&x).unwrap();
        assert!(!breakdown.converged);
        assert_eq!(breakdown.non_convergence, penalty);
    }
}

/// Slack at bus 0; a 30 MW unit sits on the PQ load bus.
fn generator_on_pq_bus() -> Network {
    let mut builder = NetworkBuilder::new(100.0);
    builder
        .add_bus(Bus::new(BusId::new(0), BusType::Slack))
        .add_bus(Bus::new(BusId::new(1), BusType::PQ).with_load(80.0, 20.0))
        .add_branch(line(0, 0, 1, 0.01, 0.1))
        .add_generator(
            Gen::new(GenId::new(0), BusId::new(0))
                .with_p_limits(0.0, 200.0)
                .with_q_limits(-100.0, 100.0)
                .with_cost(GenCost::quadratic(0.02, 15.0, 0.0))
                .as_slack(),
        )
        .add_generator(
            Gen::new(GenId::new(1), BusId::new(1))
                .with_p_limits(0.0, 50.0)
                .with_q_limits(-20.0, 20.0)
                .with_output(30.0, 0.0)
                .with_cost(GenCost::quadratic(0.01, 10.0, 0.0)),
        );
    builder.build().unwrap()
}

#[test]
fn pq_bus_generator_voltage_only_seeds_the_solve() {
    let objective = objective(generator_on_pq_bus());
    // P and V for the PQ-bus unit, V for the slack
    assert_eq!(objective.dimension(), 3);

    let low = objective.evaluate_detailed(&[30.0, 0.97, 1.02]).unwrap();
    let high = objective.evaluate_detailed(&[30.0, 1.03, 1.02]).unwrap();
    assert!(low.converged && high.converged);
    assert!((low.total - high.total).abs() < 1e-3);

    let solved_low = objective.solve_setpoints(&[30.0, 0.97, 1.02]).unwrap();
    let solved_high = objective.solve_setpoints(&[30.0, 1.03, 1.02]).unwrap();
    let (a, b) = (solved_low.state(), solved_high.state());
    assert!((a.vm[1] - b.vm[1]).abs() < 1e-6);
}

#[test]
fn non_convergence_penalty_is_configurable() {
    let config = ObjectiveConfig {
        penalties: PenaltyWeights::default().with_non_convergence(5e8),
        ..ObjectiveConfig::default()
    };
    let objective = DispatchObjective::new(two_bus(None), config).unwrap();
    assert_eq!(objective.evaluate(&[0.0]).unwrap(), 5e8);
}

#[test]
fn voltage_band_edges() {
    let w = PenaltyWeights::default().voltage;
    assert_eq!(voltage_penalty(0.95, 0.95, 1.05, w), 0.0);
    assert_eq!(voltage_penalty(1.05, 0.95, 1.05, w), 0.0);
    let just_below = voltage_penalty(0.949999, 0.95, 1.05, w);
    assert!(just_below > 0.0 && just_below < 1e-3);
}

#[test]
fn slack_voltage_on_band_edge_is_not_penalized() {
    let objective = objective(two_bus(None));
    let breakdown = objective.evaluate_detailed(&[1.05]).unwrap();
    assert!(breakdown.converged);
    // The load bus sags below the slack, but stays inside the band.
    assert_eq!(breakdown.voltage, 0.0);
}

/// |S_from| (MVA) on the two-bus line at slack V = 1.0.
fn two_bus_line_flow_mva() -> f64 {
    let objective = objective(two_bus(None));
    let outcome = objective.solve_setpoints(&[1.0]).unwrap();
    let flows = branch_flows(objective.network(), outcome.solved().unwrap().state());
    flows[0].apparent_from() * objective.network().base_mva()
}

#[test]
fn line_at_ninety_percent_is_not_congested() {
    let flow = two_bus_line_flow_mva();
    let objective = objective(two_bus(Some(flow / 0.9)));
    let breakdown = objective.evaluate_detailed(&[1.0]).unwrap();
    assert!(breakdown.congestion < 1e-12, "got {}", breakdown.congestion);
}

#[test]
fn line_at_ninety_one_percent_pays_square_of_excess() {
    let flow = two_bus_line_flow_mva();
    let rating = flow / 0.91;
    let objective = objective(two_bus(Some(rating)));
    let breakdown = objective.evaluate_detailed(&[1.0]).unwrap();

    let weight = PenaltyWeights::default().congestion;
    let rating_pu = rating / 100.0;
    let expected = weight * (0.01 * rating_pu).powi(2);
    assert_eq!(breakdown.congested_branches, 1);
    assert!((breakdown.congestion - expected).abs() / expected < 1e-6);
    assert!(
        (congestion_penalty(0.91 * rating_pu, rating_pu, 0.9, weight) - expected).abs() / expected
            < 1e-6
    );
}

#[test]
fn reactive_limit_breach_adds_capacity_penalty() {
    let mut builder = NetworkBuilder::new(100.0);
    builder
        .add_bus(Bus::new(BusId::new(0), BusType::Slack))
        .add_bus(Bus::new(BusId::new(1), BusType::PQ).with_load(100.0, 50.0))
        .add_branch(line(0, 0, 1, 0.01, 0.1))
        .add_generator(
            Gen::new(GenId::new(0), BusId::new(0))
                .with_p_limits(0.0, 80.0)
                .with_q_limits(-10.0, 10.0)
                .as_slack(),
        );
    let objective = objective(builder.build().unwrap());
    let breakdown = objective.evaluate_detailed(&[1.0]).unwrap();

    // Q above 10 Mvar and P above 80 MW
    assert_eq!(breakdown.capacity_violations, 2);
    assert_eq!(breakdown.capacity, 2.0 * PenaltyWeights::default().capacity);
}

#[test]
fn evaluations_share_nothing_across_threads() {
    let objective = objective(three_bus(0.03));
    let expected = objective.evaluate(&[60.0, 1.01, 1.02]).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    assert_eq!(objective.evaluate(&[60.0, 1.01, 1.02]).unwrap(), expected);
                    let _ = objective.evaluate(&[0.0, 0.0, 0.0]);
                }
            });
        }
    });
}

#[test]
fn run_stuck_on_penalty_floor_is_flagged() {
    let objective = objective(two_bus(None));
    let penalty = objective.config().penalties.non_convergence;
    let population = vec![vec![0.0], vec![0.0]];

    let mut history = RunHistory::new();
    let fitness: Vec<f64> = objective
        .evaluate_population(&population)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    history.record(&fitness);
    assert!(history.never_converged(penalty));

    let fitness: Vec<f64> = objective
        .evaluate_population(&[vec![1.0]])
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    history.record(&fitness);
    assert!(!history.never_converged(penalty));
}
