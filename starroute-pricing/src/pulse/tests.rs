//! Unit tests for the pulse search.

use std::collections::BTreeMap;
use std::time::Duration;

use rstest::{fixture, rstest};
use starroute_core::test_support::{hub_instance, two_customer_instance};
use starroute_core::{Branch, Deadline, Direction, Edge, Instance, RmpLinearSolution};

use super::*;

#[fixture]
fn settings() -> PulseSettings {
    PulseSettings {
        bucket_size: 1,
        prune_unprofitable: false,
        record_improving: true,
        epsilon: 1e-6,
    }
}

fn duals(instance: &Instance, customer_duals: &[f64], branches: &[Branch]) -> PricingDuals {
    let solution = RmpLinearSolution {
        feasible: true,
        customer_duals: customer_duals.to_vec(),
        branch_duals: branches.iter().map(|b| (*b, 0.0)).collect::<BTreeMap<_, _>>(),
        ..RmpLinearSolution::default()
    };
    PricingDuals::new(instance, &solution, branches).expect("valid branches")
}

fn run(instance: &Instance, prices: &PricingDuals, settings: PulseSettings) -> PulseOutcome {
    let graph = EspprcGraph::new(instance);
    let ordered = order_by_benefit(&graph, instance, prices);
    let deadline = Deadline::new(Duration::from_secs(60));
    Pulse::new(instance, &graph, prices, &ordered, settings, &deadline)
        .run()
        .expect("pulse succeeds")
}

#[rstest]
fn finds_the_two_customer_tour(settings: PulseSettings) {
    let instance = two_customer_instance();
    let prices = duals(&instance, &[3.0, 3.0], &[]);
    let outcome = run(&instance, &prices, settings);

    assert!(!outcome.timed_out);
    let best = outcome.columns.first().expect("a negative column exists");
    assert_eq!(best.reduced_cost, -1.0);
    assert_eq!(best.route.cost(), 5.0);
}

#[rstest]
fn keeps_only_the_best_path_unless_recording(mut settings: PulseSettings) {
    settings.record_improving = false;
    let instance = hub_instance(3, 2, 1.0);
    let prices = duals(&instance, &[5.0, 4.0, 3.0], &[]);
    let outcome = run(&instance, &prices, settings);

    assert_eq!(outcome.columns.len(), 1);
    assert_eq!(outcome.columns.first().map(|c| c.reduced_cost), Some(-7.0));
}

#[rstest]
#[case(1, 0, -3.0)]
#[case(1, 1, -1.0)]
#[case(1, 2, 2.0)]
#[case(3, 0, 0.0)]
#[case(3, 2, 0.0)]
fn bounds_are_the_cheapest_completions(
    settings: PulseSettings,
    #[case] node: usize,
    #[case] bucket: usize,
    #[case] expected: f64,
) {
    let instance = two_customer_instance();
    let prices = duals(&instance, &[3.0, 3.0], &[]);
    let graph = EspprcGraph::new(&instance);
    let ordered = order_by_benefit(&graph, &instance, &prices);
    let deadline = Deadline::new(Duration::from_secs(60));
    let bounds = Pulse::new(&instance, &graph, &prices, &ordered, settings, &deadline).bounds();

    let value = bounds.get(node).and_then(|row| row.get(bucket)).copied();
    assert_eq!(value, Some(expected));
}

#[rstest]
fn pruning_skips_customers_without_dual(mut settings: PulseSettings) {
    settings.prune_unprofitable = true;
    let instance = two_customer_instance();
    let prices = duals(&instance, &[0.0, 5.0], &[]);
    let outcome = run(&instance, &prices, settings);

    assert!(!outcome.columns.is_empty());
    assert!(outcome.columns.iter().all(|c| !c.route.serves(1)));
}

#[rstest]
fn forbidding_branches_are_respected(settings: PulseSettings) {
    let instance = two_customer_instance();
    let forbid = Branch::VisitFlow {
        edge: Edge::new(1, 2),
        customer: 2,
        bound: 0,
        direction: Direction::Down,
    };
    let prices = duals(&instance, &[3.0, 3.0], &[forbid]);
    let outcome = run(&instance, &prices, settings);

    assert!(!outcome.columns.is_empty());
    assert!(outcome.columns.iter().all(|c| forbid.is_compatible(&c.route)));
}

#[rstest]
fn expired_deadline_reports_a_timeout(settings: PulseSettings) {
    let instance = two_customer_instance();
    let prices = duals(&instance, &[3.0, 3.0], &[]);
    let graph = EspprcGraph::new(&instance);
    let ordered = order_by_benefit(&graph, &instance, &prices);
    let deadline = Deadline::new(Duration::ZERO);
    std::thread::sleep(Duration::from_millis(2));
    let outcome = Pulse::new(&instance, &graph, &prices, &ordered, settings, &deadline)
        .run()
        .expect("pulse succeeds");

    assert!(outcome.timed_out);
    assert!(outcome.columns.is_empty());
}

#[rstest]
fn guards_restore_the_path_exactly() {
    let mut path = PartialPath::new(4, 2, 0.1, 0);
    {
        let mut at_source = path.push_node(0, 0.0);
        {
            let mut moved = at_source.push_node(1, 0.7);
            {
                let served = moved.serve_customer(0, 2, -2.9);
                assert_eq!(served.cost(), -2.9);
                assert_eq!(served.demand(), 2);
                assert!(served.serves(0));
            }
            assert_eq!(moved.cost(), 0.1 + 0.7);
            assert_eq!(moved.demand(), 0);
            assert!(!moved.serves(0));
        }
        assert_eq!(at_source.nodes(), &[0]);
        assert!(!at_source.visits(1));
    }
    assert!(path.nodes().is_empty());
    assert_eq!(path.cost(), 0.1);
}

#[rstest]
fn customers_are_ordered_by_dual_per_demand() {
    let instance = hub_instance(3, 3, 1.0);
    let prices = duals(&instance, &[1.0, 6.0, 3.0], &[]);
    let graph = EspprcGraph::new(&instance);
    let ordered = order_by_benefit(&graph, &instance, &prices);
    assert_eq!(ordered.get(4), Some(&vec![1, 2, 0]));
}

#[rstest]
fn positive_flow_duals_do_not_prune_the_paths_earning_them(settings: PulseSettings) {
    let instance = two_customer_instance();
    let branch = Branch::VisitFlow {
        edge: Edge::new(2, 0),
        customer: 1,
        bound: 1,
        direction: Direction::Up,
    };
    let solution = RmpLinearSolution {
        feasible: true,
        customer_duals: vec![0.5, 0.5],
        branch_duals: BTreeMap::from([(branch, 5.0)]),
        ..RmpLinearSolution::default()
    };
    let prices = PricingDuals::new(&instance, &solution, &[branch]).expect("valid branches");
    let outcome = run(&instance, &prices, settings);

    let best = outcome
        .columns
        .iter()
        .min_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost))
        .expect("the branch edge pays for a column");
    assert_eq!(best.reduced_cost, -1.0);
    assert_eq!(best.route.nodes(), [0, 1, 2, 0]);
}
