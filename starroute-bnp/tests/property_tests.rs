//! Property-based tests for column generation and branch-and-price.
//!
//! # Invariants tested
//!
//! - **Monotone master:** with no branches active, every relaxation solved
//!   during column generation is at most the previous one.
//! - **Sound search results:** a finished search is infeasible exactly when
//!   exhaustive enumeration finds no solution. Otherwise its routes cover
//!   every customer within capacity and the fleet, its objective is their
//!   total cost, its lower bound never exceeds the enumerated optimum and an
//!   optimal status carries exactly that optimum.
//! - **Determinism:** two searches on the same instance do the same amount
//!   of pricing work.

mod proptest_support;

use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;
use starroute_bnp::{BranchAndPrice, ColumnGenerator, InitialSolutionHeuristic};
use starroute_core::{Deadline, SolveStatus};
use starroute_pricing::LabelSettingPricing;
use starroute_simplex::SimplexMaster;

use proptest_support::{RecordingMaster, brute_force_optimum, routing_instance};

const EPSILON: f64 = 1e-6;
const TIMEOUT: Duration = Duration::from_secs(60);

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn master_objective_never_increases(instance in routing_instance(5)) {
        let master = RecordingMaster::new(SimplexMaster::new(&instance));
        let pricing = LabelSettingPricing::new(&instance);
        let mut generator = ColumnGenerator::new(&instance, master, pricing);
        let seed = InitialSolutionHeuristic::new(&instance).run();

        generator
            .generate(seed, &Deadline::new(TIMEOUT))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let (master, _) = generator.into_parts();
        for pair in master.objectives.windows(2) {
            if let [before, after] = *pair {
                prop_assert!(
                    after <= before + EPSILON,
                    "objective rose from {} to {}",
                    before,
                    after
                );
            }
        }
    }

    #[test]
    fn finished_searches_agree_with_enumeration(instance in routing_instance(4)) {
        let optimum = brute_force_optimum(&instance);
        let mut search = BranchAndPrice::new(
            &instance,
            SimplexMaster::new(&instance),
            LabelSettingPricing::new(&instance),
        );
        let solution = search
            .solve(TIMEOUT)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        if optimum.is_infinite() {
            prop_assert_eq!(solution.status, SolveStatus::Infeasible);
            return Ok(());
        }
        prop_assert_ne!(solution.status, SolveStatus::Infeasible);
        prop_assert_ne!(solution.status, SolveStatus::Timeout);
        let bound = solution.lower_bound.unwrap_or(f64::NEG_INFINITY);
        prop_assert!(bound <= optimum + EPSILON, "bound {} above optimum {}", bound, optimum);
        if solution.status == SolveStatus::Unknown {
            return Ok(());
        }

        let served: BTreeSet<usize> = solution
            .routes
            .iter()
            .flat_map(|r| r.customers().iter().copied())
            .collect();
        let customers: BTreeSet<usize> = instance.customers().iter().map(|c| c.node).collect();
        prop_assert_eq!(served, customers);
        for route in &solution.routes {
            prop_assert!(route.demand(&instance) <= instance.capacity());
        }
        let vehicles = usize::try_from(instance.vehicles()).unwrap_or(usize::MAX);
        if instance.allow_unused_vehicles() {
            prop_assert!(solution.routes.len() <= vehicles);
        } else {
            prop_assert_eq!(solution.routes.len(), vehicles);
        }
        let total: f64 = solution.routes.iter().map(|r| r.cost()).sum();
        prop_assert!((total - solution.objective).abs() < EPSILON);
        prop_assert!(solution.objective >= optimum - EPSILON);
        if solution.status == SolveStatus::Optimal {
            prop_assert!(
                (solution.objective - optimum).abs() < EPSILON,
                "reported optimum {} against {}",
                solution.objective,
                optimum
            );
        }
    }

    #[test]
    fn work_is_reproducible(instance in routing_instance(4)) {
        let run = || {
            BranchAndPrice::new(
                &instance,
                SimplexMaster::new(&instance),
                LabelSettingPricing::new(&instance),
            )
            .solve(TIMEOUT)
            .map_err(|e| TestCaseError::fail(e.to_string()))
        };
        let first = run()?;
        let second = run()?;
        prop_assert_eq!(first.status, second.status);
        prop_assert_eq!(first.deterministic_time, second.deterministic_time);
    }
}
