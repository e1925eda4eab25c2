//! Depth-first LP-based branch-and-bound over the column variables.

use starroute_core::Deadline;

use crate::tableau::{LinearProgram, LpOutcome, Sense};

/// Incumbent of an integer search.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IntegerPoint {
    pub(crate) objective: f64,
    /// Rounded value of every structural variable.
    pub(crate) values: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Fixing {
    variable: usize,
    sense: Sense,
    bound: f64,
}

/// Search for the cheapest integral point of `program`.
///
/// Nodes branch on the most fractional variable, exploring the rounded-up
/// side first. Returns `None` when no integral point was found before the
/// tree was exhausted or `deadline` expired.
pub(crate) fn branch_and_bound(
    program: &LinearProgram,
    pivot_tolerance: f64,
    integrality_tolerance: f64,
    deadline: &Deadline,
) -> Option<IntegerPoint> {
    let mut incumbent: Option<IntegerPoint> = None;
    let mut stack: Vec<Vec<Fixing>> = vec![Vec::new()];
    let mut nodes = 0_u64;
    while let Some(fixings) = stack.pop() {
        if deadline.expired() {
            log::warn!("integer master search stopped after {nodes} nodes");
            break;
        }
        nodes += 1;
        let mut restricted = program.clone();
        for fixing in &fixings {
            restricted.push_row(vec![(fixing.variable, 1.0)], fixing.sense, fixing.bound);
        }
        let LpOutcome::Optimal(solution) = restricted.solve(pivot_tolerance, deadline) else {
            continue;
        };
        let cutoff = incumbent.as_ref().map_or(f64::INFINITY, |best| best.objective);
        if solution.objective >= cutoff - pivot_tolerance {
            continue;
        }
        match most_fractional(&solution.values, integrality_tolerance) {
            None => {
                log::debug!("integer master incumbent {}", solution.objective);
                incumbent = Some(IntegerPoint {
                    objective: solution.objective,
                    values: solution.values.iter().map(|v| v.round()).collect(),
                });
            }
            Some((variable, value)) => {
                let mut down = fixings.clone();
                down.push(Fixing {
                    variable,
                    sense: Sense::AtMost,
                    bound: value.floor(),
                });
                let mut up = fixings;
                up.push(Fixing {
                    variable,
                    sense: Sense::AtLeast,
                    bound: value.ceil(),
                });
                stack.push(down);
                stack.push(up);
            }
        }
    }
    incumbent
}

fn most_fractional(values: &[f64], tolerance: f64) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .map(|(index, value)| (index, value, (value - value.round()).abs()))
        .filter(|&(_, _, distance)| distance > tolerance)
        .max_by(|a, b| a.2.total_cmp(&b.2).then_with(|| b.0.cmp(&a.0)))
        .map(|(index, value, _)| (index, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    fn picks_the_cheapest_integral_cover() {
        // Three columns over customers {a, b, c}: pairs ab, bc, ac at cost 2
        // and a single column abc at cost 3.5. The relaxation mixes the
        // pairs at 3.0; the integer optimum takes abc.
        let mut program = LinearProgram::new(vec![2.0, 2.0, 2.0, 3.5]);
        program.push_row(vec![(0, 1.0), (2, 1.0), (3, 1.0)], Sense::AtLeast, 1.0);
        program.push_row(vec![(0, 1.0), (1, 1.0), (3, 1.0)], Sense::AtLeast, 1.0);
        program.push_row(vec![(1, 1.0), (2, 1.0), (3, 1.0)], Sense::AtLeast, 1.0);
        let deadline = Deadline::new(Duration::from_secs(10));

        let point = branch_and_bound(&program, 1e-9, 0.01, &deadline).expect("a cover exists");
        assert_eq!(point.values, vec![0.0, 0.0, 0.0, 1.0]);
        assert!((point.objective - 3.5).abs() < 1e-9);
    }

    #[rstest]
    fn infeasible_programs_have_no_point() {
        let mut program = LinearProgram::new(vec![1.0]);
        program.push_row(Vec::new(), Sense::AtLeast, 1.0);
        let deadline = Deadline::new(Duration::from_secs(10));
        assert_eq!(branch_and_bound(&program, 1e-9, 0.01, &deadline), None);
    }

    #[rstest]
    #[case(&[0.0, 1.0, 0.995], None)]
    #[case(&[0.2, 0.5, 0.7], Some(1))]
    #[case(&[0.4, 0.7], Some(0))]
    fn branching_prefers_the_most_fractional_value(
        #[case] values: &[f64],
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(most_fractional(values, 0.01).map(|(i, _)| i), expected);
    }
}
