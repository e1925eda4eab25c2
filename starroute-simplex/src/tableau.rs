//! Dense two-phase tableau simplex with Bland's rule.
//!
//! Problems are small: one column per route and one row per customer or
//! branch. A dense tableau keeps the pivoting code short, and Bland's rule
//! rules out cycling on the heavily degenerate covering rows.

#![expect(
    clippy::indexing_slicing,
    reason = "tableau rows and columns are indexed within the shape fixed at construction"
)]

use starroute_core::Deadline;

/// Largest phase-one objective still treated as feasible.
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Relation between a row's left-hand side and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sense {
    AtLeast,
    AtMost,
    Equal,
}

impl Sense {
    const fn flipped(self) -> Self {
        match self {
            Self::AtLeast => Self::AtMost,
            Self::AtMost => Self::AtLeast,
            Self::Equal => Self::Equal,
        }
    }
}

/// A sparse constraint row over the structural variables.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    pub(crate) terms: Vec<(usize, f64)>,
    pub(crate) sense: Sense,
    pub(crate) rhs: f64,
}

/// `min c·x` subject to the rows and `x >= 0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LinearProgram {
    pub(crate) costs: Vec<f64>,
    pub(crate) rows: Vec<Row>,
}

/// Optimal primal and dual values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LpSolution {
    pub(crate) objective: f64,
    pub(crate) values: Vec<f64>,
    /// One dual per row, with minimisation signs: `>=` rows non-negative,
    /// `<=` rows non-positive.
    pub(crate) duals: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpOutcome {
    Optimal(LpSolution),
    Infeasible,
    Unbounded,
    IterationLimit,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Unbounded,
    IterationLimit,
    TimedOut,
}

impl From<Stop> for LpOutcome {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::Unbounded => Self::Unbounded,
            Stop::IterationLimit => Self::IterationLimit,
            Stop::TimedOut => Self::TimedOut,
        }
    }
}

impl LinearProgram {
    pub(crate) const fn new(costs: Vec<f64>) -> Self {
        Self {
            costs,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push_row(&mut self, terms: Vec<(usize, f64)>, sense: Sense, rhs: f64) {
        self.rows.push(Row { terms, sense, rhs });
    }

    /// Solve with `tolerance` as the pivot and reduced-cost threshold.
    pub(crate) fn solve(&self, tolerance: f64, deadline: &Deadline) -> LpOutcome {
        let mut tableau = Tableau::from_program(self);
        let artificial_start = tableau.artificial_start;
        let width = tableau.width;

        tableau.phase_one_objective();
        if let Err(stop) = tableau.optimise(width, tolerance, deadline) {
            return stop.into();
        }
        if -tableau.objective[width] > FEASIBILITY_TOLERANCE {
            return LpOutcome::Infeasible;
        }
        tableau.drive_out_artificials(tolerance);

        tableau.phase_two_objective(&self.costs);
        if let Err(stop) = tableau.optimise(artificial_start, tolerance, deadline) {
            return stop.into();
        }
        LpOutcome::Optimal(tableau.solution(self.costs.len()))
    }
}

struct Tableau {
    table: Vec<Vec<f64>>,
    objective: Vec<f64>,
    basis: Vec<usize>,
    /// Column holding `B^-1 e_i` for each row.
    identity: Vec<usize>,
    negated: Vec<bool>,
    artificial_start: usize,
    width: usize,
}

impl Tableau {
    fn from_program(program: &LinearProgram) -> Self {
        let structural = program.costs.len();
        let negated: Vec<bool> = program.rows.iter().map(|row| row.rhs < 0.0).collect();
        let senses: Vec<Sense> = program
            .rows
            .iter()
            .zip(&negated)
            .map(|(row, &neg)| if neg { row.sense.flipped() } else { row.sense })
            .collect();
        let slack_count = senses.iter().filter(|&&s| s != Sense::Equal).count();
        let artificial_count = senses.iter().filter(|&&s| s != Sense::AtMost).count();
        let artificial_start = structural + slack_count;
        let width = artificial_start + artificial_count;

        let rows = program.rows.len();
        let mut table = vec![vec![0.0; width + 1]; rows];
        let mut basis = vec![0; rows];
        let mut identity = vec![0; rows];
        let mut next_slack = structural;
        let mut next_artificial = artificial_start;
        for (i, row) in program.rows.iter().enumerate() {
            let sign = if negated[i] { -1.0 } else { 1.0 };
            let line = &mut table[i];
            for &(column, coefficient) in &row.terms {
                if column < structural {
                    line[column] += sign * coefficient;
                }
            }
            line[width] = sign * row.rhs;
            match senses[i] {
                Sense::AtMost => {
                    line[next_slack] = 1.0;
                    basis[i] = next_slack;
                    identity[i] = next_slack;
                    next_slack += 1;
                }
                Sense::AtLeast => {
                    line[next_slack] = -1.0;
                    next_slack += 1;
                    line[next_artificial] = 1.0;
                    basis[i] = next_artificial;
                    identity[i] = next_artificial;
                    next_artificial += 1;
                }
                Sense::Equal => {
                    line[next_artificial] = 1.0;
                    basis[i] = next_artificial;
                    identity[i] = next_artificial;
                    next_artificial += 1;
                }
            }
        }
        Self {
            table,
            objective: vec![0.0; width + 1],
            basis,
            identity,
            negated,
            artificial_start,
            width,
        }
    }

    /// Minimise the sum of artificials.
    fn phase_one_objective(&mut self) {
        self.objective = vec![0.0; self.width + 1];
        for column in self.artificial_start..self.width {
            self.objective[column] = 1.0;
        }
        for (row, &basic) in self.basis.iter().enumerate() {
            if basic >= self.artificial_start {
                subtract_scaled(&mut self.objective, &self.table[row], 1.0);
            }
        }
    }

    fn phase_two_objective(&mut self, costs: &[f64]) {
        self.objective = vec![0.0; self.width + 1];
        self.objective[..costs.len()].copy_from_slice(costs);
        for (row, &basic) in self.basis.iter().enumerate() {
            let cost = costs.get(basic).copied().unwrap_or(0.0);
            subtract_scaled(&mut self.objective, &self.table[row], cost);
        }
    }

    /// Pivot basic artificials at zero level out of the basis where a
    /// non-artificial column can replace them. Rows where none can are
    /// redundant and keep their artificial.
    fn drive_out_artificials(&mut self, tolerance: f64) {
        for row in 0..self.basis.len() {
            if self.basis[row] < self.artificial_start {
                continue;
            }
            if let Some(column) =
                (0..self.artificial_start).find(|&c| self.table[row][c].abs() > tolerance)
            {
                self.pivot(row, column);
            }
        }
    }

    fn optimise(&mut self, allowed: usize, tolerance: f64, deadline: &Deadline) -> Result<(), Stop> {
        let limit = 50 * (self.basis.len() + self.width) + 1_000;
        for _ in 0..limit {
            if deadline.expired() {
                return Err(Stop::TimedOut);
            }
            let Some(entering) = (0..allowed).find(|&c| self.objective[c] < -tolerance) else {
                return Ok(());
            };
            let Some(leaving) = self.ratio_test(entering, tolerance) else {
                return Err(Stop::Unbounded);
            };
            self.pivot(leaving, entering);
        }
        log::warn!("simplex stopped after {limit} pivots");
        Err(Stop::IterationLimit)
    }

    /// Minimum ratio row, ties broken by the lowest basic column.
    fn ratio_test(&self, entering: usize, tolerance: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (row, line) in self.table.iter().enumerate() {
            let coefficient = line[entering];
            if coefficient <= tolerance {
                continue;
            }
            let ratio = line[self.width] / coefficient;
            let better = match best {
                None => true,
                Some((current, current_ratio)) => {
                    ratio < current_ratio - tolerance
                        || (ratio <= current_ratio + tolerance
                            && self.basis[row] < self.basis[current])
                }
            };
            if better {
                best = Some((row, ratio));
            }
        }
        best.map(|(row, _)| row)
    }

    fn pivot(&mut self, row: usize, column: usize) {
        let pivot = self.table[row][column];
        for value in &mut self.table[row] {
            *value /= pivot;
        }
        let pivot_row = self.table[row].clone();
        for (index, line) in self.table.iter_mut().enumerate() {
            if index != row {
                let factor = line[column];
                subtract_scaled(line, &pivot_row, factor);
            }
        }
        let factor = self.objective[column];
        subtract_scaled(&mut self.objective, &pivot_row, factor);
        self.basis[row] = column;
    }

    fn solution(&self, structural: usize) -> LpSolution {
        let mut values = vec![0.0; structural];
        for (row, &basic) in self.basis.iter().enumerate() {
            if basic < structural {
                values[basic] = self.table[row][self.width].max(0.0);
            }
        }
        let duals = self
            .identity
            .iter()
            .zip(&self.negated)
            .map(|(&column, &negated)| {
                let dual = -self.objective[column];
                if negated { -dual } else { dual }
            })
            .collect();
        LpSolution {
            objective: -self.objective[self.width],
            values,
            duals,
        }
    }
}

fn subtract_scaled(target: &mut [f64], source: &[f64], factor: f64) {
    if factor.abs() < f64::MIN_POSITIVE {
        return;
    }
    for (t, s) in target.iter_mut().zip(source) {
        *t -= factor * s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    const TOLERANCE: f64 = 1e-9;

    fn deadline() -> Deadline {
        Deadline::new(Duration::from_secs(10))
    }

    fn optimal(program: &LinearProgram) -> LpSolution {
        match program.solve(TOLERANCE, &deadline()) {
            LpOutcome::Optimal(solution) => solution,
            other => panic!("expected an optimum, got {other:?}"),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[rstest]
    fn covering_problem_reports_primal_and_dual() {
        let mut program = LinearProgram::new(vec![1.0, 1.0]);
        program.push_row(vec![(0, 1.0), (1, 2.0)], Sense::AtLeast, 2.0);
        program.push_row(vec![(0, 3.0), (1, 1.0)], Sense::AtLeast, 3.0);
        let solution = optimal(&program);

        assert!(close(solution.objective, 1.4));
        assert!(close(solution.values[0], 0.8));
        assert!(close(solution.values[1], 0.6));
        assert!(close(solution.duals[0], 0.4));
        assert!(close(solution.duals[1], 0.2));
    }

    #[rstest]
    fn at_most_rows_have_non_positive_duals() {
        let mut program = LinearProgram::new(vec![-1.0]);
        program.push_row(vec![(0, 1.0)], Sense::AtMost, 4.0);
        let solution = optimal(&program);
        assert!(close(solution.objective, -4.0));
        assert!(close(solution.duals[0], -1.0));
    }

    #[rstest]
    fn negative_right_hand_sides_keep_original_dual_signs() {
        let mut program = LinearProgram::new(vec![1.0]);
        program.push_row(vec![(0, -1.0)], Sense::Equal, -3.0);
        let solution = optimal(&program);
        assert!(close(solution.values[0], 3.0));
        assert!(close(solution.duals[0], -1.0));
    }

    #[rstest]
    fn redundant_equalities_are_tolerated() {
        let mut program = LinearProgram::new(vec![2.0, 3.0]);
        program.push_row(vec![(0, 1.0), (1, 1.0)], Sense::Equal, 1.0);
        program.push_row(vec![(0, 2.0), (1, 2.0)], Sense::Equal, 2.0);
        let solution = optimal(&program);
        assert!(close(solution.objective, 2.0));
    }

    #[rstest]
    fn conflicting_rows_are_infeasible() {
        let mut program = LinearProgram::new(vec![1.0]);
        program.push_row(vec![(0, 1.0)], Sense::AtMost, 1.0);
        program.push_row(vec![(0, 1.0)], Sense::AtLeast, 2.0);
        assert_eq!(program.solve(TOLERANCE, &deadline()), LpOutcome::Infeasible);
    }

    #[rstest]
    fn empty_covering_row_is_infeasible() {
        let mut program = LinearProgram::new(vec![1.0]);
        program.push_row(Vec::new(), Sense::AtLeast, 1.0);
        assert_eq!(program.solve(TOLERANCE, &deadline()), LpOutcome::Infeasible);
    }

    #[rstest]
    fn unbounded_directions_are_detected() {
        let mut program = LinearProgram::new(vec![-1.0]);
        program.push_row(vec![(0, 1.0)], Sense::AtLeast, 1.0);
        assert_eq!(program.solve(TOLERANCE, &deadline()), LpOutcome::Unbounded);
    }

    #[rstest]
    fn expired_deadline_stops_pivoting() {
        let mut program = LinearProgram::new(vec![1.0]);
        program.push_row(vec![(0, 1.0)], Sense::AtLeast, 1.0);
        let expired = Deadline::new(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(program.solve(TOLERANCE, &expired), LpOutcome::TimedOut);
    }
}
