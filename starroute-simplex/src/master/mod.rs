//! [`MasterProblem`] backend over the dense simplex.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use starroute_core::{
    Branch, Deadline, Direction, Instance, MasterProblem, RmpIntegerSolution, RmpLinearSolution,
    Route, VisitFlowKey,
};

use crate::integer::branch_and_bound;
use crate::tableau::{LinearProgram, LpOutcome, LpSolution, Sense};

/// Primal values below this count as zero when reporting visit flow.
const FLOW_EPSILON: f64 = 1e-9;

/// How the coverage rows bind each customer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Coverage {
    /// `Σ θ >= 1`; integer solutions are deduplicated afterwards.
    #[default]
    AtLeastOnce,
    /// `Σ θ = 1`.
    ExactlyOnce,
}

impl Coverage {
    const fn sense(self) -> Sense {
        match self {
            Self::AtLeastOnce => Sense::AtLeast,
            Self::ExactlyOnce => Sense::Equal,
        }
    }
}

/// Configuration for [`SimplexMaster`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplexMasterConfig {
    /// Sense of the customer coverage rows.
    pub coverage: Coverage,
    /// Distance from an integer below which a primal value counts as
    /// integral.
    pub integrality_tolerance: f64,
    /// Smallest pivot element and most negative reduced cost the simplex
    /// treats as zero.
    pub pivot_tolerance: f64,
}

impl Default for SimplexMasterConfig {
    fn default() -> Self {
        Self {
            coverage: Coverage::default(),
            integrality_tolerance: 0.01,
            pivot_tolerance: 1e-9,
        }
    }
}

/// Restricted master problem solved with a dense tableau.
///
/// The model is rebuilt from the column pool and the active branches on
/// every solve. Columns excluded by an active branch get no variable and
/// report a primal value of zero.
#[derive(Debug, Clone)]
pub struct SimplexMaster<'a> {
    instance: &'a Instance,
    config: SimplexMasterConfig,
    columns: Vec<Route>,
    branches: Vec<Branch>,
}

struct Model {
    program: LinearProgram,
    /// Pool index of every LP variable.
    variables: Vec<usize>,
    fleet_row: usize,
    /// `(branch, row)` for every active branch.
    branch_rows: Vec<(Branch, usize)>,
}

impl<'a> SimplexMaster<'a> {
    /// An empty master using default configuration.
    #[must_use]
    pub fn new(instance: &'a Instance) -> Self {
        Self::with_config(instance, SimplexMasterConfig::default())
    }

    /// An empty master with explicit configuration.
    #[must_use]
    pub const fn with_config(instance: &'a Instance, config: SimplexMasterConfig) -> Self {
        Self {
            instance,
            config,
            columns: Vec::new(),
            branches: Vec::new(),
        }
    }

    /// Active branches, oldest first.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Cost of an artificial variable: more than any set of routes the
    /// fleet could run, scaled by the number of rows an artificial can
    /// relieve.
    fn penalty(&self) -> f64 {
        let rows = self
            .instance
            .customer_count()
            .saturating_add(usize::try_from(self.instance.vehicles()).unwrap_or(usize::MAX))
            .saturating_add(self.branches.len())
            .saturating_add(1);
        let scale = u32::try_from(rows).map_or(f64::from(u32::MAX), f64::from);
        (self.instance.total_edge_weight() + 1.0) * scale
    }

    /// Build the LP over the compatible columns.
    ///
    /// A penalised model also gets one artificial variable per row the
    /// origin violates, so it is feasible even before any useful column
    /// exists. Artificials follow the route variables.
    fn build_model(&self, penalised: bool) -> Model {
        let variables: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, route)| self.branches.iter().all(|b| b.is_compatible(route)))
            .map(|(index, _)| index)
            .collect();
        let routes: Vec<&Route> = variables
            .iter()
            .filter_map(|&index| self.columns.get(index))
            .collect();
        let mut program = LinearProgram::new(routes.iter().map(|r| r.cost()).collect());
        let penalty = penalised.then(|| self.penalty());
        for customer in self.instance.customers() {
            let node = customer.node;
            push_penalised_row(
                &mut program,
                terms_where(&routes, |route| route.serves(node)),
                (self.config.coverage.sense(), 1.0),
                penalty,
            );
        }
        let fleet_row = program.rows.len();
        let fleet_sense = if self.instance.allow_unused_vehicles() {
            Sense::AtMost
        } else {
            Sense::Equal
        };
        push_penalised_row(
            &mut program,
            terms_where(&routes, |_| true),
            (fleet_sense, f64::from(self.instance.vehicles())),
            penalty,
        );
        let mut branch_rows = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let sense = match branch.direction() {
                Direction::Up => Sense::AtLeast,
                Direction::Down => Sense::AtMost,
            };
            branch_rows.push((*branch, program.rows.len()));
            push_penalised_row(
                &mut program,
                terms_where(&routes, |route| branch.covers(route)),
                (sense, f64::from(branch.bound())),
                penalty,
            );
        }
        Model {
            program,
            variables,
            fleet_row,
            branch_rows,
        }
    }

    fn relaxation(&self, model: &Model, solution: &LpSolution) -> RmpLinearSolution {
        let dual = |row: usize| solution.duals.get(row).copied().unwrap_or(0.0);
        let customer_duals = (0..self.instance.customer_count()).map(dual).collect();
        let mut branch_duals = BTreeMap::new();
        for &(branch, row) in &model.branch_rows {
            *branch_duals.entry(branch).or_insert(0.0) += dual(row);
        }

        let mut primal_values = vec![0.0; self.columns.len()];
        let mut visit_flow = BTreeMap::new();
        for (&index, &value) in model.variables.iter().zip(&solution.values) {
            if let Some(slot) = primal_values.get_mut(index) {
                *slot = value;
            }
            let Some(route) = self.columns.get(index).filter(|_| value > FLOW_EPSILON) else {
                continue;
            };
            for edge in route.edges() {
                for &customer in route.customers() {
                    *visit_flow
                        .entry(VisitFlowKey { edge, customer })
                        .or_insert(0.0) += value;
                }
            }
        }
        let (structural, artificial) = solution
            .values
            .split_at(model.variables.len().min(solution.values.len()));
        let tolerance = self.config.integrality_tolerance;
        let integer = structural
            .iter()
            .all(|v| (v - v.round()).abs() <= tolerance);
        let artificial_value: f64 = artificial.iter().sum();
        if artificial_value > FLOW_EPSILON {
            log::debug!("restricted master leans on artificials worth {artificial_value:.6}");
        }

        RmpLinearSolution {
            objective: solution.objective,
            feasible: true,
            customer_duals,
            vehicles_dual: dual(model.fleet_row),
            branch_duals,
            primal_values,
            integer,
            visit_flow,
            artificial_value,
        }
    }
}

/// Push `row`, adding an artificial variable priced at `penalty` when one
/// is given and the row excludes the origin.
fn push_penalised_row(
    program: &mut LinearProgram,
    mut terms: Vec<(usize, f64)>,
    (sense, rhs): (Sense, f64),
    penalty: Option<f64>,
) {
    if let Some(cost) = penalty.filter(|_| sense != Sense::AtMost && rhs > 0.0) {
        terms.push((program.costs.len(), 1.0));
        program.costs.push(cost);
    }
    program.push_row(terms, sense, rhs);
}

/// Unit coefficients for the variables whose route satisfies `keep`.
fn terms_where(routes: &[&Route], keep: impl Fn(&Route) -> bool) -> Vec<(usize, f64)> {
    routes
        .iter()
        .enumerate()
        .filter(|(_, route)| keep(**route))
        .map(|(variable, _)| (variable, 1.0))
        .collect()
}

/// Keep each customer on the first chosen route serving it.
///
/// Routes that lose every customer this way are dropped, or kept empty when
/// `keep_empty` is set because the fleet must stay in use.
fn deduplicate(routes: Vec<Route>, keep_empty: bool) -> Vec<Route> {
    let mut served = BTreeSet::new();
    routes
        .into_iter()
        .filter_map(|route| {
            if route.is_empty() {
                return Some(route);
            }
            let kept: Vec<usize> = route
                .customers()
                .iter()
                .copied()
                .filter(|&c| served.insert(c))
                .collect();
            if kept.is_empty() && keep_empty {
                log::debug!("emptying fully duplicated route {route}");
                Some(route.copy_without_customers())
            } else if kept.is_empty() {
                log::debug!("dropping fully duplicated route {route}");
                None
            } else if kept.len() == route.customers().len() {
                Some(route)
            } else {
                Some(route.with_customers(kept))
            }
        })
        .collect()
}

impl MasterProblem for SimplexMaster<'_> {
    fn add_columns(&mut self, columns: Vec<Route>) {
        for column in columns {
            if self.columns.iter().any(|c| c.same_column(&column)) {
                log::debug!("skipping duplicate column {column}");
                continue;
            }
            self.columns.push(column);
        }
    }

    fn add_branch(&mut self, branch: Branch) {
        self.branches.push(branch);
    }

    fn remove_branch(&mut self, branch: &Branch) {
        if let Some(position) = self.branches.iter().rposition(|b| b == branch) {
            self.branches.remove(position);
        } else {
            log::warn!("removing inactive branch {branch}");
            debug_assert!(false, "removing inactive branch {branch}");
        }
    }

    fn solve_relaxation(&mut self, time_remaining: Duration) -> RmpLinearSolution {
        let deadline = Deadline::new(time_remaining);
        let model = self.build_model(true);
        match model.program.solve(self.config.pivot_tolerance, &deadline) {
            LpOutcome::Optimal(solution) => self.relaxation(&model, &solution),
            LpOutcome::Infeasible => {
                log::debug!(
                    "restricted master infeasible over {} columns",
                    model.variables.len()
                );
                RmpLinearSolution::infeasible()
            }
            outcome => {
                log::warn!("restricted master relaxation ended with {outcome:?}");
                RmpLinearSolution::infeasible()
            }
        }
    }

    fn solve_integer(&mut self, time_remaining: Duration) -> RmpIntegerSolution {
        let deadline = Deadline::new(time_remaining);
        let model = self.build_model(false);
        let Some(point) = branch_and_bound(
            &model.program,
            self.config.pivot_tolerance,
            self.config.integrality_tolerance,
            &deadline,
        ) else {
            return RmpIntegerSolution::infeasible();
        };

        let mut routes = Vec::new();
        for (&index, &value) in model.variables.iter().zip(&point.values) {
            let Some(route) = self.columns.get(index) else {
                continue;
            };
            let mut copies = value;
            while copies > 0.5 {
                routes.push(route.clone());
                copies -= 1.0;
            }
        }
        if self.config.coverage == Coverage::AtLeastOnce {
            routes = deduplicate(routes, !self.instance.allow_unused_vehicles());
        }
        RmpIntegerSolution {
            objective: routes.iter().map(Route::cost).sum(),
            feasible: true,
            routes,
        }
    }

    fn columns(&self) -> &[Route] {
        &self.columns
    }
}
