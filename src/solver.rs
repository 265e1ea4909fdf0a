//! Component D: the CBC-backed [`MilpBackend`] implementation.
//!
//! The reference implementation solves through PuLP's `PULP_CBC_CMD`; CBC
//! is the real, registry-published solver behind `good_lp`'s `coin_cbc`
//! feature, so it is the direct substitute here.

use std::collections::HashMap;

use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};

use crate::milp::{ConstraintOp, LinExpr, MilpBackend, MilpModel, SolveBudget, SolveOutcome, SolveStatus, VarId, VarKind};

pub struct CbcBackend;

impl CbcBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CbcBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn to_expression(expr: &LinExpr, vars: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for (var, coeff) in &expr.terms {
        out += vars[var.0] * *coeff;
    }
    out
}

impl MilpBackend for CbcBackend {
    fn solve(&self, model: &MilpModel, budget: SolveBudget) -> SolveOutcome {
        let mut vars = ProblemVariables::new();
        let mut good_vars = Vec::with_capacity(model.num_vars());
        for i in 0..model.num_vars() {
            let v = match model.var_kind(VarId(i)) {
                VarKind::Binary => vars.add(variable().binary()),
                VarKind::Continuous { lower, upper } => vars.add(variable().min(lower).max(upper)),
            };
            good_vars.push(v);
        }

        let objective = model
            .objective
            .iter()
            .fold(Expression::from(0.0), |acc, term| acc + to_expression(&term.expr, &good_vars) * term.weight);

        let mut problem = vars.minimise(objective).using(good_lp::solvers::coin_cbc::coin_cbc);
        problem = problem.set_parameter("sec", &budget.time_limit.as_secs().to_string());
        problem = problem.set_parameter("ratio", &format!("{}", budget.relative_gap));

        for c in &model.constraints {
            let expr = to_expression(&c.expr, &good_vars);
            problem = match c.op {
                ConstraintOp::Eq => problem.with(expr.eq(c.rhs)),
                ConstraintOp::Le => problem.with(expr.leq(c.rhs)),
                ConstraintOp::Ge => problem.with(expr.geq(c.rhs)),
            };
        }

        match problem.solve() {
            Ok(solution) => {
                let values: HashMap<VarId, f64> = good_vars
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (VarId(i), solution.value(*v)))
                    .collect();
                let objective_value: f64 = model
                    .objective
                    .iter()
                    .map(|term| term.weight * eval(&term.expr, &values))
                    .sum();
                SolveOutcome {
                    status: SolveStatus::Optimal,
                    objective: Some(objective_value),
                    values,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "cbc did not return a feasible solution");
                SolveOutcome {
                    status: SolveStatus::Infeasible,
                    objective: None,
                    values: HashMap::new(),
                }
            }
        }
    }
}

fn eval(expr: &LinExpr, values: &HashMap<VarId, f64>) -> f64 {
    expr.constant + expr.terms.iter().map(|(v, c)| values.get(v).copied().unwrap_or(0.0) * c).sum::<f64>()
}

/// Accepts a candidate the same way the reference does: a strictly
/// optimal solve, or any non-infeasible solve that still produced an
/// objective value (CBC hit its time/gap budget but kept an incumbent).
pub fn is_acceptable(outcome: &SolveOutcome) -> bool {
    outcome.status == SolveStatus::Optimal || (outcome.objective.is_some() && outcome.status != SolveStatus::Infeasible)
}
