//! Backend-agnostic MILP model.
//!
//! [`constraints`](crate::constraints) builds a [`MilpModel`] describing
//! variables, hard constraints and a weighted objective without knowing
//! which solver crate will execute it. [`MilpBackend`] is the seam a
//! concrete solver (see [`crate::solver`]) implements against.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    /// Continuous variable bounded to `[lower, upper]` (upper as integer-scaled bound where relevant).
    Continuous { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    Le,
    Ge,
}

/// A sparse linear expression over model variables, plus a constant term.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) -> &mut Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    pub fn from_var(var: VarId) -> Self {
        let mut e = Self::new();
        e.add_term(var, 1.0);
        e
    }

    /// Evaluates the expression against a solved variable-value map, treating
    /// any variable missing from `values` as 0.
    pub fn eval(&self, values: &HashMap<VarId, f64>) -> f64 {
        self.constant + self.terms.iter().map(|(v, c)| c * values.get(v).copied().unwrap_or(0.0)).sum::<f64>()
    }
}

pub struct LinConstraint {
    pub name: String,
    pub expr: LinExpr,
    pub op: ConstraintOp,
    pub rhs: f64,
}

/// One weighted term of the soft objective: `weight * expr`.
pub struct ObjectiveTerm {
    pub expr: LinExpr,
    pub weight: f64,
}

#[derive(Default)]
pub struct MilpModel {
    var_kinds: Vec<VarKind>,
    var_names: Vec<String>,
    pub constraints: Vec<LinConstraint>,
    pub objective: Vec<ObjectiveTerm>,
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_var(&mut self, kind: VarKind, name: impl Into<String>) -> VarId {
        let id = VarId(self.var_kinds.len());
        self.var_kinds.push(kind);
        self.var_names.push(name.into());
        id
    }

    pub fn var_kind(&self, var: VarId) -> VarKind {
        self.var_kinds[var.0]
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.var_names[var.0]
    }

    pub fn num_vars(&self) -> usize {
        self.var_kinds.len()
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, expr: LinExpr, op: ConstraintOp, rhs: f64) {
        self.constraints.push(LinConstraint {
            name: name.into(),
            expr,
            op,
            rhs,
        });
    }

    pub fn add_objective_term(&mut self, expr: LinExpr, weight: f64) {
        self.objective.push(ObjectiveTerm { expr, weight });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    TimedOut,
}

pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub values: HashMap<VarId, f64>,
}

pub struct SolveBudget {
    pub time_limit: Duration,
    pub relative_gap: f64,
}

/// A pluggable MILP solver backend. Concrete implementations own the
/// translation from [`MilpModel`] into their solver's native form.
pub trait MilpBackend {
    fn solve(&self, model: &MilpModel, budget: SolveBudget) -> SolveOutcome;
}
