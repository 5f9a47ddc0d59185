//! [`MipBackend`] over `good_lp`, solving with its pure-Rust `microlp` solver.

use good_lp::{constraint, microlp, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use tracing::debug;

use crate::error::Result;

use super::backend::{LinearConstraint, LinearExpr, MipBackend, MipSolution, Sense};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoodLpVar(usize);

pub struct GoodLpBackend {
    variables: ProblemVariables,
    handles: Vec<Variable>,
    constraints: Vec<good_lp::Constraint>,
    objective: LinearExpr<GoodLpVar>,
}

impl Default for GoodLpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GoodLpBackend {
    pub fn new() -> Self {
        GoodLpBackend {
            variables: ProblemVariables::new(),
            handles: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::default(),
        }
    }

    /// Hands the recorded model to the solver. Any status other than optimal
    /// comes back as [`crate::LotSizingError::Solver`].
    pub fn solve(self) -> Result<GoodLpSolution> {
        let GoodLpBackend {
            variables,
            handles,
            constraints,
            objective,
        } = self;

        debug!(
            nb_variables = handles.len(),
            nb_constraints = constraints.len(),
            "handing model to microlp"
        );
        let goal = to_expression(&handles, &objective);
        let mut problem = variables.minimise(goal).using(microlp);
        for c in constraints {
            problem.add_constraint(c);
        }
        let solution = problem.solve()?;

        let values = handles.iter().map(|&v| solution.value(v)).collect::<Vec<_>>();
        let objective_value = objective.evaluate(|v| values[v.0]);
        Ok(GoodLpSolution {
            values,
            objective_value,
        })
    }

    fn add_var(&mut self, handle: Variable) -> GoodLpVar {
        self.handles.push(handle);
        GoodLpVar(self.handles.len() - 1)
    }
}

fn to_expression(handles: &[Variable], expr: &LinearExpr<GoodLpVar>) -> Expression {
    let mut e = Expression::from(expr.constant_term());
    for &(var, coef) in expr.terms() {
        e += handles[var.0] * coef;
    }
    e
}

impl MipBackend for GoodLpBackend {
    type Var = GoodLpVar;

    fn bool_var(&mut self, name: String) -> GoodLpVar {
        let handle = self.variables.add(variable().binary().name(name));
        self.add_var(handle)
    }

    fn num_var(&mut self, name: String) -> GoodLpVar {
        let handle = self.variables.add(variable().min(0.0).name(name));
        self.add_var(handle)
    }

    fn add_constraint(&mut self, c: LinearConstraint<GoodLpVar>) {
        let lhs = to_expression(&self.handles, &c.lhs);
        let rhs = to_expression(&self.handles, &c.rhs);
        self.constraints.push(match c.sense {
            Sense::Eq => constraint::eq(lhs, rhs),
            Sense::Le => constraint::leq(lhs, rhs),
            Sense::Ge => constraint::geq(lhs, rhs),
        });
    }

    fn minimise(&mut self, objective: LinearExpr<GoodLpVar>) {
        self.objective = objective;
    }
}

/// Variable values copied out of the solver once it reports an optimum.
#[derive(Debug, Clone)]
pub struct GoodLpSolution {
    values: Vec<f64>,
    objective_value: f64,
}

impl MipSolution<GoodLpVar> for GoodLpSolution {
    fn value(&self, var: GoodLpVar) -> f64 {
        self.values[var.0]
    }

    fn objective_value(&self) -> f64 {
        self.objective_value
    }
}
