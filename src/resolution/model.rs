//! Mixed integer formulation of the lot sizing problem.
//!
//! Variables, for item `i` and period `t`:
//! - `x_i_t` (binary): an item of type `i` is produced in period `t`;
//! - `y_i_t` (binary): the machine is configured for type `i` in period `t`;
//! - `s_i_t` (continuous, >= 0): units of `i` held in stock at the end of `t`,
//!   with `s_i_init` standing for the stock before the first period;
//! - `u_i_j_t` (binary, `t >= 1`): the configuration switched from `i` in
//!   `t - 1` to `j` in `t`.

use tracing::{debug, trace};

use crate::error::Result;
use crate::instance::ProblemInstance;

use super::backend::{LinearConstraint, LinearExpr, MipBackend};

/// Handles on the decision variables created for an instance, stored in flat
/// arenas indexed by item and period.
#[derive(Debug, Clone)]
pub struct MipModel<V> {
    nb_types: usize,
    nb_periods: usize,
    production: Vec<V>,
    state: Vec<V>,
    stock: Vec<V>,
    transition: Vec<V>,
}

impl<V: Copy + PartialEq> MipModel<V> {
    /// Declares all variables, then the constraints linking them, then the
    /// objective. Nothing is solved here.
    pub fn build<B>(instance: &ProblemInstance, backend: &mut B) -> Result<Self>
    where
        B: MipBackend<Var = V>,
    {
        let nb_types = instance.nb_types();
        let nb_periods = instance.nb_periods();

        let mut model = MipModel {
            nb_types,
            nb_periods,
            production: Self::grid(nb_types, nb_periods, |i, t| backend.bool_var(format!("x_{i}_{t}"))),
            state: Self::grid(nb_types, nb_periods, |i, t| backend.bool_var(format!("y_{i}_{t}"))),
            stock: Vec::with_capacity(nb_types * (nb_periods + 1)),
            transition: Vec::with_capacity(nb_types * nb_types * nb_periods.saturating_sub(1)),
        };
        for i in 0..nb_types {
            model.stock.push(backend.num_var(format!("s_{i}_init")));
            for t in 0..nb_periods {
                model.stock.push(backend.num_var(format!("s_{i}_{t}")));
            }
        }
        for i in 0..nb_types {
            for j in 0..nb_types {
                for t in 1..nb_periods {
                    model.transition.push(backend.bool_var(format!("u_{i}_{j}_{t}")));
                }
            }
        }

        let mut nb_constraints = 0;
        let mut add = |constraint: LinearConstraint<V>| {
            trace!(name = %constraint.name, "constraint");
            nb_constraints += 1;
            backend.add_constraint(constraint);
        };
        model.initial_stock_constraints(&mut add);
        model.demand_constraints(instance, &mut add)?;
        model.state_constraints(&mut add);
        model.configuration_constraints(&mut add);
        model.transition_constraints(&mut add);

        backend.minimise(model.objective(instance)?);

        debug!(
            nb_variables = model.nb_variables(),
            nb_constraints,
            "formulation built"
        );
        Ok(model)
    }

    fn grid(nb_types: usize, nb_periods: usize, mut var: impl FnMut(usize, usize) -> V) -> Vec<V> {
        let mut vars = Vec::with_capacity(nb_types * nb_periods);
        for i in 0..nb_types {
            for t in 0..nb_periods {
                vars.push(var(i, t));
            }
        }
        vars
    }

    /// No item is in stock before the first period.
    fn initial_stock_constraints(&self, add: &mut impl FnMut(LinearConstraint<V>)) {
        for i in 0..self.nb_types {
            add(LinearConstraint::eq(
                format!("init_stock_{i}"),
                LinearExpr::var(self.initial_stock(i)),
                LinearExpr::constant(0.0),
            ));
        }
    }

    /// Inventory balance: `s_i_{t-1} + x_i_t == d_i_t + s_i_t`.
    fn demand_constraints(
        &self,
        instance: &ProblemInstance,
        add: &mut impl FnMut(LinearConstraint<V>),
    ) -> Result<()> {
        for i in 0..self.nb_types {
            for t in 0..self.nb_periods {
                let demand = instance.get_demand(i, t)?;
                add(LinearConstraint::eq(
                    format!("demand_{i}_{t}"),
                    LinearExpr::var(self.opening_stock(i, t)).plus(1.0, self.production(i, t)),
                    LinearExpr::constant(f64::from(demand)).plus(1.0, self.stock(i, t)),
                ));
            }
        }
        Ok(())
    }

    /// An item can only be produced when the machine is configured for it.
    fn state_constraints(&self, add: &mut impl FnMut(LinearConstraint<V>)) {
        for i in 0..self.nb_types {
            for t in 0..self.nb_periods {
                add(LinearConstraint::le(
                    format!("state_{i}_{t}"),
                    LinearExpr::var(self.production(i, t)),
                    LinearExpr::var(self.state(i, t)),
                ));
            }
        }
    }

    /// The machine is configured for exactly one type in every period.
    fn configuration_constraints(&self, add: &mut impl FnMut(LinearConstraint<V>)) {
        for t in 0..self.nb_periods {
            add(LinearConstraint::eq(
                format!("config_{t}"),
                (0..self.nb_types).map(|i| LinearExpr::var(self.state(i, t))).sum(),
                LinearExpr::constant(1.0),
            ));
        }
    }

    /// `u_i_j_t >= y_i_{t-1} + y_j_t - 1`. The indicator is only bounded from
    /// below; minimisation keeps it at zero when no switch happens.
    fn transition_constraints(&self, add: &mut impl FnMut(LinearConstraint<V>)) {
        for i in 0..self.nb_types {
            for j in 0..self.nb_types {
                for t in 1..self.nb_periods {
                    add(LinearConstraint::ge(
                        format!("transition_{i}_{j}_{t}"),
                        LinearExpr::var(self.transition(i, j, t)),
                        LinearExpr::var(self.state(i, t - 1))
                            .plus(1.0, self.state(j, t))
                            .plus_constant(-1.0),
                    ));
                }
            }
        }
    }

    /// Holding cost on every end-of-period stock plus the changeover cost of
    /// every switch between two distinct types.
    fn objective(&self, instance: &ProblemInstance) -> Result<LinearExpr<V>> {
        let holding = instance.inventory_cost() as f64;
        let stocking: LinearExpr<V> = (0..self.nb_types)
            .flat_map(|i| (0..self.nb_periods).map(move |t| (i, t)))
            .map(|(i, t)| LinearExpr::term(holding, self.stock(i, t)))
            .sum();

        let mut changeovers = LinearExpr::default();
        for i in 0..self.nb_types {
            for j in (0..self.nb_types).filter(|&j| j != i) {
                let cost = instance.changeover(i, j)? as f64;
                for t in 1..self.nb_periods {
                    changeovers = changeovers.plus(cost, self.transition(i, j, t));
                }
            }
        }

        Ok(stocking + changeovers)
    }

    pub fn nb_types(&self) -> usize {
        self.nb_types
    }

    pub fn nb_periods(&self) -> usize {
        self.nb_periods
    }

    pub fn nb_variables(&self) -> usize {
        self.production.len() + self.state.len() + self.stock.len() + self.transition.len()
    }

    pub fn production(&self, item: usize, period: usize) -> V {
        self.production[item * self.nb_periods + period]
    }

    pub fn state(&self, item: usize, period: usize) -> V {
        self.state[item * self.nb_periods + period]
    }

    /// Stock of `item` at the end of `period`.
    pub fn stock(&self, item: usize, period: usize) -> V {
        self.stock[item * (self.nb_periods + 1) + period + 1]
    }

    /// Stock of `item` before the first period.
    pub fn initial_stock(&self, item: usize) -> V {
        self.stock[item * (self.nb_periods + 1)]
    }

    /// Stock of `item` carried into `period`.
    fn opening_stock(&self, item: usize, period: usize) -> V {
        self.stock[item * (self.nb_periods + 1) + period]
    }

    /// Switch from `from` in `period - 1` to `to` in `period`, for `period >= 1`.
    pub fn transition(&self, from: usize, to: usize, period: usize) -> V {
        debug_assert!(period >= 1);
        let span = self.nb_periods - 1;
        self.transition[(from * self.nb_types + to) * span + period - 1]
    }
}
