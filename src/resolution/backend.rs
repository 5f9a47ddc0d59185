//! Solver-independent description of a mixed integer program.
//!
//! The formulation in [`super::model`] only talks to a [`MipBackend`], so any
//! solver able to create binary and non-negative continuous variables, register
//! named linear constraints and minimise a linear objective can be plugged in.

use std::{iter::Sum, ops::Add};

/// A linear combination of variables plus a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpr<V> {
    terms: Vec<(V, f64)>,
    constant: f64,
}

impl<V> Default for LinearExpr<V> {
    fn default() -> Self {
        LinearExpr {
            terms: Vec::new(),
            constant: 0.0,
        }
    }
}

impl<V: Copy> LinearExpr<V> {
    pub fn constant(constant: f64) -> Self {
        LinearExpr {
            terms: Vec::new(),
            constant,
        }
    }

    pub fn var(var: V) -> Self {
        Self::term(1.0, var)
    }

    pub fn term(coefficient: f64, var: V) -> Self {
        LinearExpr {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    pub fn plus(mut self, coefficient: f64, var: V) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn plus_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    pub fn terms(&self) -> &[(V, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Value of the expression once every variable is given a value.
    pub fn evaluate(&self, value: impl Fn(V) -> f64) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, &(var, coef)| acc + coef * value(var))
    }
}

impl<V> Add for LinearExpr<V> {
    type Output = LinearExpr<V>;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<V> Sum for LinearExpr<V> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(LinearExpr::default(), |acc, e| acc + e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Eq,
    Le,
    Ge,
}

impl Sense {
    pub fn symbol(&self) -> &'static str {
        match self {
            Sense::Eq => "=",
            Sense::Le => "<=",
            Sense::Ge => ">=",
        }
    }
}

/// A named linear constraint `lhs <sense> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint<V> {
    pub name: String,
    pub lhs: LinearExpr<V>,
    pub sense: Sense,
    pub rhs: LinearExpr<V>,
}

impl<V: Copy + PartialEq> LinearConstraint<V> {
    pub fn eq(name: impl Into<String>, lhs: LinearExpr<V>, rhs: LinearExpr<V>) -> Self {
        Self::new(name, lhs, Sense::Eq, rhs)
    }

    pub fn le(name: impl Into<String>, lhs: LinearExpr<V>, rhs: LinearExpr<V>) -> Self {
        Self::new(name, lhs, Sense::Le, rhs)
    }

    pub fn ge(name: impl Into<String>, lhs: LinearExpr<V>, rhs: LinearExpr<V>) -> Self {
        Self::new(name, lhs, Sense::Ge, rhs)
    }

    fn new(name: impl Into<String>, lhs: LinearExpr<V>, sense: Sense, rhs: LinearExpr<V>) -> Self {
        LinearConstraint {
            name: name.into(),
            lhs,
            sense,
            rhs,
        }
    }

    /// Moves every variable to the left and every constant to the right,
    /// merging repeated variables. Terms keep their first-seen order.
    pub fn normalized(&self) -> (Vec<(V, f64)>, f64) {
        let mut terms: Vec<(V, f64)> = Vec::with_capacity(self.lhs.terms.len() + self.rhs.terms.len());
        let moved = self.rhs.terms.iter().map(|&(v, c)| (v, -c));
        for (var, coef) in self.lhs.terms.iter().copied().chain(moved) {
            match terms.iter_mut().find(|(v, _)| *v == var) {
                Some((_, c)) => *c += coef,
                None => terms.push((var, coef)),
            }
        }
        (terms, self.rhs.constant - self.lhs.constant)
    }

    pub fn is_satisfied(&self, value: impl Fn(V) -> f64, tolerance: f64) -> bool {
        let lhs = self.lhs.evaluate(&value);
        let rhs = self.rhs.evaluate(&value);
        match self.sense {
            Sense::Eq => (lhs - rhs).abs() <= tolerance,
            Sense::Le => lhs <= rhs + tolerance,
            Sense::Ge => lhs + tolerance >= rhs,
        }
    }
}

/// The modelling capability a MIP solver must offer.
pub trait MipBackend {
    type Var: Copy + PartialEq;

    /// A variable restricted to {0, 1}.
    fn bool_var(&mut self, name: String) -> Self::Var;

    /// A continuous variable in [0, +inf).
    fn num_var(&mut self, name: String) -> Self::Var;

    fn add_constraint(&mut self, constraint: LinearConstraint<Self::Var>);

    fn minimise(&mut self, objective: LinearExpr<Self::Var>);
}

/// Variable values read back after a successful solve.
pub trait MipSolution<V> {
    fn value(&self, var: V) -> f64;

    fn objective_value(&self) -> f64;
}
