//! Integer program representation
//!
//! A small declarative model: bounded integer variables, linear
//! (in)equalities, product equalities (`target == left * right`) and a
//! linear objective to minimize. The budget builder populates one of these
//! per request and hands it to a [`Solver`](super::solver::Solver).

use std::fmt;

/// Handle to a variable inside a [`Model`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A bounded integer variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntVar {
    pub name: String,
    pub lo: i64,
    pub hi: i64,
    /// Value the solver should start from
    pub hint: Option<i64>,
    /// Integer decision variable; the others follow from the constraints
    pub decision: bool,
}

/// `sum(coef * var) + constant`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, i64)>,
    pub constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn plus(mut self, constant: i64) -> Self {
        self.constant += constant;
        self
    }

    /// Add `coef * var`, merging with an existing term for the same variable
    pub fn add_term(&mut self, var: VarId, coef: i64) {
        match self.terms.iter_mut().find(|(v, _)| *v == var) {
            Some((_, c)) => *c += coef,
            None => self.terms.push((var, coef)),
        }
        self.terms.retain(|(_, c)| *c != 0);
    }

    pub fn eval(&self, values: &[i64]) -> i128 {
        self.terms
            .iter()
            .map(|(v, c)| i128::from(*c) * i128::from(values[v.index()]))
            .sum::<i128>()
            + i128::from(self.constant)
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        Self::new().term(var, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

impl Relation {
    pub fn holds(self, lhs: i128, rhs: i128) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Le => lhs <= rhs,
            Self::Ge => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

/// `terms relation rhs`; expression constants are folded into `rhs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub label: String,
    pub terms: Vec<(VarId, i64)>,
    pub relation: Relation,
    pub rhs: i128,
}

impl LinearConstraint {
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        let lhs: i128 = self
            .terms
            .iter()
            .map(|(v, c)| i128::from(*c) * i128::from(values[v.index()]))
            .sum();
        self.relation.holds(lhs, self.rhs)
    }
}

/// `target == left * right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductConstraint {
    pub label: String,
    pub target: VarId,
    pub left: VarId,
    pub right: VarId,
}

impl ProductConstraint {
    pub fn is_satisfied(&self, values: &[i64]) -> bool {
        i128::from(values[self.target.index()])
            == i128::from(values[self.left.index()]) * i128::from(values[self.right.index()])
    }
}

/// Variables, constraints and a minimization objective
#[derive(Debug, Clone, Default)]
pub struct Model {
    vars: Vec<IntVar>,
    linear: Vec<LinearConstraint>,
    products: Vec<ProductConstraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an integer variable in `[lo, hi]`
    pub fn new_int_var(&mut self, lo: i64, hi: i64, name: impl Into<String>) -> VarId {
        self.vars.push(IntVar {
            name: name.into(),
            lo,
            hi,
            hint: None,
            decision: false,
        });
        VarId(self.vars.len() - 1)
    }

    pub fn set_hint(&mut self, var: VarId, value: i64) {
        if let Some(v) = self.vars.get_mut(var.index()) {
            v.hint = Some(value);
        }
    }

    pub fn mark_decision(&mut self, var: VarId) {
        if let Some(v) = self.vars.get_mut(var.index()) {
            v.decision = true;
        }
    }

    pub fn add_linear(
        &mut self,
        label: impl Into<String>,
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
    ) {
        self.linear.push(LinearConstraint {
            label: label.into(),
            terms: expr.terms,
            relation,
            rhs: i128::from(rhs) - i128::from(expr.constant),
        });
    }

    pub fn add_eq(&mut self, label: impl Into<String>, expr: LinearExpr, rhs: i64) {
        self.add_linear(label, expr, Relation::Eq, rhs);
    }

    pub fn add_le(&mut self, label: impl Into<String>, expr: LinearExpr, rhs: i64) {
        self.add_linear(label, expr, Relation::Le, rhs);
    }

    pub fn add_ge(&mut self, label: impl Into<String>, expr: LinearExpr, rhs: i64) {
        self.add_linear(label, expr, Relation::Ge, rhs);
    }

    /// Require `target == left * right`
    pub fn add_multiplication_eq(
        &mut self,
        label: impl Into<String>,
        target: VarId,
        left: VarId,
        right: VarId,
    ) {
        self.products.push(ProductConstraint {
            label: label.into(),
            target,
            left,
            right,
        });
    }

    pub fn minimize(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn vars(&self) -> &[IntVar] {
        &self.vars
    }

    pub fn var(&self, id: VarId) -> &IntVar {
        &self.vars[id.index()]
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear
    }

    pub fn product_constraints(&self) -> &[ProductConstraint] {
        &self.products
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn num_constraints(&self) -> usize {
        self.linear.len() + self.products.len()
    }

    /// Structural checks: every referenced variable exists and every domain is non-empty
    pub fn validate(&self) -> Result<(), String> {
        if let Some(v) = self.vars.iter().find(|v| v.lo > v.hi) {
            return Err(format!("variable {} has empty domain [{}, {}]", v.name, v.lo, v.hi));
        }

        let n = self.vars.len();
        let in_range = |var: &VarId| var.index() < n;

        for c in &self.linear {
            if !c.terms.iter().all(|(v, _)| in_range(v)) {
                return Err(format!("constraint {} references an unknown variable", c.label));
            }
        }
        for p in &self.products {
            if ![p.target, p.left, p.right].iter().all(in_range) {
                return Err(format!("constraint {} references an unknown variable", p.label));
            }
        }
        if !self.objective.terms.iter().all(|(v, _)| in_range(v)) {
            return Err("objective references an unknown variable".to_string());
        }
        Ok(())
    }

    /// Label of the first constraint or bound violated by a full assignment
    pub fn first_violation(&self, values: &[i64]) -> Option<String> {
        if values.len() != self.vars.len() {
            return Some(format!(
                "assignment has {} values for {} variables",
                values.len(),
                self.vars.len()
            ));
        }
        if let Some((var, value)) = self
            .vars
            .iter()
            .zip(values)
            .find(|(var, value)| **value < var.lo || **value > var.hi)
        {
            return Some(format!(
                "{} = {} outside [{}, {}]",
                var.name, value, var.lo, var.hi
            ));
        }
        if let Some(c) = self.linear.iter().find(|c| !c.is_satisfied(values)) {
            return Some(format!("{} ({} {})", c.label, c.relation.symbol(), c.rhs));
        }
        self.products
            .iter()
            .find(|p| !p.is_satisfied(values))
            .map(|p| p.label.clone())
    }

    pub fn objective_value(&self, values: &[i64]) -> i128 {
        self.objective.eval(values)
    }
}
