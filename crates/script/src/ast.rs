//! Script syntax tree
//!
//! A script is a sequence of statements over top-level fields of the bound
//! document (`this`). Identifiers that are not lambda parameters are script
//! parameters, resolved from bindings before execution.

use linkdb_core::Scalar;

/// Parsed script statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `this.<field>.remove_where(<param> => <predicate>)`
    RemoveWhere {
        field: String,
        param: String,
        predicate: Expr,
    },
    /// `this.<field>.map(<param> => [if <condition>] { <actions> })`
    Map {
        field: String,
        param: String,
        condition: Option<Expr>,
        actions: Vec<Action>,
    },
    /// `this.<field>.push(<operand>)`
    Push { field: String, value: Operand },
}

/// Mutation applied to the current element of a `map`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `<param>.<field>.push(<operand>)`
    Push { field: String, value: Operand },
    /// `<param>.<field>.remove_where(<p> => <predicate>)`
    RemoveWhere {
        field: String,
        param: String,
        predicate: Expr,
    },
}

/// Boolean expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Bare operand, must evaluate to a boolean
    Truthy(Operand),
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
}

/// Value-producing leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Scalar),
    /// A lambda parameter, optionally followed by field accesses
    Var { name: String, path: Vec<String> },
    /// A script parameter, replaced by its binding before execution
    Param(String),
}

impl Operand {
    pub(crate) fn visit_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Operand::Param(name) = self {
            out.push(name);
        }
    }

    pub(crate) fn visit_params_mut(&mut self, f: &mut impl FnMut(&mut Operand)) {
        if matches!(self, Operand::Param(_)) {
            f(self);
        }
    }
}

impl Expr {
    pub(crate) fn visit_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Compare { left, right, .. } => {
                left.visit_params(out);
                right.visit_params(out);
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.visit_params(out);
                b.visit_params(out);
            }
            Expr::Not(e) => e.visit_params(out),
            Expr::Truthy(o) => o.visit_params(out),
        }
    }

    pub(crate) fn visit_params_mut(&mut self, f: &mut impl FnMut(&mut Operand)) {
        match self {
            Expr::Compare { left, right, .. } => {
                left.visit_params_mut(f);
                right.visit_params_mut(f);
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.visit_params_mut(f);
                b.visit_params_mut(f);
            }
            Expr::Not(e) => e.visit_params_mut(f),
            Expr::Truthy(o) => o.visit_params_mut(f),
        }
    }
}

impl Action {
    pub(crate) fn visit_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Action::Push { value, .. } => value.visit_params(out),
            Action::RemoveWhere { predicate, .. } => predicate.visit_params(out),
        }
    }

    pub(crate) fn visit_params_mut(&mut self, f: &mut impl FnMut(&mut Operand)) {
        match self {
            Action::Push { value, .. } => value.visit_params_mut(f),
            Action::RemoveWhere { predicate, .. } => predicate.visit_params_mut(f),
        }
    }
}

impl Statement {
    /// Top-level field this statement targets.
    pub fn field(&self) -> &str {
        match self {
            Statement::RemoveWhere { field, .. }
            | Statement::Map { field, .. }
            | Statement::Push { field, .. } => field,
        }
    }

    pub(crate) fn visit_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Statement::RemoveWhere { predicate, .. } => predicate.visit_params(out),
            Statement::Map {
                condition, actions, ..
            } => {
                if let Some(c) = condition {
                    c.visit_params(out);
                }
                for a in actions {
                    a.visit_params(out);
                }
            }
            Statement::Push { value, .. } => value.visit_params(out),
        }
    }

    pub(crate) fn visit_params_mut(&mut self, f: &mut impl FnMut(&mut Operand)) {
        match self {
            Statement::RemoveWhere { predicate, .. } => predicate.visit_params_mut(f),
            Statement::Map {
                condition, actions, ..
            } => {
                if let Some(c) = condition {
                    c.visit_params_mut(f);
                }
                for a in actions {
                    a.visit_params_mut(f);
                }
            }
            Statement::Push { value, .. } => value.visit_params_mut(f),
        }
    }
}
