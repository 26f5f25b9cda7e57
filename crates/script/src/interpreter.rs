//! Script execution against a document body
//!
//! The interpreter mutates the document it is given in place. Callers run it
//! on a copy and only keep the copy when the whole script succeeded, which is
//! what makes a patch all-or-nothing per document.

use crate::ast::{Action, CmpOp, Expr, Operand, Statement};
use linkdb_core::{DocKey, Document, Error, Result, Scalar};
use serde_json::Value;

/// Lambda parameters in scope, innermost first.
struct Scope<'a> {
    name: &'a str,
    value: &'a Value,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        if self.name == name {
            Some(self.value)
        } else {
            self.parent.and_then(|p| p.lookup(name))
        }
    }
}

struct Interpreter<'k> {
    key: &'k DocKey,
}

pub(crate) fn execute(statements: &[Statement], key: &DocKey, doc: &mut Document) -> Result<()> {
    let interp = Interpreter { key };
    for statement in statements {
        interp.statement(statement, doc)?;
    }
    Ok(())
}

impl<'k> Interpreter<'k> {
    fn fail(&self, reason: impl Into<String>) -> Error {
        Error::script(self.key.as_str(), reason)
    }

    fn statement(&self, statement: &Statement, doc: &mut Document) -> Result<()> {
        let field = statement.field();
        match statement {
            Statement::RemoveWhere {
                param, predicate, ..
            } => {
                let items = self.list_field(doc, field)?;
                self.remove_where(items, field, param, predicate, None)
            }
            Statement::Map {
                param,
                condition,
                actions,
                ..
            } => {
                let items = self.list_field(doc, field)?;
                for (i, item) in items.iter_mut().enumerate() {
                    let matched = match condition {
                        Some(cond) => {
                            let scope = Scope {
                                name: param,
                                value: item,
                                parent: None,
                            };
                            self.eval(cond, Some(&scope))?
                        }
                        None => true,
                    };
                    if matched {
                        self.apply_actions(item, &format!("{}[{}]", field, i), param, actions)?;
                    }
                }
                Ok(())
            }
            Statement::Push { value, .. } => {
                let value = self.operand_value(value, None)?;
                let body = doc
                    .body_mut()
                    .as_object_mut()
                    .ok_or_else(|| self.fail("document body is not an object"))?;
                push_onto(body, field)
                    .map_err(|what| self.fail(format!("cannot push onto '{}': {}", field, what)))?
                    .push(value);
                Ok(())
            }
        }
    }

    fn list_field<'d>(&self, doc: &'d mut Document, field: &str) -> Result<&'d mut Vec<Value>> {
        match doc.field_mut(field) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.fail(format!(
                "field '{}' is {}, expected a list",
                field,
                json_type(other)
            ))),
            None => Err(self.fail(format!("missing field '{}'", field))),
        }
    }

    fn remove_where(
        &self,
        items: &mut Vec<Value>,
        what: &str,
        param: &str,
        predicate: &Expr,
        parent: Option<&Scope<'_>>,
    ) -> Result<()> {
        // Evaluate every predicate before removing anything so an error
        // part-way leaves the list untouched.
        let mut remove = Vec::with_capacity(items.len());
        for item in items.iter() {
            let scope = Scope {
                name: param,
                value: item,
                parent,
            };
            remove.push(self.eval(predicate, Some(&scope)).map_err(|e| match e {
                Error::ScriptError { key, reason } => Error::ScriptError {
                    key,
                    reason: format!("{} in {}.remove_where", reason, what),
                },
                other => other,
            })?);
        }
        let mut flags = remove.into_iter();
        items.retain(|_| !flags.next().unwrap_or(false));
        Ok(())
    }

    fn apply_actions(
        &self,
        element: &mut Value,
        what: &str,
        param: &str,
        actions: &[Action],
    ) -> Result<()> {
        for action in actions {
            // Actions may read the element while changing one of its lists,
            // so they see the element as it was before this action.
            let before = element.clone();
            let scope = Scope {
                name: param,
                value: &before,
                parent: None,
            };
            let obj = element
                .as_object_mut()
                .ok_or_else(|| self.fail(format!("{} is {}, expected an object", what, json_type(&before))))?;
            match action {
                Action::Push { field, value } => {
                    let value = self.operand_value(value, Some(&scope))?;
                    push_onto(obj, field)
                        .map_err(|t| {
                            self.fail(format!("cannot push onto {}.{}: {}", what, field, t))
                        })?
                        .push(value);
                }
                Action::RemoveWhere {
                    field,
                    param: inner,
                    predicate,
                } => {
                    let path = format!("{}.{}", what, field);
                    let items = match obj.get_mut(field) {
                        Some(Value::Array(items)) => items,
                        Some(other) => {
                            return Err(self.fail(format!(
                                "{} is {}, expected a list",
                                path,
                                json_type(other)
                            )))
                        }
                        None => return Err(self.fail(format!("missing field '{}'", path))),
                    };
                    self.remove_where(items, &path, inner, predicate, Some(&scope))?;
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr, scope: Option<&Scope<'_>>) -> Result<bool> {
        match expr {
            Expr::Compare { left, op, right } => {
                let l = self.operand_scalar(left, scope)?;
                let r = self.operand_scalar(right, scope)?;
                Ok(match op {
                    CmpOp::Eq => l == r,
                    CmpOp::Ne => l != r,
                })
            }
            Expr::And(a, b) => Ok(self.eval(a, scope)? && self.eval(b, scope)?),
            Expr::Or(a, b) => Ok(self.eval(a, scope)? || self.eval(b, scope)?),
            Expr::Not(e) => Ok(!self.eval(e, scope)?),
            Expr::Truthy(operand) => match self.operand_scalar(operand, scope)? {
                Scalar::Bool(b) => Ok(b),
                other => Err(self.fail(format!(
                    "condition is {}, expected bool",
                    other.type_name()
                ))),
            },
        }
    }

    fn operand_value(&self, operand: &Operand, scope: Option<&Scope<'_>>) -> Result<Value> {
        match operand {
            Operand::Literal(s) => Ok(s.to_json()),
            Operand::Var { name, path } => {
                let root = scope
                    .and_then(|s| s.lookup(name))
                    .ok_or_else(|| self.fail(format!("'{}' is not in scope", name)))?;
                let mut current = root;
                for segment in path {
                    match current.get(segment.as_str()) {
                        Some(next) => current = next,
                        // Missing fields read as null
                        None => return Ok(Value::Null),
                    }
                }
                Ok(current.clone())
            }
            Operand::Param(name) => Err(Error::UnboundParameter { name: name.clone() }),
        }
    }

    fn operand_scalar(&self, operand: &Operand, scope: Option<&Scope<'_>>) -> Result<Scalar> {
        let value = self.operand_value(operand, scope)?;
        Scalar::from_json(&value).ok_or_else(|| {
            self.fail(format!("cannot compare {}", json_type(&value)))
        })
    }
}

/// The list stored at `field`, created empty if absent.
fn push_onto<'a>(
    obj: &'a mut serde_json::Map<String, Value>,
    field: &str,
) -> std::result::Result<&'a mut Vec<Value>, &'static str> {
    let slot = obj
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => Ok(items),
        other => Err(json_type(other)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
