use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::ast::*;
use crate::error::{Error, Position};
use crate::value::*;

/// Variables visible at a point in one file.
///
/// Built up as top-level assignments are executed in file order, so a
/// module only sees variables assigned above it. Never shared across files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: BTreeMap<String, ResolvedValue>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.vars.get(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: ResolvedValue) {
        self.vars.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Execute a whole file: assignments update the environment in order and
/// each module is evaluated against the environment as it stands at that
/// module. Returns the evaluated modules and the final environment.
pub fn evaluate_file(
    file: &File,
    mut env: Environment,
) -> Result<(Vec<ResolvedModule>, Environment), Error> {
    let mut modules = Vec::new();
    let mut names = NameIndex::default();
    for def in &file.defs {
        match def {
            Definition::Assignment(assignment) => execute_assignment(assignment, &mut env)?,
            Definition::Module(module) => {
                let resolved = evaluate_module(module, &env)?;
                names.claim(&resolved, module.position)?;
                modules.push(resolved);
            }
        }
    }
    debug!(
        modules = modules.len(),
        variables = env.len(),
        "evaluated blueprint file"
    );
    Ok((modules, env))
}

/// Evaluate modules against a fixed environment snapshot.
pub fn evaluate(modules: &[Module], env: &Environment) -> Result<Vec<ResolvedModule>, Error> {
    let mut names = NameIndex::default();
    modules
        .iter()
        .map(|module| {
            let resolved = evaluate_module(module, env)?;
            names.claim(&resolved, module.position)?;
            Ok(resolved)
        })
        .collect()
}

/// Evaluated module names seen so far in one file. The parser only catches
/// duplicates spelled as string literals; names built from variables or
/// concatenation are only known here.
#[derive(Default)]
struct NameIndex {
    seen: HashMap<String, Position>,
}

impl NameIndex {
    fn claim(&mut self, module: &ResolvedModule, position: Position) -> Result<(), Error> {
        let Some(name) = &module.name else {
            return Ok(());
        };
        if let Some(first) = self.seen.get(name) {
            return Err(Error::DuplicateModule {
                name: name.clone(),
                first: *first,
                second: position,
            });
        }
        self.seen.insert(name.clone(), position);
        Ok(())
    }
}

/// `name = value` binds or rebinds; `name += value` requires an earlier binding.
fn execute_assignment(assignment: &Assignment, env: &mut Environment) -> Result<(), Error> {
    let value = evaluate_expr(&assignment.value, env)?;
    let value = match assignment.op {
        AssignOp::Set => value,
        AssignOp::Append => match env.get(&assignment.name) {
            Some(existing) => concat(existing.clone(), value, assignment.position)?,
            None => {
                return Err(Error::evaluation(
                    format!(
                        "Cannot append to undefined variable '{}'",
                        assignment.name
                    ),
                    assignment.position,
                ))
            }
        },
    };
    env.bind(assignment.name.clone(), value);
    Ok(())
}

/// Evaluate one module's properties.
///
/// A `+=` on a key the module has not set is kept as a pending append when
/// the module inherits through `defaults`; otherwise it is an error.
pub fn evaluate_module(module: &Module, env: &Environment) -> Result<ResolvedModule, Error> {
    let mut pending: Vec<PendingAppend> = Vec::new();
    let properties = apply_properties(&module.properties, env, Some(&mut pending))?;

    if !pending.is_empty() && !properties.contains_key("defaults") {
        let first = &pending[0];
        return Err(Error::evaluation(
            format!("Cannot append to unset property '{}'", first.key),
            first.position,
        ));
    }

    let name = properties
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    Ok(ResolvedModule {
        module_type: module.module_type.clone(),
        name,
        properties,
        pending_appends: pending,
    })
}

/// Apply a property block in order. Shared by module bodies and map
/// literals; only module bodies collect pending appends.
fn apply_properties(
    properties: &[Property],
    env: &Environment,
    mut pending: Option<&mut Vec<PendingAppend>>,
) -> Result<BTreeMap<String, ResolvedValue>, Error> {
    let mut out: BTreeMap<String, ResolvedValue> = BTreeMap::new();
    for prop in properties {
        if prop.value == Expr::Unset {
            return Err(Error::evaluation(
                format!("'unset' assigned to '{}' outside a select", prop.name),
                prop.position,
            ));
        }
        let value = evaluate_expr(&prop.value, env)?;
        match prop.op {
            AssignOp::Set => {
                // A `+=` must follow the `=` it extends.
                if let Some(earlier) = pending
                    .as_deref()
                    .and_then(|pending| pending.iter().find(|p| p.key == prop.name))
                {
                    return Err(Error::evaluation(
                        format!("Cannot append to unset property '{}'", earlier.key),
                        earlier.position,
                    ));
                }
                out.insert(prop.name.clone(), value);
            }
            AssignOp::Append => {
                if let Some(existing) = out.remove(&prop.name) {
                    out.insert(prop.name.clone(), concat(existing, value, prop.position)?);
                    continue;
                }
                let Some(pending) = pending.as_deref_mut() else {
                    return Err(Error::evaluation(
                        format!("Cannot append to unset property '{}'", prop.name),
                        prop.position,
                    ));
                };
                match pending.iter_mut().find(|p| p.key == prop.name) {
                    Some(earlier) => {
                        earlier.value = concat(earlier.value.clone(), value, prop.position)?;
                    }
                    None => pending.push(PendingAppend {
                        key: prop.name.clone(),
                        value,
                        position: prop.position,
                    }),
                }
            }
        }
    }
    Ok(out)
}

/// Evaluate an expression to a concrete value.
pub fn evaluate_expr(expr: &Expr, env: &Environment) -> Result<ResolvedValue, Error> {
    match expr {
        Expr::String(s) => Ok(ResolvedValue::Str(s.clone())),
        Expr::Int(i) => Ok(ResolvedValue::Int(*i)),
        Expr::Bool(b) => Ok(ResolvedValue::Bool(*b)),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate_expr(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(ResolvedValue::List),
        Expr::Map(props) => apply_properties(props, env, None).map(ResolvedValue::Map),
        Expr::VariableRef { name, position } => env.get(name).cloned().ok_or_else(|| {
            Error::evaluation(format!("Undefined variable '{}'", name), *position)
        }),
        Expr::Concat {
            left,
            right,
            position,
        } => {
            let left = evaluate_expr(left, env)?;
            let right = evaluate_expr(right, env)?;
            concat(left, right, *position)
        }
        Expr::Select(select) => evaluate_select(select, env).map(ResolvedValue::Select),
        // Only reachable outside a select case.
        Expr::Unset => Err(Error::evaluation(
            "'unset' is only valid as a select case value",
            Position::default(),
        )),
    }
}

fn evaluate_branch(expr: &Expr, env: &Environment) -> Result<Branch, Error> {
    match expr {
        Expr::Unset => Ok(Branch::Unset),
        other => Ok(Branch::Value(Box::new(evaluate_expr(other, env)?))),
    }
}

fn evaluate_select(select: &SelectExpr, env: &Environment) -> Result<ResolvedSelect, Error> {
    let cases = select
        .cases
        .iter()
        .map(|case| {
            Ok(ResolvedCase {
                patterns: case.patterns.clone(),
                value: evaluate_branch(&case.value, env)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let default_branch = select
        .default_branch
        .as_deref()
        .map(|expr| evaluate_branch(expr, env))
        .transpose()?;
    Ok(ResolvedSelect {
        conditions: select.conditions.clone(),
        cases,
        default_branch,
    })
}

// ── Concatenation ───────────────────────────────────────────────────

/// `left + right` for the shapes Blueprint allows.
///
/// A select on either side absorbs the other operand into each of its
/// branches; an `unset` branch becomes the other operand alone.
pub fn concat(
    left: ResolvedValue,
    right: ResolvedValue,
    position: Position,
) -> Result<ResolvedValue, Error> {
    use ResolvedValue::*;
    match (left, right) {
        (Str(mut a), Str(b)) => {
            a.push_str(&b);
            Ok(Str(a))
        }
        (List(mut a), List(b)) => {
            a.extend(b);
            Ok(List(a))
        }
        (Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(|| {
            Error::evaluation(format!("Integer overflow adding {} and {}", a, b), position)
        }),
        (Map(a), Map(b)) => merge_maps(a, b, position).map(Map),
        (Select(sel), other) => {
            map_branches(sel, |branch| concat_branch(branch, &other, position, true)).map(Select)
        }
        (other, Select(sel)) => {
            map_branches(sel, |branch| concat_branch(branch, &other, position, false)).map(Select)
        }
        (a, b) => Err(Error::evaluation(
            format!("Cannot concatenate {} and {}", a.kind_name(), b.kind_name()),
            position,
        )),
    }
}

/// Map + map: keys from both sides, overlapping keys concatenated.
fn merge_maps(
    mut left: BTreeMap<String, ResolvedValue>,
    right: BTreeMap<String, ResolvedValue>,
    position: Position,
) -> Result<BTreeMap<String, ResolvedValue>, Error> {
    for (key, value) in right {
        let merged = match left.remove(&key) {
            Some(existing) => concat(existing, value, position)?,
            None => value,
        };
        left.insert(key, merged);
    }
    Ok(left)
}

fn concat_branch(
    branch: Branch,
    other: &ResolvedValue,
    position: Position,
    select_on_left: bool,
) -> Result<Branch, Error> {
    let value = match branch {
        Branch::Unset => other.clone(),
        Branch::Value(v) if select_on_left => concat(*v, other.clone(), position)?,
        Branch::Value(v) => concat(other.clone(), *v, position)?,
    };
    Ok(Branch::Value(Box::new(value)))
}

fn map_branches(
    select: ResolvedSelect,
    mut f: impl FnMut(Branch) -> Result<Branch, Error>,
) -> Result<ResolvedSelect, Error> {
    let cases = select
        .cases
        .into_iter()
        .map(|case| {
            Ok(ResolvedCase {
                patterns: case.patterns,
                value: f(case.value)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let default_branch = select.default_branch.map(&mut f).transpose()?;
    Ok(ResolvedSelect {
        conditions: select.conditions,
        cases,
        default_branch,
    })
}
