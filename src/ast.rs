//! Syntax tree produced by the parser.
//!
//! The tree is immutable once built; evaluation produces new values rather
//! than rewriting nodes.

use crate::error::Position;

/// `=` replaces, `+=` appends to an earlier binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Append,
}

/// An unevaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Expr>),
    /// `{ key: value, ... }`, used for arch and target blocks.
    Map(Vec<Property>),
    /// Bare identifier, resolved against the file environment.
    VariableRef { name: String, position: Position },
    /// `left + right`
    Concat {
        left: Box<Expr>,
        right: Box<Expr>,
        position: Position,
    },
    Select(SelectExpr),
    /// `unset`, only meaningful as a select case value.
    Unset,
}

/// One condition of a select: `arch()`, `soong_config_variable("ns", "var")`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub function: String,
    pub args: Vec<String>,
}

/// A case label. Tuple patterns hold one label per condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    String(String),
    Bool(bool),
    /// `any`, matches every value
    Any,
    /// `default`
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectCase {
    pub patterns: Vec<Pattern>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub conditions: Vec<Condition>,
    /// Non-default cases in source order.
    pub cases: Vec<SelectCase>,
    pub default_branch: Option<Box<Expr>>,
    pub position: Position,
}

/// `key: value`, `key = value` or `key += value` inside a module or map.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub op: AssignOp,
    pub value: Expr,
    pub position: Position,
}

/// A top-level variable assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub op: AssignOp,
    pub value: Expr,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub module_type: String,
    /// The `name` property, when it is a string literal.
    pub name: Option<String>,
    pub properties: Vec<Property>,
    pub position: Position,
}

impl Module {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Assignment(Assignment),
    Module(Module),
}

/// A parsed Blueprint file: definitions in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    pub defs: Vec<Definition>,
}

impl File {
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.defs.iter().filter_map(|d| match d {
            Definition::Module(m) => Some(m),
            Definition::Assignment(_) => None,
        })
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.defs.iter().filter_map(|d| match d {
            Definition::Assignment(a) => Some(a),
            Definition::Module(_) => None,
        })
    }
}
