use std::collections::BTreeMap;

use crate::ast::{Condition, Pattern};
use crate::error::Position;

/// A fully evaluated property value.
///
/// Consumers match on the variant; there is no implicit coercion between
/// shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Str(String),
    /// Order preserved from the source.
    List(Vec<ResolvedValue>),
    Map(BTreeMap<String, ResolvedValue>),
    Bool(bool),
    Int(i64),
    /// A select kept as data; no branch is chosen.
    Select(ResolvedSelect),
}

/// The value of one select branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Value(Box<ResolvedValue>),
    /// `unset`: the property is left as if never assigned.
    Unset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCase {
    pub patterns: Vec<Pattern>,
    pub value: Branch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelect {
    pub conditions: Vec<Condition>,
    pub cases: Vec<ResolvedCase>,
    pub default_branch: Option<Branch>,
}

impl ResolvedValue {
    /// Short shape name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResolvedValue::Str(_) => "string",
            ResolvedValue::List(_) => "list",
            ResolvedValue::Map(_) => "map",
            ResolvedValue::Bool(_) => "bool",
            ResolvedValue::Int(_) => "integer",
            ResolvedValue::Select(_) => "select",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ResolvedValue>> {
        match self {
            ResolvedValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The list's string entries, or `None` if this is not a list of strings.
    pub fn as_string_list(&self) -> Option<Vec<&str>> {
        match self {
            ResolvedValue::List(items) => items.iter().map(|v| v.as_str()).collect(),
            _ => None,
        }
    }

    /// Convenience constructor used heavily in tests.
    pub fn str_list<S: AsRef<str>>(items: &[S]) -> Self {
        ResolvedValue::List(
            items
                .iter()
                .map(|s| ResolvedValue::Str(s.as_ref().to_string()))
                .collect(),
        )
    }
}

/// A `+=` on a key the module never set itself. It can only be satisfied by
/// a value inherited through `defaults`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAppend {
    pub key: String,
    pub value: ResolvedValue,
    pub position: Position,
}

/// A module after evaluation (and, later, defaults resolution).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule {
    pub module_type: String,
    pub name: Option<String>,
    pub properties: BTreeMap<String, ResolvedValue>,
    /// Empty once defaults have been resolved.
    pub pending_appends: Vec<PendingAppend>,
}

impl ResolvedModule {
    pub fn get(&self, key: &str) -> Option<&ResolvedValue> {
        self.properties.get(key)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// The names listed in this module's `defaults` property.
    pub fn defaults(&self) -> Vec<&str> {
        self.get("defaults")
            .and_then(|v| v.as_string_list())
            .unwrap_or_default()
    }

    /// Whether this module only exists to be inherited from.
    pub fn is_defaults_module(&self) -> bool {
        self.module_type.ends_with("_defaults")
    }
}
