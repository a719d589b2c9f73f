//! `defaults` inheritance.
//!
//! A module listing `defaults: ["a", "b"]` inherits the properties of the
//! named `*_defaults` modules. Each defaults module is resolved against its
//! own chain first. Siblings merge in declared order, and the module's own
//! properties merge last with the same rule: lists concatenate with the
//! inherited entries first, maps merge key by key, and any other value is
//! replaced by the later one. A pending `+=` then appends to the result.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::error::Error;
use crate::evaluator::concat;
use crate::value::{ResolvedModule, ResolvedValue};

type Properties = BTreeMap<String, ResolvedValue>;

/// Merge inherited properties into every module of one file.
///
/// Defaults modules declared later in the file are visible to earlier
/// modules. A name in a `defaults` list that no module in the file declares
/// is skipped with a warning.
pub fn resolve_defaults(modules: &[ResolvedModule]) -> Result<Vec<ResolvedModule>, Error> {
    let mut resolver = Resolver::new(modules);
    modules.iter().map(|m| resolver.resolve(m)).collect()
}

struct Resolver<'a> {
    index: HashMap<&'a str, &'a ResolvedModule>,
    /// Fully resolved property sets of defaults modules, by name.
    cache: HashMap<String, Properties>,
}

impl<'a> Resolver<'a> {
    fn new(modules: &'a [ResolvedModule]) -> Self {
        let index = modules
            .iter()
            .filter(|m| m.is_defaults_module())
            .filter_map(|m| m.name.as_deref().map(|name| (name, m)))
            .collect();
        Resolver {
            index,
            cache: HashMap::new(),
        }
    }

    fn resolve(&mut self, module: &ResolvedModule) -> Result<ResolvedModule, Error> {
        let mut path = vec![module.display_name().to_string()];
        let properties = self.resolve_properties(module, &mut path)?;
        Ok(ResolvedModule {
            module_type: module.module_type.clone(),
            name: module.name.clone(),
            properties,
            pending_appends: Vec::new(),
        })
    }

    /// `path` holds the chain of module names from the module being resolved
    /// down to `module`. Seeing a name already on it is a cycle; seeing one
    /// reached through another branch is just reuse.
    fn resolve_properties(
        &mut self,
        module: &ResolvedModule,
        path: &mut Vec<String>,
    ) -> Result<Properties, Error> {
        let mut inherited = Properties::new();

        for parent in module.defaults() {
            if path.iter().any(|p| p == parent) {
                let mut chain = path.clone();
                chain.push(parent.to_string());
                return Err(Error::DefaultsCycle { chain });
            }
            let Some(layer) = self.defaults_layer(parent, path)? else {
                warn!(
                    module = module.display_name(),
                    defaults = parent,
                    "defaults module not declared in this file, skipping"
                );
                continue;
            };
            merge_sibling_layer(&mut inherited, layer);
        }

        let mut properties = inherited;
        for (key, own) in &module.properties {
            if key == "defaults" {
                continue;
            }
            let merged = match properties.remove(key) {
                Some(base) => merge_value(base, own.clone()),
                None => own.clone(),
            };
            properties.insert(key.clone(), merged);
        }

        for append in &module.pending_appends {
            let base = properties.remove(&append.key).ok_or_else(|| {
                Error::evaluation(
                    format!(
                        "Cannot append to '{}': not set by the module or its defaults",
                        append.key
                    ),
                    append.position,
                )
            })?;
            let value = concat(base, append.value.clone(), append.position)?;
            properties.insert(append.key.clone(), value);
        }

        Ok(properties)
    }

    /// Resolved properties of the defaults module `name`, without its `name`.
    fn defaults_layer(
        &mut self,
        name: &str,
        path: &mut Vec<String>,
    ) -> Result<Option<Properties>, Error> {
        if !self.cache.contains_key(name) {
            let Some(module) = self.index.get(name).copied() else {
                return Ok(None);
            };
            path.push(name.to_string());
            let resolved = self.resolve_properties(module, path);
            path.pop();
            let resolved = resolved?;
            debug!(defaults = name, properties = resolved.len(), "resolved defaults");
            self.cache.insert(name.to_string(), resolved);
        }
        Ok(self.cache.get(name).map(|props| {
            props
                .iter()
                .filter(|(key, _)| key.as_str() != "name")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        }))
    }
}

/// Fold one sibling's properties into what earlier siblings contributed.
fn merge_sibling_layer(acc: &mut Properties, layer: Properties) {
    for (key, value) in layer {
        let merged = match acc.remove(&key) {
            Some(base) => merge_value(base, value),
            None => value,
        };
        acc.insert(key, merged);
    }
}

/// `later` over `base`, where `later` is a later sibling or the module itself.
fn merge_value(base: ResolvedValue, later: ResolvedValue) -> ResolvedValue {
    match (base, later) {
        (ResolvedValue::List(mut a), ResolvedValue::List(b)) => {
            a.extend(b);
            ResolvedValue::List(a)
        }
        (ResolvedValue::Map(mut a), ResolvedValue::Map(b)) => {
            for (key, value) in b {
                let merged = match a.remove(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => value,
                };
                a.insert(key, merged);
            }
            ResolvedValue::Map(a)
        }
        (_, later) => later,
    }
}
