//! Module type registry.
//!
//! Each recognized module type maps to a handler that turns a resolved
//! module into zero or more element descriptors.

use std::collections::BTreeMap;

use crate::cc::{BuildType, CcHandler};
use crate::config::ConvertOptions;
use crate::element::ElementDescriptor;
use crate::error::Error;
use crate::prebuilt::PrebuiltEtcHandler;
use crate::value::{ResolvedModule, ResolvedValue};

/// What a handler sees besides the module itself.
pub struct ConvertContext<'a> {
    pub options: &'a ConvertOptions,
}

/// Converts one resolved module. Dependency references travel inside the
/// returned descriptors.
pub trait ModuleHandler: Send + Sync {
    fn convert(
        &self,
        module: &ResolvedModule,
        ctx: &ConvertContext<'_>,
    ) -> Result<Vec<ElementDescriptor>, Error>;
}

enum Entry {
    Handler(Box<dyn ModuleHandler>),
    /// Recognized but never produces elements.
    Skipped,
}

/// Result of looking a module type up.
pub enum Lookup<'a> {
    Handler(&'a dyn ModuleHandler),
    Skipped,
    Unregistered,
}

pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

const SKIPPED_TYPES: &[&str] = &[
    "package",
    "license",
    "ndk_headers",
    "ndk_library",
    "cc_test",
    "cc_test_host",
    "cc_fuzz",
    "cc_benchmark",
    "genrule",
    "filegroup",
    "vndk_prebuilt_shared",
];

impl Registry {
    /// A registry with no types at all.
    pub fn empty() -> Self {
        Registry {
            entries: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, module_type: &str, handler: impl ModuleHandler + 'static) {
        self.entries
            .insert(module_type.to_string(), Entry::Handler(Box::new(handler)));
    }

    /// Recognize `module_type` without converting it.
    pub fn register_skipped(&mut self, module_type: &str) {
        self.entries.insert(module_type.to_string(), Entry::Skipped);
    }

    pub fn lookup(&self, module_type: &str) -> Lookup<'_> {
        match self.entries.get(module_type) {
            Some(Entry::Handler(h)) => Lookup::Handler(h.as_ref()),
            Some(Entry::Skipped) => Lookup::Skipped,
            None => Lookup::Unregistered,
        }
    }

    /// Registered type names, sorted.
    pub fn module_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Registry::empty();
        registry.register("cc_library_static", CcHandler::new(&[BuildType::Static]));
        registry.register("cc_library_shared", CcHandler::new(&[BuildType::Shared]));
        registry.register(
            "cc_library",
            CcHandler::new(&[BuildType::Static, BuildType::Shared]),
        );
        registry.register("cc_binary", CcHandler::new(&[BuildType::Binary]));
        registry.register("cc_binary_host", CcHandler::new(&[BuildType::Binary]));
        registry.register("prebuilt_etc", PrebuiltEtcHandler);
        registry.register("prebuilt_etc_host", PrebuiltEtcHandler);
        // Defaults modules are folded in before conversion.
        registry.register_skipped("cc_defaults");
        for module_type in SKIPPED_TYPES {
            registry.register_skipped(module_type);
        }
        registry
    }
}

// ── Property access ─────────────────────────────────────────────────

/// Typed reads of a module's properties that fail with a conversion error
/// naming the module and property.
pub(crate) struct Props<'m> {
    module: &'m ResolvedModule,
}

impl<'m> Props<'m> {
    pub(crate) fn new(module: &'m ResolvedModule) -> Self {
        Props { module }
    }

    pub(crate) fn error(&self, property: &str, message: String) -> Error {
        Error::Conversion {
            module_type: self.module.module_type.clone(),
            module: self.module.display_name().to_string(),
            property: property.to_string(),
            message,
        }
    }

    pub(crate) fn name(&self) -> Result<&'m str, Error> {
        self.string("name")?
            .ok_or_else(|| self.error("name", "required property is missing".to_string()))
    }

    pub(crate) fn string(&self, key: &str) -> Result<Option<&'m str>, Error> {
        match self.module.get(key) {
            None => Ok(None),
            Some(ResolvedValue::Str(s)) => Ok(Some(s)),
            Some(other) => Err(self.error(
                key,
                format!("expected a string, found {}", other.kind_name()),
            )),
        }
    }

    pub(crate) fn bool(&self, key: &str) -> Result<Option<bool>, Error> {
        match self.module.get(key) {
            None => Ok(None),
            Some(ResolvedValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.error(
                key,
                format!("expected a bool, found {}", other.kind_name()),
            )),
        }
    }

    /// A list of strings; an absent property reads as empty.
    pub(crate) fn string_list(&self, key: &str) -> Result<Vec<&'m str>, Error> {
        match self.module.get(key) {
            None => Ok(Vec::new()),
            Some(ResolvedValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    ResolvedValue::Str(s) => Ok(s.as_str()),
                    other => Err(self.error(
                        key,
                        format!("list entry {} is a {}, expected a string", i, other.kind_name()),
                    )),
                })
                .collect(),
            Some(other) => Err(self.error(
                key,
                format!("expected a list of strings, found {}", other.kind_name()),
            )),
        }
    }
}
