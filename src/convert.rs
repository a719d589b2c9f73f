//! Dispatch of resolved modules to their registered handlers.

use std::fmt;

use tracing::debug;

use crate::config::ConvertOptions;
use crate::element::ElementDescriptor;
use crate::error::Error;
use crate::registry::{ConvertContext, Lookup, Registry};
use crate::value::ResolvedModule;

/// Non-fatal report about a module that produced no elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub module_type: String,
    pub module: String,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No handler is registered for the type.
    UnknownType,
    /// The type is recognized and deliberately not converted.
    Skipped,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::UnknownType => write!(
                f,
                "unknown module type '{}' ({}), skipped",
                self.module_type, self.module
            ),
            DiagnosticKind::Skipped => {
                write!(f, "{} '{}' not converted", self.module_type, self.module)
            }
        }
    }
}

/// Everything one file converted to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOutput {
    pub descriptors: Vec<ElementDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert modules whose defaults are already resolved.
///
/// The first handler error fails the whole batch; no descriptors are
/// returned alongside an error.
pub fn convert(
    modules: &[ResolvedModule],
    registry: &Registry,
    options: &ConvertOptions,
) -> Result<ConversionOutput, Error> {
    let ctx = ConvertContext { options };
    let mut output = ConversionOutput::default();

    for module in modules {
        let skipped = |kind| Diagnostic {
            module_type: module.module_type.clone(),
            module: module.display_name().to_string(),
            kind,
        };
        match registry.lookup(&module.module_type) {
            Lookup::Handler(handler) => {
                let elements = handler.convert(module, &ctx)?;
                debug!(
                    module = module.display_name(),
                    module_type = module.module_type.as_str(),
                    elements = elements.len(),
                    "converted module"
                );
                output.descriptors.extend(elements);
            }
            Lookup::Skipped => output.diagnostics.push(skipped(DiagnosticKind::Skipped)),
            Lookup::Unregistered if module.is_defaults_module() => {
                output.diagnostics.push(skipped(DiagnosticKind::Skipped));
            }
            Lookup::Unregistered => {
                output.diagnostics.push(skipped(DiagnosticKind::UnknownType));
            }
        }
    }
    Ok(output)
}
