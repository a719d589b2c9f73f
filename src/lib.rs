pub mod ast;
pub mod cc;
pub mod config;
pub mod convert;
pub mod defaults;
pub mod element;
pub mod error;
pub mod evaluator;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod prebuilt;
pub mod registry;
pub mod value;

pub use config::{ConfigError, ConvertOptions};
pub use convert::{convert, ConversionOutput, Diagnostic, DiagnosticKind};
pub use defaults::resolve_defaults;
pub use element::ElementDescriptor;
pub use error::{Error, Position};
pub use evaluator::{evaluate, evaluate_file, Environment};
pub use parser::parse;
pub use registry::{ModuleHandler, Registry};
pub use value::{ResolvedModule, ResolvedValue};

// ── Core API ───────────────────────────────────────────────────────

/// The result of converting one Blueprint file.
pub type FileConversion = ConversionOutput;

/// Parse and evaluate one file, then fold `defaults` into every module.
pub fn resolve_source(input: &str) -> Result<Vec<ResolvedModule>, Error> {
    let file = parser::parse(input)?;
    let (modules, _env) = evaluator::evaluate_file(&file, Environment::new())?;
    defaults::resolve_defaults(&modules)
}

/// Run the whole pipeline over one file's text.
///
/// Any error fails the file as a whole; unknown and skipped module types
/// are reported as diagnostics instead.
pub fn convert_source(
    input: &str,
    options: &ConvertOptions,
    registry: &Registry,
) -> Result<FileConversion, Error> {
    let modules = resolve_source(input)?;
    convert::convert(&modules, registry, options)
}
