use std::fmt;
use thiserror::Error;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (character offset within the line)
    pub column: usize,
    /// 0-based absolute byte offset from the start of input
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Everything that can abort the conversion of a single file.
///
/// Every variant is file-scoped: callers drop the whole file's output when
/// they see one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{begin}: {message}")]
    Syntax {
        message: String,
        /// Start of the offending region
        begin: Position,
        /// End of the offending region (exclusive)
        end: Position,
    },

    /// A construct the grammar recognizes but the converter refuses to guess at.
    #[error("{begin}: unsupported syntax: {construct}")]
    UnsupportedSyntax {
        construct: String,
        begin: Position,
        end: Position,
    },

    #[error("{second}: duplicate module name '{name}' (first declared at {first})")]
    DuplicateModule {
        name: String,
        first: Position,
        second: Position,
    },

    #[error("{position}: {message}")]
    Evaluation { message: String, position: Position },

    #[error("defaults cycle: {}", .chain.join(" -> "))]
    DefaultsCycle { chain: Vec<String> },

    #[error("{module_type} '{module}': property '{property}': {message}")]
    Conversion {
        module_type: String,
        module: String,
        property: String,
        message: String,
    },
}

impl Error {
    pub fn syntax_error(message: String, begin: Position, end: Position) -> Self {
        Error::Syntax {
            message,
            begin,
            end,
        }
    }

    pub fn evaluation(message: impl Into<String>, position: Position) -> Self {
        Error::Evaluation {
            message: message.into(),
            position,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Syntax { .. } => "syntax-error",
            Error::UnsupportedSyntax { .. } => "unsupported-syntax",
            Error::DuplicateModule { .. } => "duplicate-module",
            Error::Evaluation { .. } => "evaluation-error",
            Error::DefaultsCycle { .. } => "defaults-cycle",
            Error::Conversion { .. } => "conversion-error",
        }
    }

    /// The source span of the error, when it has one.
    ///
    /// Defaults cycles and conversion errors are found after positions have
    /// been dropped from the resolved records, so they report none.
    pub fn span(&self) -> Option<(Position, Position)> {
        match self {
            Error::Syntax { begin, end, .. } | Error::UnsupportedSyntax { begin, end, .. } => {
                Some((*begin, *end))
            }
            Error::DuplicateModule { second, .. } => Some((*second, *second)),
            Error::Evaluation { position, .. } => Some((*position, *position)),
            Error::DefaultsCycle { .. } | Error::Conversion { .. } => None,
        }
    }

    /// True for the syntax family, including unsupported constructs.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            Error::Syntax { .. } | Error::UnsupportedSyntax { .. } | Error::DuplicateModule { .. }
        )
    }
}
