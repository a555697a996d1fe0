//! Error types for Quiver.

use alloc::string::String;
use core::fmt;

/// Result type alias for Quiver operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Quiver operations.
///
/// Compilation errors (`UnknownOperator`, `InvalidOperands`, `UnknownExtension`,
/// `InvalidPattern`, `Parse`) surface to whoever requested the compilation.
/// `CycleOverrun` aborts the public call whose publish started the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The parser produced an operator tag the compiler does not know.
    UnknownOperator {
        tag: String,
    },
    /// An operator received the wrong number of operands.
    InvalidOperands {
        op: String,
        expected: usize,
        got: usize,
    },
    /// A function call names an extension that is not registered.
    UnknownExtension {
        name: String,
    },
    /// A regex operand is not a valid pattern.
    InvalidPattern {
        pattern: String,
        message: String,
    },
    /// The external parser rejected a query.
    Parse {
        query: String,
        message: String,
    },
    /// Notification cascades exceeded the configured ceiling.
    CycleOverrun {
        cycles: usize,
    },
    /// A required collaborator was not supplied at initialization.
    MissingCollaborator {
        name: String,
    },
    /// A record was asked to set a field it does not declare.
    UnknownField {
        field: String,
    },
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownOperator { tag } => {
                write!(f, "Invalid parser node: {}", tag)
            }
            Error::InvalidOperands { op, expected, got } => {
                write!(
                    f,
                    "Operator {} expects {} operand(s), got {}",
                    op, expected, got
                )
            }
            Error::UnknownExtension { name } => {
                write!(f, "Extension '{}' does not exist", name)
            }
            Error::InvalidPattern { pattern, message } => {
                write!(f, "Invalid pattern /{}/: {}", pattern, message)
            }
            Error::Parse { query, message } => {
                write!(f, "Failed to parse query '{}': {}", query, message)
            }
            Error::CycleOverrun { cycles } => {
                write!(f, "Too many notification cycles (limit {})", cycles)
            }
            Error::MissingCollaborator { name } => {
                write!(f, "Required collaborator not available: {}", name)
            }
            Error::UnknownField { field } => {
                write!(f, "Record does not declare field: {}", field)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates an unknown operator error.
    pub fn unknown_operator(tag: impl Into<String>) -> Self {
        Error::UnknownOperator { tag: tag.into() }
    }

    /// Creates an operand count error.
    pub fn invalid_operands(op: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::InvalidOperands {
            op: op.into(),
            expected,
            got,
        }
    }

    /// Creates an unknown extension error.
    pub fn unknown_extension(name: impl Into<String>) -> Self {
        Error::UnknownExtension { name: name.into() }
    }

    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(query: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Creates a cycle overrun error.
    pub fn cycle_overrun(cycles: usize) -> Self {
        Error::CycleOverrun { cycles }
    }

    /// Creates a missing collaborator error.
    pub fn missing_collaborator(name: impl Into<String>) -> Self {
        Error::MissingCollaborator { name: name.into() }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Error::UnknownField {
            field: field.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error is raised while compiling a query.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownOperator { .. }
                | Error::InvalidOperands { .. }
                | Error::UnknownExtension { .. }
                | Error::InvalidPattern { .. }
                | Error::Parse { .. }
        )
    }
}
