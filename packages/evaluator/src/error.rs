use kiln_ast::{ParseError, SourceLocation, TreeError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type ReduceResult<T> = Result<T, ReduceError>;

/// Errors raised while reducing a tree. The `Display` text is the
/// observable diagnostic and is compared verbatim by callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    #[error("{message}")]
    Syntax { message: String },

    #[error("{message}")]
    UnresolvedReference { name: String, message: String },

    #[error("{message}")]
    Type { message: String },

    #[error("{name} has already been defined in this scope")]
    Redefinition { name: String },

    #[error("{message}")]
    Arity { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UnresolvedReference,
    Type,
    Redefinition,
    Arity,
    Internal,
}

impl ReduceError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn arity(message: impl Into<String>) -> Self {
        Self::Arity {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn redefinition(name: impl Into<String>) -> Self {
        Self::Redefinition { name: name.into() }
    }

    pub fn unresolved(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::unresolved(name, format!("Undefined variable ${}", name))
    }

    pub fn undefined_mixin(name: &str) -> Self {
        Self::unresolved(name, format!("Undefined mixin {}", name))
    }

    pub fn undefined_function(namespace: &str, name: &str) -> Self {
        Self::unresolved(name, format!("Undefined function {}.{}", namespace, name))
    }

    pub fn unknown_module(specifier: &str) -> Self {
        Self::unresolved(specifier, format!("Unknown module {}", specifier))
    }

    pub fn not_exported(file: &str, name: &str) -> Self {
        Self::unresolved(name, format!("{} does not export {}", file, name))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::Type { .. } => ErrorKind::Type,
            Self::Redefinition { .. } => ErrorKind::Redefinition,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<ParseError> for ReduceError {
    fn from(error: ParseError) -> Self {
        Self::syntax(error.to_string())
    }
}

impl From<TreeError> for ReduceError {
    fn from(error: TreeError) -> Self {
        Self::internal(error.to_string())
    }
}

/// A reduction failure at the file boundary: the diagnostic plus where it
/// happened.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct CompileError {
    pub error: ReduceError,
    pub file: Option<PathBuf>,
    pub location: Option<SourceLocation>,
    /// Source form of the offending node.
    pub excerpt: Option<String>,
}

impl CompileError {
    pub fn new(error: ReduceError) -> Self {
        Self {
            error,
            file: None,
            location: None,
            excerpt: None,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Multi-line report with position and excerpt.
    pub fn report(&self) -> String {
        Report(self).to_string()
    }
}

impl From<ReduceError> for CompileError {
    fn from(error: ReduceError) -> Self {
        Self::new(error)
    }
}

struct Report<'a>(&'a CompileError);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let err = self.0;
        write!(f, "{}", err.error)?;
        match (&err.file, err.location) {
            (Some(file), Some(loc)) => write!(f, "\n  at {}:{}:{}", file.display(), loc.line, loc.column)?,
            (Some(file), None) => write!(f, "\n  at {}", file.display())?,
            (None, Some(loc)) => write!(f, "\n  at {}:{}", loc.line, loc.column)?,
            (None, None) => {}
        }
        if let Some(excerpt) = &err.excerpt {
            write!(f, "\n  > {}", excerpt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_verbatim() {
        assert_eq!(ReduceError::undefined_variable("i").to_string(), "Undefined variable $i");
        assert_eq!(
            ReduceError::redefinition("$foo").to_string(),
            "$foo has already been defined in this scope"
        );
        assert_eq!(
            ReduceError::not_exported("./theme", "$x").to_string(),
            "./theme does not export $x"
        );
    }

    #[test]
    fn test_report_includes_location() {
        let err = CompileError {
            error: ReduceError::undefined_mixin("button"),
            file: Some(PathBuf::from("/a.kiln")),
            location: Some(SourceLocation::new(2, 3)),
            excerpt: Some("@include button".into()),
        };
        assert_eq!(err.to_string(), "Undefined mixin button");
        assert_eq!(
            err.report(),
            "Undefined mixin button\n  at /a.kiln:2:3\n  > @include button"
        );
    }
}
