//! Codegen error type.

use std::fmt;

use crate::source::Span;

/// A semantic error raised while lowering the AST to IR: type mismatch,
/// unknown operator, assignment to a read-only binding, redefinition, a
/// missing type-inference initializer, wrong initializer-list arity, a
/// non-integer condition, or a failure propagated from a sub-expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    Logic { message: String, span: Span },
    Format(String),
}

impl CodegenError {
    pub fn logic(message: impl Into<String>, span: Span) -> Self {
        CodegenError::Logic { message: message.into(), span }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::Logic { span, .. } => Some(*span),
            CodegenError::Format(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CodegenError::Logic { message, .. } => message,
            CodegenError::Format(message) => message,
        }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CodegenError {}

impl From<fmt::Error> for CodegenError {
    fn from(e: fmt::Error) -> Self {
        CodegenError::Format(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logic_error_carries_span() {
        let err = CodegenError::logic("redefinition of 'x'", Span::new(1, 2));
        assert_eq!(err.span(), Some(Span::new(1, 2)));
        assert_eq!(err.message(), "redefinition of 'x'");
    }

    #[test]
    fn format_error_has_no_span() {
        let err: CodegenError = fmt::Error.into();
        assert_eq!(err.span(), None);
    }
}
