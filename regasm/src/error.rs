//! Error types for the assembler

use thiserror::Error;

/// What went wrong on a line, without the line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Malformed escape sequence, literal or bracket expression.
    #[error("lexical error: {0}")]
    Lexical(String),
    /// Recognized, but intentionally not encodable.
    #[error("unsupported pattern: {0}")]
    UnsupportedPattern(String),
    #[error("macro expansion error: {0}")]
    MacroExpansion(String),
    #[error("label '{0}' defined twice")]
    DuplicateLabel(String),
    #[error("unknown label or value '{0}'")]
    UnresolvedSymbol(String),
    #[error("wrong number of operands: {0}")]
    Arity(String),
    #[error("value out of range: {0}")]
    Range(String),
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),
}

#[derive(Debug, Error)]
pub enum AsmError {
    #[error("line {line}: {kind}")]
    Asm { line: usize, kind: ErrorKind },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AsmError {
    pub fn at(line: usize, kind: ErrorKind) -> Self {
        AsmError::Asm { line, kind }
    }

    /// Source line the error originates from, if it is an assembly error.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Asm { line, .. } => Some(*line),
            AsmError::Io(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            AsmError::Asm { kind, .. } => Some(kind),
            AsmError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_line() {
        let err = AsmError::at(7, ErrorKind::DuplicateLabel("loop".to_string()));
        assert_eq!(err.to_string(), "line 7: label 'loop' defined twice");
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_io_has_no_line() {
        let err: AsmError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.line(), None);
        assert!(err.kind().is_none());
    }
}
