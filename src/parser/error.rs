use std::fmt;

use super::lexer::LexErrorKind;
use super::span::Span;
use crate::diagnostics::ErrorCode;

/// Syntax or lexical problem found while parsing one unit
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unexpected token encountered
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    /// Unexpected end of input
    UnexpectedEndOfInput {
        expected: String,
        span: Span,
    },

    /// Lexical error surfaced by the token stream
    LexicalError {
        code: ErrorCode,
        span: Span,
    },

    /// Any other syntax error
    InvalidSyntax {
        code: ErrorCode,
        span: Span,
    },
}

impl ParseError {
    /// Create a new unexpected token error
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    /// Create a new unexpected end of input error
    pub fn unexpected_end_of_input(expected: &str, span: Span) -> Self {
        ParseError::UnexpectedEndOfInput {
            expected: expected.to_string(),
            span,
        }
    }

    pub fn lexical(kind: LexErrorKind, lexeme: &str, span: Span) -> Self {
        let code = match kind {
            LexErrorKind::IllegalCharacter => ErrorCode::IllegalCharacter(lexeme.chars().next().unwrap_or('?')),
            LexErrorKind::UnterminatedString => ErrorCode::UnterminatedString,
            LexErrorKind::UnterminatedComment => ErrorCode::UnterminatedComment,
        };
        ParseError::LexicalError { code, span }
    }

    pub fn invalid(code: ErrorCode, span: Span) -> Self {
        ParseError::InvalidSyntax { code, span }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEndOfInput { span, .. }
            | ParseError::LexicalError { span, .. }
            | ParseError::InvalidSyntax { span, .. } => *span,
        }
    }

    /// Diagnostic code reported for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::UnexpectedToken { expected, found, .. } => ErrorCode::UnexpectedToken {
                expected: expected.clone(),
                found: found.clone(),
            },
            ParseError::UnexpectedEndOfInput { expected, .. } => ErrorCode::UnexpectedEof(expected.clone()),
            ParseError::LexicalError { code, .. } | ParseError::InvalidSyntax { code, .. } => code.clone(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.code(), self.span())
    }
}

impl std::error::Error for ParseError {}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors collected during one parse, bounded by the error budget
#[derive(Debug)]
pub struct ErrorRecovery {
    /// Maximum number of errors to collect; later ones are counted but dropped
    pub max_errors: usize,
    /// Collected errors
    pub errors: Vec<ParseError>,
    dropped: usize,
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new(crate::consts::DEFAULT_MAX_ERRORS)
    }
}

impl ErrorRecovery {
    pub fn new(max_errors: usize) -> Self {
        Self { max_errors, errors: Vec::new(), dropped: 0 }
    }

    /// Add an error; returns false once the budget is exhausted
    pub fn add_error(&mut self, error: ParseError) -> bool {
        if self.errors.len() >= self.max_errors {
            self.dropped += 1;
            return false;
        }
        log::trace!("syntax error: {}", error);
        self.errors.push(error);
        true
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Get all collected errors
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }
}
