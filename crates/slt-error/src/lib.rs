use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for sqllogictest parsing and execution.
///
/// Parse variants are fatal to the script they occur in and always carry
/// the 1-based source line. Per-record execution problems are not errors:
/// the runner reports them as record outcomes instead.
#[derive(Error, Debug)]
pub enum SltError {
    // === I/O Errors ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A script path given to the runner does not exist.
    #[error("test path not found: '{path}'")]
    PathNotFound { path: PathBuf },

    // === Parse Errors ===
    /// Leading token of a line is not a known directive.
    #[error("unhandled directive '{token}' on line {line}")]
    UnknownDirective { token: String, line: usize },

    /// A directive argument is not one of the accepted tokens.
    #[error("unexpected token '{token}' for {directive} on line {line}")]
    UnexpectedToken {
        directive: String,
        token: String,
        line: usize,
    },

    /// A directive is missing a required argument.
    #[error("{directive} requires an argument on line {line}")]
    MissingArgument { directive: String, line: usize },

    /// `hash-threshold` argument is not a non-negative integer.
    #[error("invalid hash threshold '{value}' on line {line}")]
    InvalidHashThreshold { value: String, line: usize },

    /// Sort mode token is not `nosort`, `rowsort` or `valuesort`.
    #[error("unknown sort mode '{mode}' on line {line}")]
    UnknownSortMode { mode: String, line: usize },

    /// A statement or query directive was not followed by any SQL text.
    #[error("{directive} on line {line} has an empty body")]
    EmptyBody { directive: String, line: usize },

    // === Execution Errors ===
    /// The backend refused to initialize for a script.
    #[error("backend '{engine}' failed to initialize: {detail}")]
    BackendInit { engine: String, detail: String },

    /// Observed results cannot be reshaped for the declared schema.
    #[error("malformed result set: {detail}")]
    MalformedResult { detail: String },

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SltError {
    /// Source line a parse error points at, if any.
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::UnknownDirective { line, .. }
            | Self::UnexpectedToken { line, .. }
            | Self::MissingArgument { line, .. }
            | Self::InvalidHashThreshold { line, .. }
            | Self::UnknownSortMode { line, .. }
            | Self::EmptyBody { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Whether this error comes from malformed script text.
    pub const fn is_parse_error(&self) -> bool {
        self.line().is_some()
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) | Self::PathNotFound { .. } => 2,
            Self::BackendInit { .. } => 3,
            Self::MalformedResult { .. } | Self::Internal(_) => 4,
            _ => 1,
        }
    }

    /// Create an unknown-directive error.
    pub fn unknown_directive(token: impl Into<String>, line: usize) -> Self {
        Self::UnknownDirective {
            token: token.into(),
            line,
        }
    }

    /// Create a missing-argument error.
    pub fn missing_argument(directive: impl Into<String>, line: usize) -> Self {
        Self::MissingArgument {
            directive: directive.into(),
            line,
        }
    }

    /// Create an empty-body error.
    pub fn empty_body(directive: impl Into<String>, line: usize) -> Self {
        Self::EmptyBody {
            directive: directive.into(),
            line,
        }
    }

    /// Create a malformed-result error.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResult {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `SltError`.
pub type Result<T> = std::result::Result<T, SltError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SltError::unknown_directive("selekt", 12);
        assert_eq!(err.to_string(), "unhandled directive 'selekt' on line 12");
    }

    #[test]
    fn error_display_unexpected_token() {
        let err = SltError::UnexpectedToken {
            directive: "statement".to_owned(),
            token: "maybe".to_owned(),
            line: 3,
        };
        assert_eq!(
            err.to_string(),
            "unexpected token 'maybe' for statement on line 3"
        );
    }

    #[test]
    fn parse_errors_carry_lines() {
        assert_eq!(SltError::missing_argument("skipif", 7).line(), Some(7));
        assert_eq!(SltError::empty_body("query", 9).line(), Some(9));
        assert!(SltError::empty_body("query", 9).is_parse_error());
        assert!(!SltError::malformed("zero columns").is_parse_error());
        assert_eq!(SltError::internal("x").line(), None);
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: SltError = io_err.into();
        assert!(matches!(err, SltError::Io(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn exit_code() {
        assert_eq!(SltError::unknown_directive("x", 1).exit_code(), 1);
        assert_eq!(
            SltError::BackendInit {
                engine: "mem".to_owned(),
                detail: "no".to_owned(),
            }
            .exit_code(),
            3
        );
        assert_eq!(SltError::internal("x").exit_code(), 4);
    }

    #[test]
    fn convenience_constructors() {
        let err = SltError::malformed("3 values for 2 columns");
        assert!(
            matches!(err, SltError::MalformedResult { detail } if detail == "3 values for 2 columns")
        );

        let err = SltError::missing_argument("onlyif", 4);
        assert!(matches!(
            err,
            SltError::MissingArgument { directive, line: 4 } if directive == "onlyif"
        ));
    }
}
