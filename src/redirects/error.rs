//! Error types for rule compilation and request resolution.

use thiserror::Error;

/// A rule file failed to compile.
///
/// Carries the 1-based line number of the first offending line; compilation
/// stops there and no engine is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} on line {line}")]
pub struct CompileError {
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub(crate) fn new(line: usize, kind: CompileErrorKind) -> Self {
        Self { line, kind }
    }
}

/// The specific violation behind a [`CompileError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    /// Path rules need exactly `<from> <to> <status>`.
    #[error("invalid redirect rule {0:?}: expected \"<from> <to> <status>\"")]
    TokenCount(String),

    /// `regexp` line did not follow `regexp "<pattern>" "<replacement>" <status>`.
    #[error("invalid regex rule format {0:?}")]
    RegexFormat(String),

    #[error("unsupported redirection status {0:?}: expected \"permanent\" or \"temporary\"")]
    Status(String),

    #[error("invalid regex pattern: {0}")]
    Regex(String),

    /// Replacement references a group the pattern does not define.
    #[error("undefined placeholder \"${0}\" in replacement")]
    UndefinedPlaceholder(String),

    #[error("invalid use of {0:?}: it can only be used at the end of a path")]
    NonFinalSplat(String),

    #[error("invalid use of \":\" in segment {0:?}: \":\" can only be used at the beginning of a path section")]
    MidSegmentColon(String),

    #[error("empty placeholder name in {0:?}")]
    EmptyPlaceholder(String),
}

/// A request URI could not be resolved.
///
/// This is never returned for an ordinary miss; see
/// [`Resolution::NoMatch`](super::Resolution::NoMatch).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid request URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid percent-encoding in request path {0:?}")]
    InvalidEscape(String),
}
