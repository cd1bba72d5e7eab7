//! Typed error hierarchy for git-review.
//!
//! The enums split along the failure taxonomy the shell relies on:
//! - `TokenizeError`: malformed input lines (unterminated quote or escape)
//! - `CliError` / `ArgumentError`: user input errors at the dispatch layer
//! - `GitError`: failures reported by the repository collaborator
//! - `ReviewError`: review session conditions
//! - `SpawnError`: an external viewer or diff program could not be started
//!
//! Only `ArgumentError` is treated as an "expected" failure by the dispatcher;
//! every other error that escapes a command handler is reported in full.

use thiserror::Error;

/// Why a token could not be completed before the end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialTokenKind {
    UnterminatedQuote,
    UnterminatedEscape,
}

impl std::fmt::Display for PartialTokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartialTokenKind::UnterminatedQuote => write!(f, "unterminated quote"),
            PartialTokenKind::UnterminatedEscape => write!(f, "unterminated escape sequence"),
        }
    }
}

/// Errors from the line tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// End of input was reached inside a quote or escape sequence.
    /// `token` holds the text accumulated so far, if any.
    #[error("{kind}")]
    PartialToken {
        token: Option<String>,
        kind: PartialTokenKind,
    },
}

impl TokenizeError {
    pub fn kind(&self) -> PartialTokenKind {
        match self {
            TokenizeError::PartialToken { kind, .. } => *kind,
        }
    }
}

/// Errors from command lookup and registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("no such command '{0}'")]
    NoSuchCommand(String),

    #[error("ambiguous command '{name}': possible matches: {}", matches.join(", "))]
    AmbiguousCommand { name: String, matches: Vec<String> },

    #[error("command '{0}' already exists")]
    DuplicateCommand(String),
}

/// A user-caused problem with command arguments.
///
/// The dispatcher prints these as a single `error:` line and never shows
/// any further diagnostic detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ArgumentError(pub String);

impl ArgumentError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors reported by the repository collaborator.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {0}")]
    NotARepo(String),

    #[error("{0} does not have a working directory")]
    NoWorkingDir(String),

    #[error("no such commit '{0}'")]
    NoSuchCommit(String),

    #[error("no such blob '{0}'")]
    NoSuchBlob(String),

    #[error("'{0}' does not refer to a blob")]
    NotABlob(String),

    #[error("bad revision name '{name}': {msg}")]
    BadRevisionName { name: String, msg: String },

    #[error("ambiguous argument '{name}': {reason}")]
    AmbiguousArgument { name: String, reason: String },

    #[error("invalid similarity index {0}")]
    InvalidSimilarity(u32),

    #[error("diff list already contains an entry for {0}")]
    DuplicateEntry(String),

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Replace the object name carried by blob errors.
    ///
    /// Used to report the name the user typed (`parent:foo.c`) instead of
    /// the expanded commit id.
    pub fn with_name(self, name: String) -> Self {
        match self {
            GitError::NoSuchBlob(_) => GitError::NoSuchBlob(name),
            GitError::NotABlob(_) => GitError::NotABlob(name),
            other => other,
        }
    }
}

/// Review session conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("no current file")]
    NoCurrentEntry,

    #[error("no more files")]
    NoMoreEntries,

    #[error("invalid index {0}")]
    InvalidIndex(usize),

    #[error("unknown alias '{0}'")]
    UnknownAlias(String),
}

/// An external program could not be started.
#[derive(Debug, Error)]
#[error("failed to invoke '{program}': {source}")]
pub struct SpawnError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_token_error_messages() {
        let quote = TokenizeError::PartialToken {
            token: Some("b".into()),
            kind: PartialTokenKind::UnterminatedQuote,
        };
        assert_eq!(quote.to_string(), "unterminated quote");
        assert_eq!(quote.kind(), PartialTokenKind::UnterminatedQuote);

        let escape = TokenizeError::PartialToken {
            token: None,
            kind: PartialTokenKind::UnterminatedEscape,
        };
        assert_eq!(escape.to_string(), "unterminated escape sequence");
    }

    #[test]
    fn ambiguous_command_lists_candidates() {
        let err = CliError::AmbiguousCommand {
            name: "nex".into(),
            matches: vec!["next".into(), "nextfoo".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'nex'"));
        assert!(msg.contains("next, nextfoo"));
    }

    #[test]
    fn with_name_only_rewrites_blob_errors() {
        let err = GitError::NoSuchBlob("abc123:foo.c".into()).with_name("parent:foo.c".into());
        assert_eq!(err.to_string(), "no such blob 'parent:foo.c'");

        let err = GitError::NotABlob("abc123:dir".into()).with_name("child:dir".into());
        assert!(matches!(err, GitError::NotABlob(ref n) if n == "child:dir"));

        let err = GitError::NoSuchCommit("HEAD~9".into()).with_name("x".into());
        assert!(matches!(err, GitError::NoSuchCommit(ref n) if n == "HEAD~9"));
    }

    #[test]
    fn spawn_error_names_program() {
        let err = SpawnError {
            program: "vimdiff".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().starts_with("failed to invoke 'vimdiff'"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&CliError::NoSuchCommand("x".into()));
        assert_std_error(&ArgumentError::new("x"));
        assert_std_error(&GitError::NoSuchCommit("x".into()));
        assert_std_error(&ReviewError::NoCurrentEntry);
    }
}
