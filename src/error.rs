use crate::config::ERROR_MESSAGE;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Faults detected while tokenizing a single instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    /// A second redirection operator in the same instruction.
    #[error("duplicate redirection")]
    DuplicateRedirect,
    /// The instruction has no program before the operator, e.g. `> out`.
    #[error("instruction cannot start with redirection")]
    StartsWithRedirect,
    /// The operator is the last thing on the instruction.
    #[error("missing redirect target")]
    MissingRedirectTarget,
    /// The word following a detached operator is another operator.
    #[error("chained redirection")]
    ChainedRedirect,
    /// More than one word follows a detached operator.
    #[error("multiple redirect targets")]
    MultipleRedirectTargets,
    /// A plain word follows an attached target, e.g. `ls >out extra`.
    #[error("token after redirect target")]
    TokenAfterRedirectTarget,
    /// The target itself still carries an operator, e.g. `a>x>y`.
    #[error("malformed redirect target `{0}`")]
    MalformedTarget(String),
}

/// Everything that can go wrong while interpreting a line.
///
/// The detail is for logs only; users always see [`ERROR_MESSAGE`].
#[derive(Debug, Error)]
pub enum ShellError {
    /// Wrong number of arguments to the interpreter or to a built-in.
    #[error("usage: {0}")]
    Usage(String),
    #[error("parse error: {0}")]
    Parse(#[from] ParsingError),
    /// No search directory holds an executable with this name.
    #[error("{program}: not found on search path")]
    Resolution { program: String },
    /// The redirection target could not be opened for writing.
    #[error("cannot open {}: {source}", .target.display())]
    Io {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The resolved program could not be loaded.
    #[error("cannot execute {}: {source}", .path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `cd` could not enter the requested directory.
    #[error("cd: cannot enter {}: {source}", .path.display())]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An interactive line arrived that could not be decoded.
    #[error("unreadable input line: {0}")]
    Input(#[source] std::io::Error),
    /// The system refused to create another process.
    #[error("cannot spawn process: {0}")]
    Fork(#[source] std::io::Error),
    /// The batch file could not be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    Startup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ShellError {
    /// Whether the interpreter itself must stop with status 1.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Fork(_) | ShellError::Startup { .. })
    }
}

/// Log `err` in detail and write the fixed message to `sink`.
pub fn report_error(sink: &mut dyn Write, err: &ShellError) {
    tracing::debug!(error = %err, fatal = err.is_fatal(), "reporting error");
    // Nothing sensible is left to do if stderr itself is gone.
    let _ = sink.write_all(ERROR_MESSAGE.as_bytes());
    let _ = sink.flush();
}
