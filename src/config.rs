//! Fixed interpreter settings and command-line invocation parsing.

use crate::builtin::parse_positionals;
use crate::error::ShellError;
use argh::FromArgs;
use std::path::PathBuf;

/// The only message a user ever sees when something goes wrong.
pub const ERROR_MESSAGE: &str = "An error has occurred\n";

/// Prompt printed before every read in interactive mode.
pub const PROMPT: &str = "wish> ";

/// Initial content of the search path.
pub const DEFAULT_SEARCH_DIR: &str = "/bin/";

/// Sends an instruction's standard output to a file.
pub const REDIRECT_OPERATOR: char = '>';

/// Separates instructions that run side by side.
pub const CONCURRENT_OPERATOR: char = '&';

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV: &str = "WISH_LOG";

#[derive(FromArgs)]
/// Line-oriented command interpreter.
struct WishArgs {
    #[argh(positional)]
    /// file to read commands from, one per line; interactive when omitted.
    batch_file: Option<String>,
}

/// How the interpreter was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Prompt and read from standard input.
    Interactive,
    /// Read every line of the given file.
    Batch(PathBuf),
}

impl Invocation {
    /// Select the mode from the arguments that follow the program name.
    ///
    /// More than one argument is a usage error.
    pub fn from_args(args: &[&str]) -> Result<Self, ShellError> {
        let parsed: WishArgs = parse_positionals("wish", args)
            .map_err(|early| ShellError::Usage(early.output))?;
        Ok(match parsed.batch_file {
            Some(file) => Invocation::Batch(PathBuf::from(file)),
            None => Invocation::Interactive,
        })
    }
}
