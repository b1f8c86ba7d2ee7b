//! A small line-oriented command interpreter.
//!
//! Each input line holds one or more instructions separated by `&`. An
//! instruction names a program, its arguments and optionally a single `>`
//! redirection of standard output. Programs are looked up on a search path
//! that the `path` built-in replaces at runtime; `cd` and `exit` are the
//! other built-ins. Sibling instructions run as concurrent child processes
//! and the interpreter waits for all of them before reading the next line.
//!
//! The main entry point is [`Interpreter`]. Parsing is available on its own
//! through [`parse_instruction`] and [`split_line`].

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
mod external;
mod interpreter;
pub mod io_adapters;
mod line;
mod parser;
#[cfg(test)]
mod test_util;

pub use error::{ParsingError, ShellError};
pub use external::find_command_path;
pub use interpreter::{Interpreter, default_builtins};
pub use line::{ParsedLine, split_line};
pub use parser::{Instruction, parse_instruction};
