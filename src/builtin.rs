use crate::command::{CommandFactory, ExecutableCommand};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. They only run when they are the
/// sole instruction on a line.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "path".
    fn name() -> &'static str;

    /// Executes the command against the interpreter state.
    fn execute(self, env: &mut Environment) -> Result<(), ShellError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, env: &mut Environment) -> Result<(), ShellError> {
        tracing::debug!(builtin = T::name(), "running builtin");
        T::execute(*self, env)
    }
}

/// Stand-in for a builtin whose arguments did not fit its signature.
struct InvalidArgs {
    output: String,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, _env: &mut Environment) -> Result<(), ShellError> {
        Err(ShellError::Usage(self.output))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match parse_positionals::<T>(name, args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, .. }) => Box::new(InvalidArgs { output }),
            })
        } else {
            None
        }
    }
}

/// Parse `args` with every word treated as a positional argument.
///
/// A leading `--` keeps words such as `--help` or `-x` from being read as
/// options.
pub(crate) fn parse_positionals<T: FromArgs>(name: &str, args: &[&str]) -> Result<T, EarlyExit> {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push("--");
    all.extend_from_slice(args);
    T::from_args(&[name], &all)
}

#[derive(FromArgs)]
/// Change the working directory of the interpreter.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, env: &mut Environment) -> Result<(), ShellError> {
        let new_dir = env.current_dir.join(&self.target);
        let change_dir_error = |source| ShellError::ChangeDir {
            path: new_dir.clone(),
            source,
        };

        let canonical = fs::canonicalize(&new_dir).map_err(change_dir_error)?;
        env::set_current_dir(&canonical).map_err(change_dir_error)?;
        env.current_dir = canonical;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Leave the interpreter.
pub struct Exit {
    #[argh(positional)]
    /// not accepted; any value is reported as misuse.
    pub args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    /// Always requests termination, even when misused.
    fn execute(self, env: &mut Environment) -> Result<(), ShellError> {
        env.should_exit = true;
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(ShellError::Usage(format!(
                "exit takes no arguments, got {}",
                self.args.len()
            )))
        }
    }
}

#[derive(FromArgs)]
/// Replace the program search path.
pub struct SetPath {
    #[argh(positional)]
    /// directories to search, in order; none disables lookup entirely.
    pub dirs: Vec<String>,
}

impl BuiltinCommand for SetPath {
    fn name() -> &'static str {
        "path"
    }

    fn execute(self, env: &mut Environment) -> Result<(), ShellError> {
        env.search_path.replace(self.dirs);
        tracing::debug!(search_path = ?env.search_path.dirs(), "search path replaced");
        Ok(())
    }
}
