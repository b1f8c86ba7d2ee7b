use crate::env::Environment;
use crate::error::ShellError;

/// Object-safe trait for anything that runs inside the interpreter process.
///
/// Implemented for every built-in via a blanket impl.
pub trait ExecutableCommand {
    /// Runs the command against the interpreter's own state.
    fn execute(self: Box<Self>, env: &mut Environment) -> Result<(), ShellError>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`, which hands
/// the instruction over to external execution.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
