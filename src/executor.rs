//! Starting and collecting child processes.
//!
//! The interpreter only talks to [`ProcessExecutor`], so the orchestration
//! in [`crate::Interpreter`] never touches process primitives directly.

use crate::env::Environment;
use crate::error::ShellError;
use crate::external::ExternalCommand;
use crate::parser::Instruction;
use std::process::Child;

/// Handles of the children started for one line, in spawn order.
#[derive(Debug)]
pub struct ChildSet<H> {
    handles: Vec<H>,
}

impl<H> ChildSet<H> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn push(&mut self, handle: H) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<H> Default for ChildSet<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> IntoIterator for ChildSet<H> {
    type Item = H;
    type IntoIter = std::vec::IntoIter<H>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.into_iter()
    }
}

/// Capability to run an instruction outside the interpreter process.
pub trait ProcessExecutor {
    /// Whatever identifies a running child.
    type Handle;

    /// Start `instruction` with a snapshot of `env`.
    ///
    /// Errors other than [`ShellError::Fork`] concern this instruction only.
    fn spawn(
        &mut self,
        instruction: &Instruction,
        env: &Environment,
    ) -> Result<Self::Handle, ShellError>;

    /// Block until every child in `children` has terminated.
    ///
    /// Children are waited on in spawn order; no timeout is applied.
    fn await_all(&mut self, children: ChildSet<Self::Handle>);
}

/// Runs instructions as real operating-system processes.
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    type Handle = Child;

    fn spawn(&mut self, instruction: &Instruction, env: &Environment) -> Result<Child, ShellError> {
        let cmd = ExternalCommand::prepare(instruction, env)?;
        tracing::debug!(path = %cmd.path().display(), argv = ?instruction.argv(), "spawning");
        let child = cmd.spawn(env)?;
        tracing::debug!(pid = child.id(), "spawned");
        Ok(child)
    }

    fn await_all(&mut self, children: ChildSet<Child>) {
        for mut child in children {
            let pid = child.id();
            match child.wait() {
                Ok(status) => tracing::debug!(pid, %status, "child finished"),
                Err(err) => tracing::warn!(pid, error = %err, "failed to wait for child"),
            }
        }
    }
}
