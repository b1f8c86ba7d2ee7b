use crate::env::{Environment, SearchPath};
use crate::error::ShellError;
use crate::parser::Instruction;
use nix::unistd::{AccessFlags, access};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// A program found on the search path, ready to be started.
///
/// Preparing it performs lookup and opens the redirection target, in that
/// order, so a missing program is reported before an unwritable file.
#[derive(Debug)]
pub struct ExternalCommand {
    path: PathBuf,
    argv: Vec<String>,
    stdout: Option<File>,
}

impl ExternalCommand {
    /// Resolve the program of `instruction` and open its output file, if any.
    pub fn prepare(instruction: &Instruction, env: &Environment) -> Result<Self, ShellError> {
        let program = instruction.program().unwrap_or_default();
        let path = find_command_path(program, &env.search_path).ok_or_else(|| {
            ShellError::Resolution {
                program: program.to_string(),
            }
        })?;

        let stdout = match instruction.output_target() {
            Some(target) => Some(open_output(&env.current_dir.join(target))?),
            None => None,
        };

        Ok(Self {
            path: env.current_dir.join(path),
            argv: instruction.argv().to_vec(),
            stdout,
        })
    }

    /// Absolute location of the executable that will be loaded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the program as a child process.
    ///
    /// The child sees the program name as typed in `argv[0]`. The output file
    /// handle moves into the child's stdout and is closed on our side once
    /// the child is started.
    pub fn spawn(self, env: &Environment) -> Result<Child, ShellError> {
        let mut cmd = Command::new(&self.path);
        if let Some((name, args)) = self.argv.split_first() {
            cmd.arg0(name).args(args);
        }
        cmd.current_dir(&env.current_dir);
        if let Some(file) = self.stdout {
            cmd.stdout(Stdio::from(file));
        }
        cmd.spawn().map_err(|source| spawn_error(self.path, source))
    }
}

/// Open `target` write-only, creating it or truncating what was there.
fn open_output(target: &Path) -> Result<File, ShellError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(target)
        .map_err(|source| ShellError::Io {
            target: target.to_path_buf(),
            source,
        })
}

/// Resource exhaustion means no process could be created at all; anything
/// else means the program itself could not be loaded.
fn spawn_error(path: PathBuf, source: io::Error) -> ShellError {
    match source.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory => ShellError::Fork(source),
        _ => ShellError::Exec { path, source },
    }
}

/// Find the first search directory holding an executable named `program`.
///
/// Each candidate is the directory text with a `/` appended when missing,
/// followed by `program` verbatim. Lookup is repeated on every call because
/// the search path can change between lines.
pub fn find_command_path(program: &str, search_path: &SearchPath) -> Option<PathBuf> {
    search_path
        .dirs()
        .iter()
        .map(|dir| candidate(dir, program))
        .find(|path| is_executable(path))
}

fn candidate(dir: &str, program: &str) -> PathBuf {
    let mut full = dir.to_string();
    if !full.ends_with('/') {
        full.push('/');
    }
    full.push_str(program);
    PathBuf::from(full)
}

fn is_executable(path: &Path) -> bool {
    access(path, AccessFlags::X_OK).is_ok()
}
