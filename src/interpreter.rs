use crate::command::{CommandFactory, ExecutableCommand};
use crate::config::PROMPT;
use crate::env::Environment;
use crate::error::{ShellError, report_error};
use crate::executor::{ChildSet, ProcessExecutor, SystemExecutor};
use crate::line::{ParsedLine, split_line};
use crate::parser::Instruction;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, IsTerminal, Write};
use std::path::Path;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-ins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A line-oriented interpreter that runs built-ins in-process and everything
/// else through a [`ProcessExecutor`].
///
/// Faults are reported to the error sink as one fixed message and processing
/// continues. Only fatal faults are returned to the caller, already reported,
/// and mean the interpreter must stop with status 1.
///
/// Example
/// ```no_run
/// use wish::Interpreter;
/// let mut sh: Interpreter = Interpreter::default();
/// sh.execute_line("path /bin /usr/bin").unwrap();
/// sh.execute_line("ls > listing.txt & date").unwrap();
/// ```
pub struct Interpreter<E: ProcessExecutor = SystemExecutor> {
    env: Environment,
    builtins: Vec<Box<dyn CommandFactory>>,
    executor: E,
    stderr: Box<dyn Write>,
}

impl<E: ProcessExecutor> Interpreter<E> {
    /// Create an interpreter with a custom executor and set of built-ins.
    pub fn new(executor: E, builtins: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            builtins,
            executor,
            stderr: Box::new(std::io::stderr()),
        }
    }

    /// Send error reports somewhere other than standard error.
    pub fn with_error_sink(mut self, sink: impl Write + 'static) -> Self {
        self.stderr = Box::new(sink);
        self
    }

    /// Start from the given state instead of the process defaults.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Whether `exit` has been run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Parse and run one input line, waiting for every child it starts.
    pub fn execute_line(&mut self, line: &str) -> Result<(), ShellError> {
        if line.is_empty() {
            return Ok(());
        }

        match split_line(line) {
            Ok(ParsedLine::Single(instruction)) => self.execute_single(&instruction),
            Ok(ParsedLine::Concurrent(instructions)) => self.execute_concurrent(&instructions),
            Err(err) => {
                tracing::debug!(line, "line abandoned");
                self.report(&ShellError::from(err));
                Ok(())
            }
        }
    }

    /// Run every line of `input` until it is exhausted or `exit` is seen.
    pub fn run_script(&mut self, mut input: impl BufRead) -> Result<(), ShellError> {
        let mut buf = Vec::new();
        while !self.should_exit() {
            let Some(line) = next_line(&mut input, &mut buf) else {
                break;
            };
            self.execute_line(&line)?;
        }
        Ok(())
    }

    /// Like [`Interpreter::run_script`], but writes the prompt to `out`
    /// before every read, including the one that finds end of input.
    pub fn run_prompted(
        &mut self,
        mut input: impl BufRead,
        mut out: impl Write,
    ) -> Result<(), ShellError> {
        let mut buf = Vec::new();
        while !self.should_exit() {
            if let Err(err) = out.write_all(PROMPT.as_bytes()).and_then(|()| out.flush()) {
                tracing::warn!(error = %err, "cannot write prompt");
            }
            let Some(line) = next_line(&mut input, &mut buf) else {
                break;
            };
            self.execute_line(&line)?;
        }
        Ok(())
    }

    /// Batch mode: run the commands stored in the file at `path`.
    pub fn run_batch(&mut self, path: &Path) -> Result<(), ShellError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                let err = ShellError::Startup {
                    path: path.to_path_buf(),
                    source,
                };
                self.report(&err);
                return Err(err);
            }
        };
        tracing::debug!(path = %path.display(), "running batch file");
        self.run_script(BufReader::new(file))
    }

    /// Interactive mode: prompt, read a line, run it, repeat until EOF.
    ///
    /// A terminal gets line editing. Anything else is read as a plain stream.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            self.run_prompted(stdin.lock(), std::io::stdout())?;
            return Ok(());
        }

        let mut rl = DefaultEditor::new()?;
        while !self.should_exit() {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_line(&line)?;
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                // The terminal sent bytes that do not decode; drop that line only.
                Err(ReadlineError::Io(err)) if err.kind() == ErrorKind::InvalidData => {
                    self.report(&ShellError::Input(err));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    fn execute_single(&mut self, instruction: &Instruction) -> Result<(), ShellError> {
        let Some(name) = instruction.program() else {
            return Ok(());
        };

        if let Some(builtin) = self.find_builtin(name, instruction.args()) {
            if let Err(err) = builtin.execute(&mut self.env) {
                self.report(&err);
            }
            return Ok(());
        }

        let mut children = ChildSet::new();
        self.spawn_into(instruction, &mut children)?;
        self.executor.await_all(children);
        Ok(())
    }

    /// Built-ins are not consulted here; every instruction goes to the executor.
    fn execute_concurrent(&mut self, instructions: &[Instruction]) -> Result<(), ShellError> {
        let mut children = ChildSet::new();
        for instruction in instructions.iter().filter(|i| !i.is_empty()) {
            self.spawn_into(instruction, &mut children)?;
        }
        tracing::debug!(children = children.len(), "waiting for siblings");
        self.executor.await_all(children);
        Ok(())
    }

    fn spawn_into(
        &mut self,
        instruction: &Instruction,
        children: &mut ChildSet<E::Handle>,
    ) -> Result<(), ShellError> {
        match self.executor.spawn(instruction, &self.env) {
            Ok(handle) => children.push(handle),
            Err(err) if err.is_fatal() => {
                self.report(&err);
                return Err(err);
            }
            Err(err) => self.report(&err),
        }
        Ok(())
    }

    fn find_builtin(&self, name: &str, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.builtins
            .iter()
            .find_map(|factory| factory.try_create(name, &args))
    }

    fn report(&mut self, err: &ShellError) {
        report_error(&mut self.stderr, err);
    }
}

/// Read the next line as raw bytes, without its newline. Bytes that are not
/// UTF-8 become U+FFFD so the rest of the line still runs.
///
/// `None` at end of input or when the input can no longer be read.
fn next_line(input: &mut impl BufRead, buf: &mut Vec<u8>) -> Option<String> {
    buf.clear();
    match input.read_until(b'\n', buf) {
        Ok(0) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            Some(String::from_utf8_lossy(buf).into_owned())
        }
        Err(err) => {
            tracing::warn!(error = %err, "stopped reading input");
            None
        }
    }
}

/// The built-ins every interpreter starts with: `cd`, `exit` and `path`.
pub fn default_builtins() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::{Cd, Exit, SetPath};
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<SetPath>::default()),
    ]
}

impl Default for Interpreter<SystemExecutor> {
    /// Create an interpreter that spawns real processes and knows the
    /// default built-ins.
    fn default() -> Self {
        Self::new(SystemExecutor, default_builtins())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ERROR_MESSAGE;
    use crate::env::SearchPath;
    use crate::io_adapters::{MemReader, MemWriter};
    use crate::test_util::lock_current_dir;
    use std::cell::RefCell;
    use std::fs;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Records what would have been started instead of starting it.
    #[derive(Default)]
    struct RecordingExecutor {
        spawned: Vec<Vec<String>>,
        awaited: Vec<Vec<usize>>,
        unresolvable: Vec<&'static str>,
        fork_fails_on: Option<&'static str>,
    }

    impl ProcessExecutor for RecordingExecutor {
        type Handle = usize;

        fn spawn(&mut self, instruction: &Instruction, _env: &Environment) -> Result<usize, ShellError> {
            let program = instruction.program().unwrap_or_default();
            if self.fork_fails_on == Some(program) {
                return Err(ShellError::Fork(io::ErrorKind::WouldBlock.into()));
            }
            if self.unresolvable.iter().any(|name| *name == program) {
                return Err(ShellError::Resolution {
                    program: program.to_string(),
                });
            }
            self.spawned.push(instruction.argv().to_vec());
            Ok(self.spawned.len() - 1)
        }

        fn await_all(&mut self, children: ChildSet<usize>) {
            self.awaited.push(children.into_iter().collect());
        }
    }

    fn recording(executor: RecordingExecutor) -> (Interpreter<RecordingExecutor>, Rc<RefCell<Vec<u8>>>) {
        let (sink, errors) = MemWriter::with_handle();
        let sh = Interpreter::new(executor, default_builtins()).with_error_sink(sink);
        (sh, errors)
    }

    fn error_count(errors: &Rc<RefCell<Vec<u8>>>) -> usize {
        let text = String::from_utf8(errors.borrow().clone()).unwrap();
        assert_eq!(text.replace(ERROR_MESSAGE, ""), "", "only fixed messages expected");
        text.matches(ERROR_MESSAGE).count()
    }

    fn argv(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_instruction_spawns_and_waits_once() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.execute_line("ls -l").unwrap();

        assert_eq!(sh.executor().spawned, [argv(&["ls", "-l"])]);
        assert_eq!(sh.executor().awaited, [vec![0]]);
        assert_eq!(error_count(&errors), 0);
    }

    #[test]
    fn test_blank_lines_do_nothing() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        for line in ["", "   ", "\t"] {
            sh.execute_line(line).unwrap();
        }
        assert!(sh.executor().spawned.is_empty());
        assert!(sh.executor().awaited.is_empty());
        assert_eq!(error_count(&errors), 0);
    }

    #[test]
    fn test_path_builtin_runs_in_process() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.execute_line("path /usr/bin /tmp").unwrap();

        assert!(sh.executor().spawned.is_empty());
        assert_eq!(
            sh.env().search_path,
            SearchPath::new(argv(&["/usr/bin", "/tmp"]))
        );
        assert_eq!(error_count(&errors), 0);
    }

    #[test]
    fn test_concurrent_line_spawns_all_then_waits() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.execute_line("a & b x & c").unwrap();

        assert_eq!(
            sh.executor().spawned,
            [argv(&["a"]), argv(&["b", "x"]), argv(&["c"])]
        );
        assert_eq!(sh.executor().awaited, [vec![0, 1, 2]]);
        assert_eq!(error_count(&errors), 0);
    }

    #[test]
    fn test_concurrent_line_skips_empty_instructions() {
        let (mut sh, _errors) = recording(RecordingExecutor::default());
        sh.execute_line("ls & & pwd &").unwrap();
        assert_eq!(sh.executor().spawned, [argv(&["ls"]), argv(&["pwd"])]);
    }

    #[test]
    fn test_builtins_are_external_on_concurrent_lines() {
        let (mut sh, _errors) = recording(RecordingExecutor::default());
        sh.execute_line("path /nowhere & ls").unwrap();

        assert_eq!(sh.executor().spawned, [argv(&["path", "/nowhere"]), argv(&["ls"])]);
        assert_eq!(sh.env().search_path, SearchPath::default());
    }

    #[test]
    fn test_parse_error_abandons_whole_line() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.execute_line("ls & echo a>x>y & pwd").unwrap();

        assert!(sh.executor().spawned.is_empty());
        assert!(sh.executor().awaited.is_empty());
        assert_eq!(error_count(&errors), 1);
    }

    #[test]
    fn test_failed_sibling_does_not_stop_others() {
        let (mut sh, errors) = recording(RecordingExecutor {
            unresolvable: vec!["cd"],
            ..Default::default()
        });
        sh.execute_line("ls & cd /tmp & pwd").unwrap();

        assert_eq!(sh.executor().spawned, [argv(&["ls"]), argv(&["pwd"])]);
        assert_eq!(sh.executor().awaited, [vec![0, 1]]);
        assert_eq!(error_count(&errors), 1);
    }

    #[test]
    fn test_fork_failure_is_fatal() {
        let (mut sh, errors) = recording(RecordingExecutor {
            fork_fails_on: Some("b"),
            ..Default::default()
        });
        let err = sh.execute_line("a & b & c").unwrap_err();

        assert!(matches!(err, ShellError::Fork(_)));
        assert_eq!(sh.executor().spawned, [argv(&["a"])]);
        assert_eq!(error_count(&errors), 1);
    }

    #[test]
    fn test_cd_misuse_is_reported_and_interpreter_continues() {
        let _lock = lock_current_dir();
        let (mut sh, errors) = recording(RecordingExecutor::default());
        let before = sh.env().current_dir.clone();

        sh.execute_line("cd").unwrap();
        sh.execute_line("cd a b").unwrap();
        sh.execute_line("ls").unwrap();

        assert_eq!(sh.env().current_dir, before);
        assert_eq!(sh.executor().spawned, [argv(&["ls"])]);
        assert_eq!(error_count(&errors), 2);
    }

    #[test]
    fn test_exit_stops_the_script() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.run_script(MemReader::new("ls\nexit\npwd\n")).unwrap();

        assert!(sh.should_exit());
        assert_eq!(sh.executor().spawned, [argv(&["ls"])]);
        assert_eq!(error_count(&errors), 0);
    }

    #[test]
    fn test_exit_with_argument_reports_and_still_stops() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.run_script(MemReader::new("exit now\nls\n")).unwrap();

        assert!(sh.should_exit());
        assert!(sh.executor().spawned.is_empty());
        assert_eq!(error_count(&errors), 1);
    }

    #[test]
    fn test_script_continues_after_parse_error() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.run_script(MemReader::new(">oops\nls\n")).unwrap();

        assert_eq!(sh.executor().spawned, [argv(&["ls"])]);
        assert_eq!(error_count(&errors), 1);
    }

    #[test]
    fn test_undecodable_line_still_runs() {
        let (mut sh, errors) = recording(RecordingExecutor::default());
        sh.run_script(MemReader::new(&b"echo one\necho \xff\xfe\necho three\n"[..]))
            .unwrap();

        assert_eq!(
            sh.executor().spawned,
            [
                argv(&["echo", "one"]),
                argv(&["echo", "\u{FFFD}\u{FFFD}"]),
                argv(&["echo", "three"]),
            ]
        );
        assert_eq!(error_count(&errors), 0);
    }

    #[test]
    fn test_last_line_needs_no_newline() {
        let (mut sh, _errors) = recording(RecordingExecutor::default());
        sh.run_script(MemReader::new("ls\npwd")).unwrap();

        assert_eq!(sh.executor().spawned, [argv(&["ls"]), argv(&["pwd"])]);
    }

    #[test]
    fn test_prompt_before_every_read() {
        let (mut sh, _errors) = recording(RecordingExecutor::default());
        let mut out = Vec::new();
        sh.run_prompted(MemReader::new("ls\n\npwd\n"), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), PROMPT.repeat(4));
        assert_eq!(sh.executor().spawned, [argv(&["ls"]), argv(&["pwd"])]);
    }

    #[test]
    fn test_no_prompt_after_exit() {
        let (mut sh, _errors) = recording(RecordingExecutor::default());
        let mut out = Vec::new();
        sh.run_prompted(MemReader::new("exit\nls\n"), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), PROMPT);
        assert!(sh.executor().spawned.is_empty());
    }

    #[test]
    fn test_missing_batch_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let (mut sh, errors) = recording(RecordingExecutor::default());
        let err = sh.run_batch(&tmp.path().join("absent.txt")).unwrap_err();

        assert!(matches!(err, ShellError::Startup { .. }));
        assert!(err.is_fatal());
        assert_eq!(error_count(&errors), 1);
    }

    fn system_interpreter(cwd: &Path) -> (Interpreter, Rc<RefCell<Vec<u8>>>) {
        let (sink, errors) = MemWriter::with_handle();
        let env = Environment {
            search_path: SearchPath::default(),
            current_dir: cwd.to_path_buf(),
            should_exit: false,
        };
        let sh: Interpreter = Interpreter::default()
            .with_environment(env)
            .with_error_sink(sink);
        (sh, errors)
    }

    #[test]
    fn test_batch_file_resolves_against_new_path() {
        let tmp = TempDir::new().unwrap();
        let batch = tmp.path().join("batch.txt");
        fs::write(&batch, "path /bin\nls > listing.txt\n").unwrap();
        fs::write(tmp.path().join("marker"), "").unwrap();

        let (mut sh, errors) = system_interpreter(tmp.path());
        sh.run_batch(&batch).unwrap();

        assert_eq!(error_count(&errors), 0);
        let listing = fs::read_to_string(tmp.path().join("listing.txt")).unwrap();
        assert!(listing.lines().any(|l| l == "marker"), "{listing}");
    }

    #[test]
    fn test_empty_path_disables_lookup() {
        let tmp = TempDir::new().unwrap();
        let (mut sh, errors) = system_interpreter(tmp.path());

        sh.execute_line("path").unwrap();
        sh.execute_line("echo hi > out.txt").unwrap();

        assert_eq!(error_count(&errors), 1);
        assert!(!tmp.path().join("out.txt").exists());
    }

    #[test]
    fn test_redirected_and_plain_siblings() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.txt");
        fs::write(&out, "previous contents, much longer than the new ones\n").unwrap();

        let (mut sh, errors) = system_interpreter(tmp.path());
        sh.execute_line("echo first > out.txt & echo second >other.txt").unwrap();

        assert_eq!(error_count(&errors), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "first\n");
        assert_eq!(
            fs::read_to_string(tmp.path().join("other.txt")).unwrap(),
            "second\n"
        );
    }

    #[test]
    fn test_unloadable_program_spares_its_siblings() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        let garbage = bin.join("garbage");
        fs::write(&garbage, [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03]).unwrap();
        fs::set_permissions(&garbage, fs::Permissions::from_mode(0o755)).unwrap();

        let (mut sh, errors) = system_interpreter(tmp.path());
        sh.execute_line(&format!("path {} /bin", bin.display())).unwrap();
        sh.execute_line("garbage & echo sib > sib.txt").unwrap();
        sh.execute_line("echo after > after.txt").unwrap();

        assert!(!sh.should_exit());
        assert_eq!(error_count(&errors), 1);
        assert_eq!(fs::read_to_string(tmp.path().join("sib.txt")).unwrap(), "sib\n");
        assert_eq!(fs::read_to_string(tmp.path().join("after.txt")).unwrap(), "after\n");
    }
}
