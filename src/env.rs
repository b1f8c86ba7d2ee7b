use crate::config::DEFAULT_SEARCH_DIR;
use std::env as stdenv;
use std::path::PathBuf;

/// Ordered list of directories consulted when resolving a program name.
///
/// The list is only ever replaced as a whole; there is no append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<String>,
}

impl SearchPath {
    pub fn new(dirs: Vec<String>) -> Self {
        Self { dirs }
    }

    /// Directories in lookup order.
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// Discard the current directories and use `dirs` instead.
    pub fn replace(&mut self, dirs: Vec<String>) {
        self.dirs = dirs;
    }

    /// An empty path makes every lookup fail.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new(vec![DEFAULT_SEARCH_DIR.to_string()])
    }
}

/// State owned by the interpreter loop and threaded through every line.
///
/// - `search_path`: where external programs are looked up.
/// - `current_dir`: the working directory handed to spawned children.
/// - `should_exit`: set by `exit`; the read loop stops once it is true.
#[derive(Debug, Clone)]
pub struct Environment {
    pub search_path: SearchPath,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Start from the default search path and the process working directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            search_path: SearchPath::default(),
            current_dir,
            should_exit: false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
