//! Process runner.
//!
//! This module contains the code to locate and execute external commands.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{instrument, trace};

/// The error type for running external commands.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ProcessError {
    /// The program could not be found on the search path.
    #[error("'{0}' not found")]
    NotFound(String),
    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The program terminated with a non-zero exit code.
    #[error("'{program}' exited with {}", exit_code_str(.code))]
    Exit { program: String, code: Option<i32>, output: String },
}

impl ProcessError {
    /// Returns the output captured before the program failed, if there is any.
    pub(crate) fn output(&self) -> Option<&str> {
        match self {
            Self::Exit { output, .. } if !output.trim().is_empty() => Some(output),
            _ => None,
        }
    }
}

#[doc(hidden)]
fn exit_code_str(code: &Option<i32>) -> String {
    code.map_or_else(|| "no exit code".to_string(), |code| format!("exit code {code}"))
}

/// Description of an external command.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    search_path: Option<OsString>,
}

impl CommandSpec {
    /// Creates a new `CommandSpec` for the given program.
    pub(crate) fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            dir: None,
            search_path: None,
        }
    }

    /// Adds an argument.
    pub(crate) fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());

        self
    }

    /// Adds multiple arguments.
    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));

        self
    }

    /// Sets the working directory.
    pub(crate) fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());

        self
    }

    /// Sets the search path used to resolve the program and handed to the child as `PATH`.
    pub(crate) fn search_path(mut self, search_path: impl AsRef<OsStr>) -> Self {
        self.search_path = Some(search_path.as_ref().to_os_string());

        self
    }

    pub(crate) fn program(&self) -> &OsStr {
        &self.program
    }

    pub(crate) fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub(crate) fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    // Human readable name of the program used in errors.
    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program().to_string_lossy())?;
        for arg in self.arguments() {
            write!(f, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Trait for things that locate and run external commands.
pub(crate) trait ProcessRunner {
    /// Resolves the given program (name or path) against the given search path.
    fn locate(&self, program: &OsStr, search_path: &OsStr) -> Option<PathBuf>;

    /// Runs the command and waits for its exit code.
    fn status(&self, command: &CommandSpec) -> Result<(), ProcessError>;

    /// Runs the command and captures stdout and stderr as text.
    fn output(&self, command: &CommandSpec) -> Result<String, ProcessError>;
}

/// [`ProcessRunner`] implementation backed by [`std::process::Command`].
#[derive(Debug, Default)]
pub(crate) struct SystemRunner;

impl SystemRunner {
    // Builds the std command for the given spec.
    fn command(&self, spec: &CommandSpec) -> Result<Command, ProcessError> {
        let program = match &spec.search_path {
            Some(search_path) => self
                .locate(&spec.program, search_path)
                .ok_or_else(|| ProcessError::NotFound(spec.program_name()))?,
            None => PathBuf::from(&spec.program),
        };
        trace!(program = %program.display());

        let mut cmd = Command::new(program);
        cmd.args(&spec.args);
        if let Some(dir) = spec.dir() {
            cmd.current_dir(dir);
        }
        if let Some(ref search_path) = spec.search_path {
            cmd.env("PATH", search_path);
        }
        cmd.stdin(Stdio::null()); // disconnect from self

        Ok(cmd)
    }
}

impl ProcessRunner for SystemRunner {
    fn locate(&self, program: &OsStr, search_path: &OsStr) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_default();
        if let Ok(path) = which::which_in(program, Some(search_path), &cwd) {
            return Some(path);
        }

        // well-known locations are given as absolute paths
        let path = Path::new(program);
        if path.is_absolute() && path.is_file() {
            return Some(path.to_path_buf());
        }

        None
    }

    #[instrument(level = "trace", skip(self, command), fields(command = %command))]
    fn status(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        let program = command.program_name();
        let status = self
            .command(command)?
            .status()
            .map_err(|source| ProcessError::Spawn { program: program.clone(), source })?;
        trace!(?status);

        if !status.success() {
            return Err(ProcessError::Exit {
                program,
                code: status.code(),
                output: String::new(),
            });
        }

        Ok(())
    }

    #[instrument(level = "trace", skip(self, command), fields(command = %command))]
    fn output(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        let program = command.program_name();
        let output = self
            .command(command)?
            .output()
            .map_err(|source| ProcessError::Spawn { program: program.clone(), source })?;
        trace!(status = ?output.status);

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ProcessError::Exit {
                program,
                code: output.status.code(),
                output: text,
            });
        }

        Ok(text)
    }
}

/// Returns the first non-empty line of the given text, trimmed.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default()
}
