//! Test doubles for the collaborators of the steps.

use crate::config::Artifact;
use crate::environment::{EnvConfigurator, EnvError};
use crate::fetch::{ArtifactFetcher, FetchError};
use crate::runner::{CommandSpec, ProcessError, ProcessRunner};
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// [`ProcessRunner`] that records every call and answers from canned data.
#[derive(Debug, Default)]
pub(crate) struct StubRunner {
    // programs (names or paths) `locate` finds
    installed: Vec<String>,
    // command line prefixes that fail, with the output they print
    failing: Vec<(String, String)>,
    // command line prefixes with their output
    outputs: Vec<(String, String)>,
    /// Every program asked for by `locate`, in order.
    pub(crate) located: RefCell<Vec<String>>,
    /// Every command line run, in order.
    pub(crate) commands: RefCell<Vec<String>>,
}

impl StubRunner {
    /// Makes `locate` find the given programs.
    pub(crate) fn installed<I, S>(mut self, programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed.extend(programs.into_iter().map(Into::into));

        self
    }

    /// Makes commands starting with `prefix` fail after printing `output`.
    pub(crate) fn failing(mut self, prefix: &str, output: &str) -> Self {
        self.failing.push((prefix.to_string(), output.to_string()));

        self
    }

    /// Makes commands starting with `prefix` print `output`.
    pub(crate) fn output(mut self, prefix: &str, output: &str) -> Self {
        self.outputs.push((prefix.to_string(), output.to_string()));

        self
    }

    /// Returns whether a command line starting with `prefix` was run.
    pub(crate) fn ran(&self, prefix: &str) -> bool {
        self.commands.borrow().iter().any(|line| line.starts_with(prefix))
    }

    fn run(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        let line = command.to_string();
        self.commands.borrow_mut().push(line.clone());

        if let Some((_, output)) = self.failing.iter().find(|(prefix, _)| line.starts_with(prefix.as_str())) {
            return Err(ProcessError::Exit {
                program: command.program().to_string_lossy().into_owned(),
                code: Some(1),
                output: output.clone(),
            });
        }

        let output = self.outputs.iter().find(|(prefix, _)| line.starts_with(prefix.as_str()));
        Ok(output.map(|(_, output)| output.clone()).unwrap_or_default())
    }
}

impl ProcessRunner for StubRunner {
    fn locate(&self, program: &OsStr, _search_path: &OsStr) -> Option<PathBuf> {
        let program = program.to_string_lossy().into_owned();
        self.located.borrow_mut().push(program.clone());
        self.installed.contains(&program).then(|| PathBuf::from(program))
    }

    fn status(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        self.run(command).map(|_| ())
    }

    fn output(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.run(command)
    }
}

/// [`ArtifactFetcher`] that records every call and only touches the local disc.
#[derive(Debug, Default)]
pub(crate) struct StubFetcher {
    /// Every call, in order.
    pub(crate) calls: RefCell<Vec<String>>,
    // urls that fail to download
    failing: Vec<String>,
}

impl StubFetcher {
    /// Makes downloads of the given url fail.
    pub(crate) fn failing(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());

        self
    }
}

impl ArtifactFetcher for StubFetcher {
    fn fetch(&self, artifact: &Artifact, dest: &Path) -> Result<(), FetchError> {
        self.calls.borrow_mut().push(format!("fetch {}", artifact.url));
        if self.failing.contains(&artifact.url) {
            return Err(FetchError::Io(std::io::Error::other("connection reset")));
        }
        fs::write(dest, artifact.url.as_bytes())?;

        Ok(())
    }

    fn expand(&self, archive: &Path, dest: &Path) -> Result<(), FetchError> {
        let name = archive.file_name().unwrap_or_default().to_string_lossy().into_owned();
        self.calls.borrow_mut().push(format!("expand {name}"));
        fs::create_dir_all(dest)?;

        Ok(())
    }
}

/// [`EnvConfigurator`] recording every call; keys listed in `failing` fail.
#[derive(Debug, Default)]
pub(crate) struct RecordingConfigurator {
    /// Every call, in order.
    pub(crate) calls: RefCell<Vec<String>>,
    // variable names or directories that fail
    failing: Vec<String>,
    // values of the current session
    session: Vec<(String, String)>,
}

impl RecordingConfigurator {
    /// Makes calls for the given variable name or directory fail.
    pub(crate) fn failing(mut self, key: impl Into<String>) -> Self {
        self.failing.push(key.into());

        self
    }

    /// Sets the value of a variable in the current session.
    pub(crate) fn session(mut self, name: &str, value: &str) -> Self {
        self.session.push((name.to_string(), value.to_string()));

        self
    }

    fn record(&self, call: String, key: &str) -> Result<(), EnvError> {
        self.calls.borrow_mut().push(call);
        if self.failing.iter().any(|f| f == key) {
            let err = ProcessError::Exit {
                program: "setx".to_string(),
                code: Some(1),
                output: String::new(),
            };
            return Err(err.into());
        }

        Ok(())
    }
}

impl EnvConfigurator for RecordingConfigurator {
    fn set_persistent(&self, name: &str, value: &str) -> Result<(), EnvError> {
        self.record(format!("set {name}={value}"), name)
    }

    fn append_to_persistent_path(&self, dir: &Path) -> Result<(), EnvError> {
        self.record(format!("path {}", dir.display()), &dir.to_string_lossy())
    }

    fn broadcast_change(&self) -> Result<(), EnvError> {
        self.record("broadcast".to_string(), "broadcast")
    }

    fn session_value(&self, name: &str) -> Option<String> {
        self.session.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
    }
}
