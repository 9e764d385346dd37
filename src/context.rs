//! Installation context.
//!
//! This module contains the state shared by all steps of one run.

use crate::runner::CommandSpec;
use crate::vars::{SimpleVarResolver, VarExpander};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the temporary working directory below the temp directory of the OS.
pub(crate) const TEMP_DIR_NAME: &str = "AppiumInstaller";

/// The paths computed once at startup plus the search path used to resolve executables.
///
/// The paths never change during a run. The search path starts out as the `PATH` of this process
/// and is extended by the environment refresh step, so that later steps find freshly installed tools.
#[derive(Debug)]
pub(crate) struct InstallContext {
    install_dir: PathBuf,
    project_dir: PathBuf,
    temp_dir: PathBuf,
    search_path: OsString,
}

impl InstallContext {
    /// Creates a new `InstallContext`.
    pub(crate) fn new(install_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>, search_path: impl Into<OsString>) -> Self {
        Self {
            install_dir: install_dir.into(),
            project_dir: project_dir.into(),
            temp_dir: temp_dir.into(),
            search_path: search_path.into(),
        }
    }

    /// Creates a new `InstallContext` using the temp directory and the `PATH` of this process.
    pub(crate) fn from_env(install_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        let temp_dir = env::temp_dir().join(TEMP_DIR_NAME);
        let search_path = env::var_os("PATH").unwrap_or_default();
        Self::new(install_dir, project_dir, temp_dir, search_path)
    }

    pub(crate) fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub(crate) fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub(crate) fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub(crate) fn search_path(&self) -> &OsStr {
        &self.search_path
    }

    /// Appends the given directory to the search path, unless it is already part of it.
    ///
    /// Returns whether the search path changed.
    pub(crate) fn extend_search_path(&mut self, dir: &Path) -> bool {
        if env::split_paths(&self.search_path).any(|entry| entry == dir) {
            return false;
        }

        let mut entries: Vec<PathBuf> = env::split_paths(&self.search_path).filter(|entry| !entry.as_os_str().is_empty()).collect();
        entries.push(dir.to_path_buf());
        match env::join_paths(entries) {
            Ok(search_path) => {
                debug!(dir = %dir.display(), "extended search path");
                self.search_path = search_path;
                true
            }
            Err(err) => {
                warn!(?err, dir = %dir.display(), "failed to extend search path");
                false
            }
        }
    }

    /// Creates a command that resolves its program against (and inherits) the search path.
    pub(crate) fn command(&self, program: impl AsRef<OsStr>) -> CommandSpec {
        CommandSpec::new(program).search_path(&self.search_path)
    }

    /// Creates a variable expander knowing the paths of this context and the process environment.
    pub(crate) fn var_expander(&self) -> VarExpander {
        let mut vars = SimpleVarResolver::default();
        vars.insert("install.dir", self.install_dir.to_string_lossy())
            .insert("project.dir", self.project_dir.to_string_lossy())
            .insert("temp.dir", self.temp_dir.to_string_lossy());
        VarExpander::with_env(vars)
    }
}
