//! Arguments.
//!
//! This module contains the definition for the available command-line parameter.

use crate::config::{DEFAULT_INSTALL_DIR, DEFAULT_PROJECT_DIR};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(author, about)]
pub(crate) struct Args {
    /// Where to install the tools [default: C:\AppiumTools]
    #[clap(value_name = "INSTALL_DIR")]
    pub(crate) install_dir: Option<PathBuf>,
    /// The test project whose dependencies to install [default: C:\AppiumProject]
    #[clap(value_name = "PROJECT_DIR")]
    pub(crate) project_dir: Option<PathBuf>,
    /// Sets a custom config file
    #[clap(short, long, value_name = "file")]
    pub(crate) config: Option<String>,
    /// Do not wait for Enter before exiting
    #[clap(long, action)]
    pub(crate) no_pause: bool,
    /// Suppress unnecessary information
    #[clap(short = 'q', long, action)]
    pub(crate) quiet: bool,
    /// Change level of verbosity (apply multiple times to increase level)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Print version information
    #[clap(short = 'V', long, action)]
    pub(crate) version: bool,
}

impl Args {
    /// Returns the install root, falling back to the default.
    pub(crate) fn install_dir(&self) -> PathBuf {
        self.install_dir.clone().unwrap_or_else(|| DEFAULT_INSTALL_DIR.into())
    }

    /// Returns the project directory, falling back to the default.
    pub(crate) fn project_dir(&self) -> PathBuf {
        self.project_dir.clone().unwrap_or_else(|| DEFAULT_PROJECT_DIR.into())
    }
}
