//! Steps.
//!
//! This module contains the concrete steps and the fixed plan they are run in.

mod driver;
mod environment;
mod housekeeping;
mod project;
mod tools;

use crate::config::Config;
use crate::context::InstallContext;
use crate::environment::EnvConfigurator;
use crate::fetch::ArtifactFetcher;
use crate::pipeline::Pipeline;
use crate::runner::{CommandSpec, ProcessError, ProcessRunner, first_line};
use crate::step::Step;
use crate::terminal;
use crate::verify::Verifier;
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing::debug;

/// The collaborators shared by all steps.
#[derive(Clone, Copy)]
pub(crate) struct Toolbox<'a> {
    pub(crate) config: &'a Config,
    pub(crate) runner: &'a dyn ProcessRunner,
    pub(crate) fetcher: &'a dyn ArtifactFetcher,
    pub(crate) env: &'a dyn EnvConfigurator,
}

impl Toolbox<'_> {
    // Resolves the program against the search path of the context.
    fn locate(&self, ctx: &InstallContext, program: &str) -> Option<PathBuf> {
        self.runner.locate(OsStr::new(program), ctx.search_path())
    }

    // Runs `<program> <arg>` and returns the first line of the output.
    fn probe_version(&self, ctx: &InstallContext, program: &str, arg: &str) -> Option<String> {
        match self.runner.output(&ctx.command(program).arg(arg)) {
            Ok(output) => Some(first_line(&output).to_string()),
            Err(err) => {
                debug!(%err, program, "version probe failed");
                None
            }
        }
    }

    // Whether the program is on the search path and answers its version probe.
    fn installed(&self, ctx: &InstallContext, name: &str, program: &str, arg: &str) -> bool {
        if self.locate(ctx, program).is_none() {
            return false;
        }
        let Some(version) = self.probe_version(ctx, program, arg) else {
            return false;
        };

        terminal::detail(format!("ℹ️  {name} already installed: {version}"));
        true
    }

    // Runs the command capturing its output, which is shown verbatim if the command fails.
    fn run_captured(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        match self.runner.output(command) {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(output) = err.output() {
                    terminal::failed_output(&command.program().to_string_lossy(), output);
                }
                Err(err)
            }
        }
    }
}

/// Builds the installation plan; the order of the steps matters.
pub(crate) fn installation_plan(tools: Toolbox<'_>) -> Pipeline<'_> {
    Pipeline::new(vec![
        housekeeping::setup_directories(),
        tools::runtime(tools),
        tools::jdk(tools),
        tools::platform_tools(tools),
        tools::server(tools),
        environment::refresh(tools),
        driver::driver(tools),
        project::dependencies(tools),
        environment::persist_variables(tools),
        verification(tools),
        housekeeping::cleanup(),
    ])
}

// Verifies the installation; findings are printed, never raised.
fn verification(tools: Toolbox<'_>) -> Step<'_> {
    Step::new("Verifying Installation", move |ctx| {
        terminal::detail("🔍 Verifying installations...");
        let report = Verifier::new(tools.config, tools.runner, tools.env).verify(ctx);
        report.print();
        Ok(())
    })
    .warn_only()
}
