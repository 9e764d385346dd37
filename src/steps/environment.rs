use super::Toolbox;
use crate::colors::*;
use crate::environment::EnvironmentVariableSet;
use crate::runner::first_line;
use crate::step::Step;
use crate::terminal::{detail, warning};
use anyhow::{Context, bail};
use std::path::Path;
use tracing::debug;

/// Makes freshly installed tools reachable for the remaining steps of this run.
///
/// Running programs are notified about the changed environment, then the search path of the
/// context is extended with the install directory of the runtime and the global prefix of the
/// package manager.
pub(super) fn refresh(tools: Toolbox<'_>) -> Step<'_> {
    let package_manager = &tools.config.package_manager;
    let runtime = &tools.config.runtime;

    Step::new("Refreshing Environment", move |ctx| {
        detail("🔄 Refreshing environment variables...");
        if let Err(err) = tools.env.broadcast_change() {
            debug!(%err, "broadcast failed");
        }

        let runtime_home = Path::new(&runtime.home);
        if runtime_home.is_dir() && ctx.extend_search_path(runtime_home) {
            debug!(dir = %runtime_home.display(), "runtime added to search path");
        }

        let query = ctx.command(package_manager).args(["config", "get", "prefix"]);
        let output = tools
            .runner
            .output(&query)
            .with_context(|| format!("failed to query the global prefix of {package_manager}"))?;
        let prefix = first_line(&output).trim();
        if prefix.is_empty() {
            bail!("{package_manager} reported an empty global prefix");
        }

        detail(format!("📁 NPM Global Path: {}", PATH_COLOR.paint(prefix)));
        let prefix = Path::new(prefix);
        ctx.extend_search_path(prefix);
        ctx.extend_search_path(&prefix.join("node_modules").join(".bin"));

        Ok(())
    })
    .warn_only()
}

/// Persists the environment variables and search path entries.
///
/// Every item is attempted; failures are printed as they happen and reported together.
pub(super) fn persist_variables(tools: Toolbox<'_>) -> Step<'_> {
    Step::new("Setting Environment Variables", move |ctx| {
        let set = EnvironmentVariableSet::derive(ctx, tools.config);
        let mut failed = Vec::new();

        for (name, value) in set.vars() {
            let value = value.to_string_lossy();
            detail(format!("🔧 Setting {name} = {}", PATH_COLOR.paint(&*value)));
            if let Err(err) = tools.env.set_persistent(name, &value) {
                warning(format!("Failed to set {name}: {err}"));
                failed.push(name.to_string());
            }
        }

        for dir in set.path_entries() {
            detail(format!("🔧 Adding to PATH: {}", PATH_COLOR.paint(dir.to_string_lossy())));
            if let Err(err) = tools.env.append_to_persistent_path(dir) {
                warning(format!("Failed to add to PATH: {err}"));
                failed.push(dir.display().to_string());
            }
        }

        if !failed.is_empty() {
            bail!("failed to persist {}", failed.join(", "));
        }

        Ok(())
    })
    .warn_only()
}
