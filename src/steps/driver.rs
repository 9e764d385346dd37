use super::Toolbox;
use crate::colors::*;
use crate::step::Step;
use crate::terminal::detail;
use anyhow::{Context, bail};
use std::ffi::OsStr;

/// Installs the automation driver.
///
/// The driver package is installed globally through the package manager first. Should that fail,
/// the server's own `driver install` command is tried with the first server executable found in
/// the configured locations. When both fail, the operator is told which command to run manually.
pub(super) fn driver(tools: Toolbox<'_>) -> Step<'_> {
    let package_manager = &tools.config.package_manager;
    let server = &tools.config.server;
    let driver = &tools.config.driver;

    Step::new(format!("Installing {}", driver.title), move |ctx| {
        detail(format!("📦 Installing {} using {package_manager}...", driver.package));
        let install = ctx.command(package_manager).args(["install", "-g"]).arg(&driver.package);
        tools.run_captured(&install).with_context(|| format!("{package_manager} install failed"))?;

        detail(SUCCESS_COLOR.paint(format!("✅ {} driver installed successfully", driver.title)));
        Ok(())
    })
    .fallback(move |ctx| {
        detail(format!("🔄 Trying alternative: {} driver install {}...", server.command, driver.name));
        let located = server
            .expanded_locations(&ctx.var_expander())
            .iter()
            .find_map(|location| tools.runner.locate(OsStr::new(location), ctx.search_path()));
        let Some(executable) = located else {
            bail!("{} command not found", server.command);
        };

        let install = ctx.command(&executable).args(["driver", "install"]).arg(&driver.name);
        tools.run_captured(&install).with_context(|| format!("{} driver install failed", server.command))?;

        detail(SUCCESS_COLOR.paint(format!("✅ {} driver installed via {}", driver.title, server.command)));
        Ok(())
    })
    .remediation(format!("installing {}", driver.package), format!("{} driver install {}", server.command, driver.name))
}
