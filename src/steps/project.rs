use super::Toolbox;
use crate::colors::*;
use crate::step::Step;
use crate::terminal::detail;
use anyhow::Context;

// Manifest of the project, without it there is nothing to install.
const MANIFEST: &str = "package.json";

/// Installs the dependencies of the test project, if there is one.
pub(super) fn dependencies(tools: Toolbox<'_>) -> Step<'_> {
    let package_manager = &tools.config.package_manager;

    Step::new("Installing Dependencies", move |ctx| {
        let project_dir = ctx.project_dir();
        if !project_dir.is_dir() {
            detail(format!("ℹ️  Project path {} does not exist, skipping {package_manager} install", PATH_COLOR.paint(project_dir.to_string_lossy())));
            return Ok(());
        }
        if !project_dir.join(MANIFEST).is_file() {
            detail(format!("ℹ️  No {MANIFEST} found, skipping {package_manager} install"));
            return Ok(());
        }

        detail(format!("📦 Running {package_manager} install in {}...", PATH_COLOR.paint(project_dir.to_string_lossy())));
        let install = ctx.command(package_manager).arg("install").current_dir(project_dir);
        tools.runner.status(&install).with_context(|| format!("{package_manager} install failed"))?;

        detail(SUCCESS_COLOR.paint("✅ Dependencies installed successfully"));
        Ok(())
    })
}
