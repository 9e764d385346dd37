use crate::colors::*;
use crate::step::Step;
use crate::terminal::detail;
use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Creates the install root and the temp directory.
pub(super) fn setup_directories<'a>() -> Step<'a> {
    Step::new("Setting up directories", |ctx| {
        for dir in [ctx.install_dir(), ctx.temp_dir()] {
            create_dir(dir)?;
        }

        Ok(())
    })
}

fn create_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.is_dir() {
        debug!(dir = %dir.display(), "directory exists");
        return Ok(());
    }

    fs::create_dir_all(dir).with_context(|| format!("failed to create directory {}", dir.display()))?;
    detail(format!("📁 Created directory: {}", PATH_COLOR.paint(dir.to_string_lossy())));

    Ok(())
}

/// Removes the temp directory; the installation is complete at this point, so failing is harmless.
pub(super) fn cleanup<'a>() -> Step<'a> {
    Step::new("Cleaning up", |ctx| {
        match fs::remove_dir_all(ctx.temp_dir()) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err).with_context(|| format!("failed to remove {}", ctx.temp_dir().display())),
        }
        detail("🧹 Temporary files removed");

        Ok(())
    })
    .warn_only()
}
