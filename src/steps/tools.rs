use super::Toolbox;
use crate::colors::*;
use crate::environment::{ANDROID_SDK_DIR, PLATFORM_TOOLS_DIR};
use crate::step::Step;
use crate::terminal::detail;
use anyhow::Context;
use std::fs;

// Name of the downloaded runtime installer within the temp directory.
const RUNTIME_INSTALLER: &str = "nodejs.msi";

// Name of the downloaded platform tools archive within the temp directory.
const PLATFORM_TOOLS_ARCHIVE: &str = "platform-tools.zip";

/// Installs the runtime (and its package manager) unless it is already on the search path.
pub(super) fn runtime(tools: Toolbox<'_>) -> Step<'_> {
    let runtime = &tools.config.runtime;

    Step::new("Installing Node.js", move |ctx| {
        detail("📥 Downloading Node.js...");
        let installer = ctx.temp_dir().join(RUNTIME_INSTALLER);
        tools.fetcher.fetch(&runtime.installer, &installer).context("download failed")?;

        detail("🔧 Installing Node.js (this may take a few minutes)...");
        let msiexec = ctx.command("msiexec.exe").arg("/i").arg(&installer).args(["/quiet", "/norestart"]);
        tools.runner.status(&msiexec).context("installation failed")?;

        detail(SUCCESS_COLOR.paint("✅ Node.js installed successfully"));
        Ok(())
    })
    .skip_if(move |ctx| {
        if tools.locate(ctx, &runtime.command).is_none() {
            return false;
        }

        let version = tools.probe_version(ctx, &runtime.command, "--version").unwrap_or_default();
        detail(format!("ℹ️  Node.js already installed: {version}"));
        true
    })
}

/// Installs the JDK unless its directory already exists below the install root.
pub(super) fn jdk(tools: Toolbox<'_>) -> Step<'_> {
    let jdk = &tools.config.jdk;

    Step::new("Installing Java JDK", move |ctx| {
        detail("📥 Downloading Java JDK (this is a large file, please wait)...");
        let archive = ctx.temp_dir().join(format!("openjdk-{}.zip", jdk.version));
        tools.fetcher.fetch(&jdk.archive, &archive).context("download failed")?;

        detail("📦 Extracting Java JDK...");
        tools.fetcher.expand(&archive, ctx.install_dir()).context("extraction failed")?;

        let java_home = ctx.install_dir().join(jdk.dir_name());
        detail(format!("✅ Java JDK extracted to: {}", PATH_COLOR.paint(java_home.to_string_lossy())));
        Ok(())
    })
    .skip_if(move |ctx| {
        let java_home = ctx.install_dir().join(jdk.dir_name());
        if !java_home.is_dir() {
            return false;
        }

        detail(format!("ℹ️  Java JDK already exists at: {}", PATH_COLOR.paint(java_home.to_string_lossy())));
        true
    })
}

/// Installs the platform tools unless `adb` is on the search path and answers.
pub(super) fn platform_tools(tools: Toolbox<'_>) -> Step<'_> {
    let platform_tools = &tools.config.platform_tools;

    Step::new("Installing ADB", move |ctx| {
        detail("📥 Downloading Android Platform Tools...");
        let archive = ctx.temp_dir().join(PLATFORM_TOOLS_ARCHIVE);
        tools.fetcher.fetch(&platform_tools.archive, &archive).context("download failed")?;

        let android_home = ctx.install_dir().join(ANDROID_SDK_DIR);
        fs::create_dir_all(&android_home).context("failed to create directory")?;

        detail("📦 Extracting Android Platform Tools...");
        tools.fetcher.expand(&archive, &android_home).context("extraction failed")?;

        let adb_dir = android_home.join(PLATFORM_TOOLS_DIR);
        detail(format!("✅ ADB installed to: {}", PATH_COLOR.paint(adb_dir.to_string_lossy())));
        Ok(())
    })
    .skip_if(move |ctx| tools.installed(ctx, "ADB", "adb", "version"))
}

/// Installs the automation server globally unless it is on the search path and answers.
pub(super) fn server(tools: Toolbox<'_>) -> Step<'_> {
    let package_manager = &tools.config.package_manager;
    let server = &tools.config.server;

    Step::new("Installing Appium", move |ctx| {
        detail(format!("📦 Installing {} globally using {package_manager}...", server.package));
        let install = ctx.command(package_manager).args(["install", "-g"]).arg(&server.package);
        tools.run_captured(&install).with_context(|| format!("{package_manager} install failed"))?;

        detail(SUCCESS_COLOR.paint("✅ Appium installed successfully"));
        Ok(())
    })
    .skip_if(move |ctx| tools.installed(ctx, "Appium", &server.command, "--version"))
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::Config;
    use crate::context::InstallContext;
    use crate::step::StepOutcome;
    use crate::testing::{RecordingConfigurator, StubFetcher, StubRunner};
    use std::path::Path;
    use tempfile::tempdir;
    use test_log::test;

    fn context(root: &Path) -> InstallContext {
        let ctx = InstallContext::new(root.join("tools"), root.join("project"), root.join("tmp"), "");
        fs::create_dir_all(ctx.temp_dir()).unwrap();
        ctx
    }

    #[test]
    fn runtime_on_search_path_is_not_downloaded() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let runner = StubRunner::default().installed(["node"]).output("node --version", "v20.11.1");
        let (fetcher, env) = (StubFetcher::default(), RecordingConfigurator::default());
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };

        let outcome = runtime(tools).run(&mut context(root.path())).unwrap();

        assert_eq!(outcome, StepOutcome::Skipped);
        assert!(fetcher.calls.borrow().is_empty());
        assert!(!runner.ran("msiexec.exe"));
    }

    #[test]
    fn runtime_download_failure_is_fatal() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let runner = StubRunner::default();
        let fetcher = StubFetcher::default().failing(&config.runtime.installer.url);
        let env = RecordingConfigurator::default();
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };

        let err = runtime(tools).run(&mut context(root.path())).unwrap_err();

        assert_eq!(format!("{err:#}"), "download failed: connection reset");
        assert!(!runner.ran("msiexec.exe"));
    }

    #[test]
    fn runtime_installer_runs_silently() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let runner = StubRunner::default();
        let (fetcher, env) = (StubFetcher::default(), RecordingConfigurator::default());
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };
        let mut ctx = context(root.path());

        runtime(tools).run(&mut ctx).unwrap();

        let installer = ctx.temp_dir().join(RUNTIME_INSTALLER);
        let expected = format!("msiexec.exe /i {} /quiet /norestart", installer.display());
        assert_eq!(*runner.commands.borrow(), [expected]);
    }

    #[test]
    fn jdk_extracts_into_install_root() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let (runner, fetcher, env) = (StubRunner::default(), StubFetcher::default(), RecordingConfigurator::default());
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };

        jdk(tools).run(&mut context(root.path())).unwrap();

        assert_eq!(*fetcher.calls.borrow(), [format!("fetch {}", config.jdk.archive.url), "expand openjdk-24.0.1.zip".to_string()]);
    }

    #[test]
    fn existing_jdk_is_kept() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let (runner, fetcher, env) = (StubRunner::default(), StubFetcher::default(), RecordingConfigurator::default());
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };
        let mut ctx = context(root.path());
        fs::create_dir_all(ctx.install_dir().join("jdk-24.0.1")).unwrap();

        assert_eq!(jdk(tools).run(&mut ctx).unwrap(), StepOutcome::Skipped);
        assert!(fetcher.calls.borrow().is_empty());
    }

    #[test]
    fn adb_on_search_path_but_broken_is_reinstalled() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let runner = StubRunner::default().installed(["adb"]).failing("adb version", "");
        let (fetcher, env) = (StubFetcher::default(), RecordingConfigurator::default());
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };
        let mut ctx = context(root.path());

        assert_eq!(platform_tools(tools).run(&mut ctx).unwrap(), StepOutcome::Done);
        assert!(ctx.install_dir().join(ANDROID_SDK_DIR).is_dir());
        assert_eq!(fetcher.calls.borrow().last().map(String::as_str), Some("expand platform-tools.zip"));
    }

    #[test]
    fn server_failure_surfaces_output() {
        let root = tempdir().unwrap();
        let config = Config::default();
        let runner = StubRunner::default().failing("npm install -g appium", "npm ERR! code EACCES");
        let (fetcher, env) = (StubFetcher::default(), RecordingConfigurator::default());
        let tools = Toolbox {
            config: &config,
            runner: &runner,
            fetcher: &fetcher,
            env: &env,
        };

        let err = server(tools).run(&mut context(root.path())).unwrap_err();

        assert_eq!(format!("{err:#}"), "npm install failed: 'npm' exited with exit code 1");
        // the server was not found, so no version probe was attempted
        assert_eq!(*runner.located.borrow(), ["appium"]);
        assert!(!runner.ran("appium --version"));
    }
}
