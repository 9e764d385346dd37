//! Verification.
//!
//! This module contains the read-only check run after the installation. It probes every tool and
//! every variable and reports what it found. Nothing found missing is treated as an error.

use crate::colors::*;
use crate::config::Config;
use crate::context::InstallContext;
use crate::environment::{EnvConfigurator, EnvironmentVariableSet};
use crate::runner::{ProcessRunner, first_line};
use crate::terminal::detail;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// What was found for a tool.
#[derive(Debug, PartialEq)]
pub(crate) struct ToolFinding {
    /// The display name of the tool.
    pub(crate) name: &'static str,
    /// The first line of the version output, if the tool answered.
    pub(crate) version: Option<String>,
}

/// What was found for a variable.
#[derive(Debug, PartialEq)]
pub(crate) struct VariableFinding {
    pub(crate) name: &'static str,
    pub(crate) session_value: Option<String>,
    pub(crate) expected: PathBuf,
}

/// The result of the verification.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct VerificationReport {
    pub(crate) tools: Vec<ToolFinding>,
    pub(crate) variables: Vec<VariableFinding>,
}

impl VerificationReport {
    /// Whether every tool answered its version probe.
    pub(crate) fn all_tools_found(&self) -> bool {
        self.tools.iter().all(|tool| tool.version.is_some())
    }

    /// Prints the report as a checklist.
    pub(crate) fn print(&self) {
        for tool in &self.tools {
            match &tool.version {
                Some(version) => detail(SUCCESS_COLOR.paint(format!("✅ {}: {version}", tool.name))),
                None => detail(WARN_COLOR.paint(format!("❌ {}: Not found in PATH (restart terminal required)", tool.name))),
            }
        }

        println!();
        detail("📁 Environment Variables:");
        for var in &self.variables {
            match &var.session_value {
                Some(value) => detail(SUCCESS_COLOR.paint(format!("✅ {}: {value}", var.name))),
                None => {
                    detail(WARN_COLOR.paint(format!("⚠️  {}: Not set in current session (will be available after restart)", var.name)));
                    detail(format!("   Expected value: {}", PATH_COLOR.paint(var.expected.to_string_lossy())));
                }
            }
        }

        if !self.all_tools_found() {
            println!();
            detail(WARN_COLOR.paint("⚠️  Some tools may not be immediately available."));
            detail("   This is normal - restart your terminal to refresh environment variables.");
        }
    }
}

/// Probes the installed tools and the persisted variables.
pub(crate) struct Verifier<'a> {
    config: &'a Config,
    runner: &'a dyn ProcessRunner,
    env: &'a dyn EnvConfigurator,
}

impl<'a> Verifier<'a> {
    /// Creates a new `Verifier`.
    pub(crate) fn new(config: &'a Config, runner: &'a dyn ProcessRunner, env: &'a dyn EnvConfigurator) -> Self {
        Self { config, runner, env }
    }

    /// Probes everything and returns what was found.
    #[instrument(level = "trace", skip_all)]
    pub(crate) fn verify(&self, ctx: &InstallContext) -> VerificationReport {
        let probes = [
            ("Node.js", self.config.runtime.command.as_str(), "--version"),
            ("NPM", self.config.package_manager.as_str(), "--version"),
            ("Java", "java", "--version"),
            ("ADB", "adb", "version"),
        ];
        let mut tools: Vec<ToolFinding> = probes
            .into_iter()
            .map(|(name, program, arg)| ToolFinding {
                name,
                version: self.probe(ctx, program, arg),
            })
            .collect();

        // the server may only be reachable through one of its well-known locations
        let version = self
            .config
            .server
            .expanded_locations(&ctx.var_expander())
            .iter()
            .find_map(|location| self.probe(ctx, location, "--version"));
        tools.push(ToolFinding { name: "Appium", version });

        let expected = EnvironmentVariableSet::derive(ctx, self.config);
        let variables = expected
            .vars()
            .map(|(name, value)| VariableFinding {
                name,
                session_value: self.env.session_value(name),
                expected: value.to_path_buf(),
            })
            .collect();

        VerificationReport { tools, variables }
    }

    // Runs the version probe and returns the first line of its output.
    fn probe(&self, ctx: &InstallContext, program: &str, arg: &str) -> Option<String> {
        match self.runner.output(&ctx.command(program).arg(arg)) {
            Ok(output) => Some(first_line(&output).to_string()),
            Err(err) => {
                debug!(%err, program, "version probe failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::testing::{RecordingConfigurator, StubRunner};
    use std::path::Path;
    use test_log::test;

    fn context() -> InstallContext {
        InstallContext::new("/opt/appium", "/work/project", "/tmp/AppiumInstaller", "")
    }

    #[test]
    fn reports_found_and_missing_tools() {
        let config = Config::default();
        let runner = StubRunner::default()
            .output("node --version", "v22.16.0\n")
            .output("npm --version", "10.9.2\n")
            .failing("java", "")
            .output("adb version", "Android Debug Bridge version 1.0.41\nVersion 36.0.0\n")
            .output("appium --version", "2.19.0\n");
        let env = RecordingConfigurator::default();

        let report = Verifier::new(&config, &runner, &env).verify(&context());

        let found: Vec<(&str, Option<&str>)> = report.tools.iter().map(|tool| (tool.name, tool.version.as_deref())).collect();
        assert_eq!(
            found,
            [
                ("Node.js", Some("v22.16.0")),
                ("NPM", Some("10.9.2")),
                ("Java", None),
                ("ADB", Some("Android Debug Bridge version 1.0.41")),
                ("Appium", Some("2.19.0")),
            ]
        );
        assert!(!report.all_tools_found());
        report.print();
    }

    #[test]
    fn server_found_through_later_location() {
        let mut config = Config::default();
        config.server.locations = vec!["appium".to_string(), "/opt/npm/appium".to_string()];
        let runner = StubRunner::default().failing("appium --version", "").output("/opt/npm/appium --version", "2.19.0");
        let env = RecordingConfigurator::default();

        let report = Verifier::new(&config, &runner, &env).verify(&context());

        let appium = report.tools.iter().find(|tool| tool.name == "Appium").unwrap();
        assert_eq!(appium.version.as_deref(), Some("2.19.0"));
        assert!(runner.ran("appium --version"));
    }

    #[test]
    fn reports_session_and_expected_values() {
        let config = Config::default();
        let runner = StubRunner::default();
        let env = RecordingConfigurator::default().session("JAVA_HOME", "/usr/lib/jvm/java-24");

        let report = Verifier::new(&config, &runner, &env).verify(&context());

        assert_eq!(report.variables.len(), 3);
        assert_eq!(report.variables[0].session_value.as_deref(), Some("/usr/lib/jvm/java-24"));
        assert_eq!(report.variables[1].name, "ANDROID_HOME");
        assert_eq!(report.variables[1].session_value, None);
        assert_eq!(report.variables[1].expected, Path::new("/opt/appium/android-sdk"));
        // probing never persists anything
        assert!(env.calls.borrow().is_empty());
    }
}
