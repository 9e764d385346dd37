mod args;
mod checksum;
mod colors;
mod config;
mod context;
mod environment;
mod fetch;
mod pipeline;
mod runner;
mod step;
mod steps;
mod terminal;
#[cfg(test)]
mod testing;
mod vars;
mod verify;
mod version;

use crate::args::Args;
use crate::colors::*;
use crate::config::*;
use crate::context::InstallContext;
use crate::environment::{RegistryPathStore, UserEnvConfigurator};
use crate::fetch::HttpFetcher;
use crate::pipeline::{PipelineError, PipelineSummary};
use crate::runner::SystemRunner;
use crate::steps::Toolbox;
use crate::version::Version;
use anyhow::{Context, bail};
use clap::Parser;
use std::io::BufRead;
use std::path::{self, PathBuf};
use std::time::{Duration, Instant};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{level_filters::*, *};
use tracing_subscriber::EnvFilter;

// Exit code used in case there were no errors.
#[doc(hidden)]
const EXIT_OK: i32 = 0;

// Exit code used in case of errors.
#[doc(hidden)]
const EXIT_NOK: i32 = 1;

/// Main entry point for the application.
fn main() {
    // enable ansi support to use colorised/styled output
    #[cfg(windows)]
    let _ = nu_ansi_term::enable_ansi_support();

    // remember start date/time
    let start = Instant::now();

    // parse arguments
    let args = Args::parse();

    // delegate
    let exit_code = match internal_main(&args) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            print_failure(&err);
            EXIT_NOK
        }
    };

    // stop here in case only the version was requested
    if args.version {
        std::process::exit(exit_code);
    }

    // print some statistics
    let elapsed = start.elapsed();
    println!("Total time: {}", format_elapsed(elapsed));
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    println!("Finished at: {}", format_now(now));

    if !args.no_pause {
        wait_for_exit();
    }
    std::process::exit(exit_code);
}

// Internal main entry point for the application.
#[doc(hidden)]
fn internal_main(args: &Args) -> anyhow::Result<()> {
    // print some information
    if !args.quiet || args.version {
        print_info();
    }

    // stop here in case only the version was requested
    if args.version {
        return Ok(());
    }

    // init tracing
    init_tracing(args);

    // print parsed arguments
    trace!("arguments: {args:#?}");

    // the installer drives msiexec, setx and friends
    if !cfg!(windows) {
        bail!("This installer is designed for Windows only");
    }

    print_header();

    // load config
    let config = load_config(args)?;
    debug!(?config);

    // derive the context
    let mut ctx = InstallContext::from_env(args.install_dir(), args.project_dir());
    println!("📁 Install Path: {}", PATH_COLOR.paint(ctx.install_dir().to_string_lossy()));
    println!("📂 Project Path: {}", PATH_COLOR.paint(ctx.project_dir().to_string_lossy()));
    println!();
    debug!(?ctx);

    // wire up the collaborators
    let runner = SystemRunner;
    let fetcher = HttpFetcher::new()?;
    let user_path = RegistryPathStore;
    let env = UserEnvConfigurator::new(&runner, &user_path);
    let tools = Toolbox {
        config: &config,
        runner: &runner,
        fetcher: &fetcher,
        env: &env,
    };

    // run the installation
    let plan = steps::installation_plan(tools);
    debug!(steps = ?plan.step_names().collect::<Vec<_>>(), "installation plan");
    let summary = plan.run(&mut ctx)?;
    print_success(&summary);

    Ok(())
}

// Loads the configuration: an explicit file must exist, the default file is optional.
#[doc(hidden)]
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let explicit = args.config.is_some();
    let config_path = args.config.clone().unwrap_or(CONFIG_FILENAME.into());
    let config_path = PathBuf::from(config_path);
    let config_path = path::absolute(&config_path).unwrap_or(config_path);

    if !explicit && !config_path.is_file() {
        debug!(config_path = %config_path.display(), "no configuration file, using defaults");
        return Ok(Config::default());
    }

    println!("Using configuration from {}.", PATH_COLOR.paint(config_path.to_string_lossy()));
    Config::load_from_file(&config_path).with_context(|| format!("failed to load configuration from {}", config_path.display()))
}

// Formats the elapsed time in whole seconds.
#[doc(hidden)]
fn format_elapsed(elapsed: Duration) -> String {
    // null out everything below seconds
    let elapsed = Duration::from_secs(elapsed.as_secs());

    // format the remaining duration
    humantime::format_duration(elapsed).to_string()
}

// Formats the timestamp in the local offset (or UTC).
#[doc(hidden)]
fn format_now(now: OffsetDateTime) -> String {
    // define format
    const FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]");

    // local offset or UTC
    let offset = UtcOffset::current_local_offset();
    let offset = offset.unwrap_or(UtcOffset::UTC);
    trace!(?offset);

    // format
    let now = now.to_offset(offset);
    now.format(&FORMAT).unwrap_or(now.to_string())
}

// Prints some information (version, path of executable, etc.).
#[doc(hidden)]
fn print_info() {
    let version = Version::default();
    if let Ok(exe) = std::env::current_exe() {
        let exe = PATH_COLOR.paint(exe.to_string_lossy());
        println!("{version} [{exe}]");
    } else {
        println!("{version}");
    }
}

// Initialises the tracing framework based on given command line arguments.
#[doc(hidden)]
fn init_tracing(args: &Args) {
    let level_filter = match args.verbose {
        0 => LevelFilter::ERROR.into(),
        1 => LevelFilter::WARN.into(),
        2 => LevelFilter::INFO.into(),
        3 => LevelFilter::DEBUG.into(),
        _ => LevelFilter::TRACE.into(),
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level_filter);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

// Prints the banner.
#[doc(hidden)]
fn print_header() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    APPIUM INSTALLER CLI                      ║");
    println!("║                   Windows Edition                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

// Prints the summary and what to do next.
#[doc(hidden)]
fn print_success(summary: &PipelineSummary) {
    println!();
    println!("{}", SUCCESS_COLOR.paint("🎉 INSTALLATION COMPLETED SUCCESSFULLY!"));
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    INSTALLATION SUMMARY                      ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║ ✅ Node.js & NPM installed                                   ║");
    println!("║ ✅ Java JDK installed                                        ║");
    println!("║ ✅ Android ADB installed                                     ║");
    println!("║ ✅ Appium installed globally                                 ║");
    println!("║ ✅ UiAutomator2 driver installed                             ║");
    println!("║ ✅ Environment variables configured                          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("{} completed, {} already present, {} with warnings", summary.completed, summary.skipped, summary.warnings);

    println!();
    println!("📋 NEXT STEPS:");
    println!("  1. 🔄 Restart your terminal (IMPORTANT!)");
    println!("  2. 🚀 Start Appium server: appium");
    println!("  3. 🔌 Connect device/emulator: adb devices");
    println!("  4. 📱 Navigate to project and run your tests");

    println!();
    println!("🔧 VERIFICATION COMMANDS:");
    println!("  • Check Java: java -version");
    println!("  • Check ADB: adb version");
    println!("  • Check Appium: appium --version");
    println!("  • Check Environment: echo %JAVA_HOME%");

    println!();
    println!("🚀 Happy Mobile Testing!");
}

// Prints the error; failed installations get some troubleshooting tips on top.
#[doc(hidden)]
fn print_failure(err: &anyhow::Error) {
    let Some(err) = err.downcast_ref::<PipelineError>() else {
        let message = ATTENTION_COLOR.paint(format!("❌ {err:#}"));
        println!("{message}");
        return;
    };

    println!();
    println!("{}", ATTENTION_COLOR.paint("❌ INSTALLATION FAILED!"));
    println!("Error: {err}");
    println!();
    println!("💡 Troubleshooting Tips:");
    println!("  • Make sure you're running as Administrator");
    println!("  • Check your internet connection");
    println!("  • Disable antivirus temporarily");
    println!("  • Try running the installer again");
}

// Waits for the operator to press Enter, so a double-clicked console stays open.
#[doc(hidden)]
fn wait_for_exit() {
    println!();
    println!("{}", "=".repeat(60));
    print!("Press Enter to exit...");
    let _ = std::io::Write::flush(&mut std::io::stdout());
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
