//! Environment configuration.
//!
//! This module contains the persistent environment variables derived from the install root and the
//! configurator that stores them in the user environment of the OS.

use crate::config::Config;
use crate::context::InstallContext;
use crate::runner::{CommandSpec, ProcessError, ProcessRunner};
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{instrument, trace};

/// Name of the directory holding the android sdk below the install root.
pub(crate) const ANDROID_SDK_DIR: &str = "android-sdk";

/// Name of the platform tools directory below the android sdk.
pub(crate) const PLATFORM_TOOLS_DIR: &str = "platform-tools";

// Separator of the entries in the persistent search path.
#[doc(hidden)]
const PATH_SEPARATOR: char = ';';

/// Errors while persisting the environment.
#[derive(Debug, thiserror::Error)]
pub(crate) enum EnvError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("failed to access the user search path: {0}")]
    UserPath(#[source] io::Error),
}

/// Trait for things that persist environment variables.
///
/// Every call stands on its own; callers treat failures as warnings.
pub(crate) trait EnvConfigurator {
    /// Persists the variable for new sessions.
    fn set_persistent(&self, name: &str, value: &str) -> Result<(), EnvError>;

    /// Appends the given directory to the persistent search path.
    fn append_to_persistent_path(&self, dir: &Path) -> Result<(), EnvError>;

    /// Notifies running programs about the changed environment.
    fn broadcast_change(&self) -> Result<(), EnvError>;

    /// Returns the value of the variable in the current session.
    fn session_value(&self, name: &str) -> Option<String>;
}

/// Trait for the storage of the user scoped search path.
///
/// Only the user's own entries pass through here, never the machine wide ones.
pub(crate) trait UserPathStore {
    /// Returns the stored search path, or `None` if the user has none.
    fn load(&self) -> io::Result<Option<String>>;

    /// Replaces the stored search path.
    fn store(&self, path: &str) -> io::Result<()>;
}

/// [`UserPathStore`] backed by `HKEY_CURRENT_USER\Environment\Path`.
pub(crate) struct RegistryPathStore;

#[cfg(windows)]
impl RegistryPathStore {
    const KEY: &'static str = "Environment";
    const VALUE: &'static str = "Path";
}

#[cfg(windows)]
impl UserPathStore for RegistryPathStore {
    fn load(&self) -> io::Result<Option<String>> {
        // ERROR_FILE_NOT_FOUND as HRESULT
        const NOT_FOUND: i32 = 0x8007_0002_u32 as i32;

        let key = windows_registry::CURRENT_USER.open(Self::KEY).map_err(io::Error::other)?;
        match key.get_string(Self::VALUE) {
            Ok(path) => Ok(Some(path)),
            Err(err) if err.code().0 == NOT_FOUND => Ok(None),
            Err(err) => Err(io::Error::other(err)),
        }
    }

    fn store(&self, path: &str) -> io::Result<()> {
        let key = windows_registry::CURRENT_USER.create(Self::KEY).map_err(io::Error::other)?;
        key.set_expand_string(Self::VALUE, path).map_err(io::Error::other)
    }
}

#[cfg(not(windows))]
impl UserPathStore for RegistryPathStore {
    fn load(&self) -> io::Result<Option<String>> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn store(&self, _path: &str) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

/// [`EnvConfigurator`] for the user environment.
///
/// Variables are persisted with `setx`, the search path goes through a [`UserPathStore`] and the
/// broadcast uses `refreshenv`.
pub(crate) struct UserEnvConfigurator<'a> {
    runner: &'a dyn ProcessRunner,
    user_path: &'a dyn UserPathStore,
}

impl<'a> UserEnvConfigurator<'a> {
    /// Creates a new `UserEnvConfigurator`.
    pub(crate) fn new(runner: &'a dyn ProcessRunner, user_path: &'a dyn UserPathStore) -> Self {
        Self { runner, user_path }
    }
}

impl EnvConfigurator for UserEnvConfigurator<'_> {
    #[instrument(level = "trace", skip(self))]
    fn set_persistent(&self, name: &str, value: &str) -> Result<(), EnvError> {
        Ok(self.runner.status(&CommandSpec::new("setx").arg(name).arg(value))?)
    }

    #[instrument(level = "trace", skip(self))]
    fn append_to_persistent_path(&self, dir: &Path) -> Result<(), EnvError> {
        let current = self.user_path.load().map_err(EnvError::UserPath)?.unwrap_or_default();
        let Some(path) = append_entry(&current, dir) else {
            trace!("already part of the user search path");
            return Ok(());
        };

        trace!(%path, "storing user search path");
        self.user_path.store(&path).map_err(EnvError::UserPath)
    }

    fn broadcast_change(&self) -> Result<(), EnvError> {
        Ok(self.runner.status(&CommandSpec::new("cmd").args(["/C", "refreshenv"]))?)
    }

    fn session_value(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.is_empty())
    }
}

// Returns the search path with `dir` appended, or `None` if it is already part of it.
// Entries compare case-insensitively and without trailing separators.
#[doc(hidden)]
fn append_entry(current: &str, dir: &Path) -> Option<String> {
    let dir = dir.to_string_lossy();
    let normalize = |entry: &str| entry.trim().trim_end_matches(['\\', '/']).to_lowercase();
    let wanted = normalize(&dir);
    if current.split(PATH_SEPARATOR).any(|entry| normalize(entry) == wanted) {
        return None;
    }

    let current = current.trim_end_matches(PATH_SEPARATOR);
    if current.is_empty() {
        Some(dir.into_owned())
    } else {
        Some(format!("{current}{PATH_SEPARATOR}{dir}"))
    }
}

/// The environment variables (and search path entries) to persist.
#[derive(Debug, PartialEq)]
pub(crate) struct EnvironmentVariableSet {
    vars: Vec<(&'static str, PathBuf)>,
    path_entries: Vec<PathBuf>,
}

impl EnvironmentVariableSet {
    /// Derives the variables from the install root.
    pub(crate) fn derive(ctx: &InstallContext, config: &Config) -> Self {
        let java_home = ctx.install_dir().join(config.jdk.dir_name());
        let android_home = ctx.install_dir().join(ANDROID_SDK_DIR);

        Self {
            path_entries: vec![java_home.join("bin"), android_home.join(PLATFORM_TOOLS_DIR)],
            vars: vec![("JAVA_HOME", java_home), ("ANDROID_HOME", android_home.clone()), ("ANDROID_SDK_ROOT", android_home)],
        }
    }

    /// Returns the variables in the order they are persisted.
    pub(crate) fn vars(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        self.vars.iter().map(|(name, value)| (*name, value.as_path()))
    }

    /// Returns the directories to append to the search path.
    pub(crate) fn path_entries(&self) -> &[PathBuf] {
        &self.path_entries
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::cell::RefCell;
    use test_log::test;

    #[test]
    fn derive_variables() {
        let ctx = InstallContext::new("/opt/appium", "/work/project", "/tmp/x", "");
        let set = EnvironmentVariableSet::derive(&ctx, &Config::default());

        let vars: Vec<(&str, &Path)> = set.vars().collect();
        assert_eq!(
            vars,
            [
                ("JAVA_HOME", Path::new("/opt/appium/jdk-24.0.1")),
                ("ANDROID_HOME", Path::new("/opt/appium/android-sdk")),
                ("ANDROID_SDK_ROOT", Path::new("/opt/appium/android-sdk")),
            ]
        );
        assert_eq!(
            set.path_entries(),
            [PathBuf::from("/opt/appium/jdk-24.0.1/bin"), PathBuf::from("/opt/appium/android-sdk/platform-tools")]
        );
    }

    /// [`ProcessRunner`] that only records what would have been run.
    #[derive(Default)]
    struct SetxRecorder {
        commands: RefCell<Vec<CommandSpec>>,
    }

    impl ProcessRunner for SetxRecorder {
        fn locate(&self, _program: &std::ffi::OsStr, _search_path: &std::ffi::OsStr) -> Option<PathBuf> {
            None
        }

        fn status(&self, command: &CommandSpec) -> Result<(), ProcessError> {
            self.commands.borrow_mut().push(command.clone());
            Ok(())
        }

        fn output(&self, command: &CommandSpec) -> Result<String, ProcessError> {
            self.status(command).map(|()| String::new())
        }
    }

    /// [`UserPathStore`] kept in memory, remembering every write.
    #[derive(Default)]
    struct MemoryPathStore {
        value: RefCell<Option<String>>,
        stored: RefCell<Vec<String>>,
        broken: bool,
    }

    impl MemoryPathStore {
        fn with_value(value: &str) -> Self {
            Self {
                value: RefCell::new(Some(value.to_string())),
                ..Default::default()
            }
        }
    }

    impl UserPathStore for MemoryPathStore {
        fn load(&self) -> io::Result<Option<String>> {
            if self.broken {
                return Err(io::ErrorKind::PermissionDenied.into());
            }
            Ok(self.value.borrow().clone())
        }

        fn store(&self, path: &str) -> io::Result<()> {
            self.stored.borrow_mut().push(path.to_string());
            *self.value.borrow_mut() = Some(path.to_string());
            Ok(())
        }
    }

    #[test]
    fn appends_only_to_user_entries() {
        // the session PATH also holds machine entries, none of which may end up in the user's
        let runner = SetxRecorder::default();
        let store = MemoryPathStore::with_value(r"%USERPROFILE%\bin;C:\Users\me\AppData\Roaming\npm");
        let configurator = UserEnvConfigurator::new(&runner, &store);

        configurator.append_to_persistent_path(Path::new(r"C:\AppiumTools\jdk-24.0.1\bin")).unwrap();
        configurator.append_to_persistent_path(Path::new(r"C:\AppiumTools\android-sdk\platform-tools")).unwrap();

        assert_eq!(
            *store.stored.borrow(),
            [
                r"%USERPROFILE%\bin;C:\Users\me\AppData\Roaming\npm;C:\AppiumTools\jdk-24.0.1\bin",
                r"%USERPROFILE%\bin;C:\Users\me\AppData\Roaming\npm;C:\AppiumTools\jdk-24.0.1\bin;C:\AppiumTools\android-sdk\platform-tools",
            ]
        );
        assert!(runner.commands.borrow().is_empty());
    }

    #[test]
    fn present_entry_is_left_alone() {
        let runner = SetxRecorder::default();
        let store = MemoryPathStore::with_value(r"C:\Users\me\bin;c:\appiumtools\JDK-24.0.1\bin\;");
        let configurator = UserEnvConfigurator::new(&runner, &store);

        configurator.append_to_persistent_path(Path::new(r"C:\AppiumTools\jdk-24.0.1\bin")).unwrap();

        assert!(store.stored.borrow().is_empty());
        assert_eq!(store.value.borrow().as_deref(), Some(r"C:\Users\me\bin;c:\appiumtools\JDK-24.0.1\bin\;"));
    }

    #[test]
    fn missing_user_path_is_created() {
        let runner = SetxRecorder::default();
        let store = MemoryPathStore::default();
        let configurator = UserEnvConfigurator::new(&runner, &store);

        configurator.append_to_persistent_path(Path::new(r"C:\AppiumTools\jdk-24.0.1\bin")).unwrap();

        assert_eq!(*store.stored.borrow(), [r"C:\AppiumTools\jdk-24.0.1\bin"]);
    }

    #[test]
    fn unreadable_user_path_is_not_overwritten() {
        let runner = SetxRecorder::default();
        let store = MemoryPathStore {
            broken: true,
            ..Default::default()
        };
        let configurator = UserEnvConfigurator::new(&runner, &store);

        let err = configurator.append_to_persistent_path(Path::new(r"C:\AppiumTools\jdk-24.0.1\bin")).unwrap_err();

        assert!(matches!(err, EnvError::UserPath(_)));
        assert!(store.stored.borrow().is_empty());
        assert!(runner.commands.borrow().is_empty());
    }

    #[test]
    fn trailing_separator_is_not_doubled() {
        assert_eq!(append_entry(r"C:\a;", Path::new(r"C:\b")).as_deref(), Some(r"C:\a;C:\b"));
        assert_eq!(append_entry("", Path::new(r"C:\b")).as_deref(), Some(r"C:\b"));
        assert_eq!(append_entry(r"C:\a;C:\B\", Path::new(r"c:\b")), None);
    }

    #[test]
    fn set_persistent_uses_setx() {
        let runner = SetxRecorder::default();
        let store = MemoryPathStore::default();
        let configurator = UserEnvConfigurator::new(&runner, &store);
        configurator.set_persistent("JAVA_HOME", "/opt/jdk").unwrap();
        assert_eq!(*runner.commands.borrow(), [CommandSpec::new("setx").args(["JAVA_HOME", "/opt/jdk"])]);
        assert!(store.stored.borrow().is_empty());
    }
}
