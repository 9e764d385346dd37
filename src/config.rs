//! Configuration.
//!
//! This module contains the configuration read from an (optional) YAML file. Every key has a
//! built-in default, so the installer works without any configuration file at all.

use crate::vars::VarExpander;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, instrument};

/// Name of the default configuration file.
pub(crate) const CONFIG_FILENAME: &str = "appium-installer.yml";

/// Default install root.
pub(crate) const DEFAULT_INSTALL_DIR: &str = r"C:\AppiumTools";

/// Default project directory.
pub(crate) const DEFAULT_PROJECT_DIR: &str = r"C:\AppiumProject";

/// The struct that holds the configuration loaded from a YAML file.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// The JavaScript runtime (Node.js).
    pub(crate) runtime: RuntimeConfig,
    /// The JDK.
    pub(crate) jdk: JdkConfig,
    /// The android platform tools.
    #[serde(rename = "platform-tools")]
    pub(crate) platform_tools: PlatformToolsConfig,
    /// The package manager used to install the server, the driver and the project dependencies.
    #[serde(rename = "package-manager")]
    pub(crate) package_manager: String,
    /// The automation server.
    pub(crate) server: ServerConfig,
    /// The automation driver.
    pub(crate) driver: DriverConfig,
}

impl Config {
    /// Loads the configuration from the given filename.
    #[instrument(err, level = "trace")]
    pub(crate) fn load_from_file<P>(filename: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path> + std::fmt::Debug,
    {
        let config_file = File::open(filename)?;

        let de = serde_yaml::Deserializer::from_reader(config_file);
        let value = serde_yaml::Value::deserialize(de)?;
        // an empty file yields null
        if value.is_null() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_value(value)?;

        Ok(config)
    }
}

/// A remote artifact.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Artifact {
    /// Where to download the artifact from.
    pub(crate) url: String,
    /// The expected SHA-256 checksum (hex) of the artifact, if known.
    #[serde(default)]
    pub(crate) sha256: Option<String>,
}

impl Artifact {
    fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            sha256: None,
        }
    }
}

/// The configuration for the runtime.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RuntimeConfig {
    /// The installer package.
    pub(crate) installer: Artifact,
    /// The name of the runtime executable.
    pub(crate) command: String,
    /// Where the installer puts the runtime.
    pub(crate) home: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            installer: Artifact::from_url("https://nodejs.org/dist/v22.16.0/node-v22.16.0-x64.msi"),
            command: "node".to_string(),
            home: r"C:\Program Files\nodejs".to_string(),
        }
    }
}

/// The configuration for the JDK.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct JdkConfig {
    /// The JDK archive.
    pub(crate) archive: Artifact,
    /// The version of the JDK, the archive unpacks to `jdk-<version>`.
    pub(crate) version: String,
}

impl JdkConfig {
    /// Returns the name of the directory the archive unpacks to.
    pub(crate) fn dir_name(&self) -> String {
        format!("jdk-{}", self.version)
    }
}

impl Default for JdkConfig {
    fn default() -> Self {
        Self {
            archive: Artifact::from_url("https://download.java.net/java/GA/jdk24.0.1/24a58e0e276943138bf3e963e6291ac2/9/GPL/openjdk-24.0.1_windows-x64_bin.zip"),
            version: "24.0.1".to_string(),
        }
    }
}

/// The configuration for the android platform tools.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlatformToolsConfig {
    /// The platform tools archive.
    pub(crate) archive: Artifact,
}

impl Default for PlatformToolsConfig {
    fn default() -> Self {
        Self {
            archive: Artifact::from_url("https://dl.google.com/android/repository/platform-tools-latest-windows.zip"),
        }
    }
}

/// The configuration for the automation server.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    /// The package to install globally.
    pub(crate) package: String,
    /// The name of the server executable.
    pub(crate) command: String,
    /// Well-known locations of the server executable, probed in order. `${env.NAME}` is expanded.
    pub(crate) locations: Vec<String>,
}

impl ServerConfig {
    /// Returns the locations with all variables expanded; locations that fail to expand are left out.
    pub(crate) fn expanded_locations(&self, expander: &VarExpander) -> Vec<String> {
        self.locations
            .iter()
            .filter_map(|location| match expander.expand(location) {
                Ok(location) => Some(location.into_owned()),
                Err(err) => {
                    debug!(%err, %location, "skipping location");
                    None
                }
            })
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            package: "appium".to_string(),
            command: "appium".to_string(),
            locations: vec![
                "appium".to_string(),
                r"C:\Users\${env.USERNAME}\AppData\Roaming\npm\appium.cmd".to_string(),
                r"C:\Program Files\nodejs\appium.cmd".to_string(),
            ],
        }
    }
}

/// The configuration for the automation driver.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DriverConfig {
    /// The package to install globally.
    pub(crate) package: String,
    /// The name of the driver as known by the server.
    pub(crate) name: String,
    /// The name of the driver shown to the operator.
    pub(crate) title: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            package: "appium-uiautomator2-driver".to_string(),
            name: "uiautomator2".to_string(),
            title: "UiAutomator2".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            jdk: JdkConfig::default(),
            platform_tools: PlatformToolsConfig::default(),
            package_manager: "npm".to_string(),
            server: ServerConfig::default(),
            driver: DriverConfig::default(),
        }
    }
}
