//! Version.
//!
//! This module contains the version information.

use std::fmt;

/// Structure to hold the version information.
#[derive(Debug)]
pub(crate) struct Version {
    /// The name of the package.
    pub(crate) pkg_name: String,
    /// The version of the package.
    pub(crate) pkg_version: String,
    /// The operating system the binary was built for.
    pub(crate) target_os: String,
    /// The architecture the binary was built for.
    pub(crate) target_arch: String,
}

impl Default for Version {
    fn default() -> Self {
        let pkg_name = env!("CARGO_PKG_NAME");
        let pkg_version = env!("CARGO_PKG_VERSION");

        Self {
            pkg_name: pkg_name.to_string(),
            pkg_version: pkg_version.to_string(),
            target_os: std::env::consts::OS.to_string(),
            target_arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Display this Version.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from(self))
    }
}

/// String conversion.
impl From<&Version> for String {
    fn from(value: &Version) -> String {
        let pkg_name = &value.pkg_name;
        let pkg_version = &value.pkg_version;
        let target_os = &value.target_os;
        let target_arch = &value.target_arch;
        format!("{pkg_name} {pkg_version} ({target_os}/{target_arch})")
    }
}
