//! Artifact fetcher.
//!
//! This module contains the code to download an artifact and to expand a zip archive.

use crate::checksum::{self, HashingWrite};
use crate::config::Artifact;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{instrument, trace, warn};

/// The error type for fetching and expanding artifacts.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FetchError {
    /// The HTTP request failed.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The downloaded content does not match the configured checksum.
    #[error("hashes differ (expected: {expected}, got: {calculated})")]
    ChecksumMismatch { expected: String, calculated: String },
    /// The archive could not be read.
    #[error("invalid archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    /// Some other I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Trait for things that provide artifacts on the local disc.
pub(crate) trait ArtifactFetcher {
    /// Downloads the given artifact to `dest`.
    fn fetch(&self, artifact: &Artifact, dest: &Path) -> Result<(), FetchError>;

    /// Expands the given zip archive into the directory `dest`.
    fn expand(&self, archive: &Path, dest: &Path) -> Result<(), FetchError>;
}

/// [`ArtifactFetcher`] implementation using a blocking HTTP client.
#[derive(Debug)]
pub(crate) struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher`.
    pub(crate) fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            // the JDK is a large file, so no overall timeout
            .timeout(Option::<Duration>::None)
            .build()?;

        Ok(Self { client })
    }

    // Downloads the artifact, hashing on the fly.
    fn download(&self, artifact: &Artifact, dest: &Path) -> Result<(), FetchError> {
        let http = |source| FetchError::Http {
            url: artifact.url.clone(),
            source,
        };

        // make request
        let mut response = self
            .client
            .get(&artifact.url) //
            .header(reqwest::header::ACCEPT, "application/octet-stream") //
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(http)?;

        // download file
        let dest_file = File::create(dest)?;
        let mut write = HashingWrite::new(BufWriter::new(dest_file));
        response.copy_to(&mut write).map_err(http)?;
        let (bytes_written, calculated) = write.finish()?;
        trace!(bytes_written, %calculated);

        // verify checksum
        if let Some(expected) = artifact.sha256.as_deref() {
            if !checksum::matches(expected, &calculated) {
                return Err(FetchError::ChecksumMismatch {
                    expected: expected.to_string(),
                    calculated,
                });
            }
        }

        Ok(())
    }
}

impl ArtifactFetcher for HttpFetcher {
    #[instrument(level = "trace", skip(self, artifact), fields(url = %artifact.url))]
    fn fetch(&self, artifact: &Artifact, dest: &Path) -> Result<(), FetchError> {
        // check if already downloaded (e.g. by a previous, failed run)
        if let Some(expected) = artifact.sha256.as_deref() {
            if dest.is_file() && checksum::matches(expected, &checksum::file_checksum(dest)?) {
                trace!(dest = %dest.display(), "no download necessary");
                return Ok(());
            }
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let result = self.download(artifact, dest);
        if result.is_err() && dest.exists() {
            if let Err(err) = fs::remove_file(dest) {
                warn!(?err, dest = %dest.display(), "failed to delete partial download");
            }
        }

        result
    }

    fn expand(&self, archive: &Path, dest: &Path) -> Result<(), FetchError> {
        expand_zip(archive, dest)
    }
}

/// Expands the zip archive at `archive` into the directory `dest`, keeping relative paths and modes.
#[instrument(level = "trace")]
pub(crate) fn expand_zip(archive: &Path, dest: &Path) -> Result<(), FetchError> {
    let zip_error = |source| FetchError::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;
    fs::create_dir_all(dest)?;

    // directory modes are applied last, a read-only directory would reject its children
    let mut dir_modes = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_error)?;
        let Some(name) = entry.enclosed_name() else {
            warn!(name = entry.name(), "skipping dangerous name");
            continue;
        };

        let path = dest.join(name);
        trace!("unpacking {path:?}");

        if entry.is_dir() {
            fs::create_dir_all(&path)?;
            if let Some(mode) = entry.unix_mode() {
                dir_modes.push((path, mode));
            }
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&path)?;
        io::copy(&mut entry, &mut outfile)?;
        drop(outfile);

        if let Some(mode) = entry.unix_mode() {
            apply_mode(&path, mode)?;
        }
    }

    // deepest directories first
    dir_modes.sort_by(|(a, _), (b, _)| b.components().count().cmp(&a.components().count()));
    for (path, mode) in dir_modes {
        apply_mode(&path, mode)?;
    }

    Ok(())
}

// Applies the permission bits of a unix mode.
#[cfg(unix)]
#[doc(hidden)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

// Modes recorded in the archive carry no meaning on this platform.
#[cfg(not(unix))]
#[doc(hidden)]
fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
