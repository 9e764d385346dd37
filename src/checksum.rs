//! Checksum.
//!
//! This module contains code to compute the SHA-256 digest of downloaded artifacts, either of a file
//! on disc or "on the fly" while the download is written.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Result as IoResult, Write};
use std::path::Path;

// Calculates the checksum (SHA-256, lower-case hex) for the given file.
pub(crate) fn file_checksum(path: &Path) -> IoResult<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;

    Ok(base16ct::lower::encode_string(&hasher.finalize()))
}

/// Compares an expected checksum (as configured, any case) with a calculated one.
pub(crate) fn matches(expected: &str, calculated: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(calculated)
}

/// Writer that forwards to another writer and hashes everything written.
pub(crate) struct HashingWrite<W> {
    hasher: Sha256,
    inner: W,
    len: u64,
}

impl<W: Write> HashingWrite<W> {
    /// Creates a new `HashingWrite` on top of the given [Write].
    pub(crate) fn new(inner: W) -> Self {
        Self {
            hasher: Sha256::new(),
            inner,
            len: 0,
        }
    }

    /// Flushes the inner writer and returns the number of bytes and the checksum.
    pub(crate) fn finish(mut self) -> IoResult<(u64, String)> {
        self.inner.flush()?;
        let checksum = base16ct::lower::encode_string(&self.hasher.finalize());

        Ok((self.len, checksum))
    }
}

impl<W: Write> Write for HashingWrite<W> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;

        Ok(n)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.inner.flush()
    }
}
