//! Asset provisioning from a remote blob store.
//!
//! Model weights and the label file are looked up in a local directory and
//! fetched over HTTP on first need. Downloads land in a temporary file in the
//! same directory and are renamed into place, so a partial download never
//! masquerades as a complete asset. An optional SHA-256 pin is checked for
//! both fresh and pre-existing files.

use std::{
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while making an asset available locally.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("asset name {name:?} must be a plain file name")]
    InvalidName { name: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("asset at {path} expected SHA-256 {expected} but found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// A named asset with an optional pinned digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    /// File name, both locally and under the remote base.
    pub name: String,
    /// Expected SHA-256 as hexadecimal, case-insensitive.
    pub sha256: Option<String>,
}

impl AssetSpec {
    /// An unpinned asset.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sha256: None,
        }
    }

    /// Pin the asset to `sha256`.
    #[must_use]
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

/// Ensures assets exist in a local directory, downloading them when absent.
#[derive(Debug, Clone)]
pub struct AssetProvisioner {
    client: Client,
    remote_base: String,
    local_dir: PathBuf,
}

impl AssetProvisioner {
    /// Create a provisioner for `remote_base` that stores files in `local_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Client`] when the HTTP client cannot be
    /// built.
    pub fn new(
        remote_base: impl Into<String>,
        local_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, ProvisioningError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProvisioningError::Client)?;
        Ok(Self {
            client,
            remote_base: remote_base.into(),
            local_dir: local_dir.into(),
        })
    }

    /// Directory assets are stored in.
    #[must_use]
    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// Local path an asset is, or will be, stored at.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidName`] for names containing path
    /// components.
    pub fn local_path(&self, name: &str) -> Result<PathBuf, ProvisioningError> {
        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if is_plain {
            Ok(self.local_dir.join(name))
        } else {
            Err(ProvisioningError::InvalidName {
                name: name.to_owned(),
            })
        }
    }

    /// Remote URL for an asset.
    #[must_use]
    pub fn remote_url(&self, name: &str) -> String {
        format!("{}/{name}", self.remote_base.trim_end_matches('/'))
    }

    /// Make `asset` available locally and return its path.
    ///
    /// Existing files are reused without any network traffic.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisioningError`] when the download fails, the server
    /// answers with a non-success status, the file cannot be written, or the
    /// pinned checksum does not match.
    pub fn ensure(&self, asset: &AssetSpec) -> Result<PathBuf, ProvisioningError> {
        let path = self.local_path(&asset.name)?;
        if path.is_file() {
            info!(path = %path.display(), "found asset");
        } else {
            self.download(&asset.name, &path)?;
        }
        if let Some(expected) = &asset.sha256 {
            verify_sha256(&path, expected)?;
        }
        Ok(path)
    }

    fn download(&self, name: &str, path: &Path) -> Result<(), ProvisioningError> {
        let url = self.remote_url(name);
        info!(%url, "fetching asset");
        let response =
            self.client
                .get(&url)
                .send()
                .map_err(|source| ProvisioningError::Request {
                    url: url.clone(),
                    source,
                })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProvisioningError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .map_err(|source| ProvisioningError::Request {
                url: url.clone(),
                source,
            })?;

        let io_err = |source| ProvisioningError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.local_dir).map_err(io_err)?;
        let mut staged = NamedTempFile::new_in(&self.local_dir).map_err(io_err)?;
        staged.write_all(&body).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(path).map_err(|err| io_err(err.error))?;
        debug!(bytes = body.len(), path = %path.display(), "wrote asset");
        Ok(())
    }
}

/// Check the file at `path` against an expected SHA-256.
///
/// # Errors
///
/// Returns [`ProvisioningError::ChecksumMismatch`] on a different digest and
/// propagates I/O errors while reading the file.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<(), ProvisioningError> {
    let actual = compute_sha256(path)?;
    let expected = normalise_hex(expected);
    if actual == expected {
        Ok(())
    } else {
        Err(ProvisioningError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        })
    }
}

/// Computes the SHA-256 digest of the file at `path` as lowercase hex.
///
/// # Errors
///
/// Returns I/O errors from opening or reading the file.
pub fn compute_sha256(path: &Path) -> Result<String, ProvisioningError> {
    let io_err = |source| ProvisioningError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = reader.read(&mut buffer).map_err(io_err)?;
        if read == 0 {
            break;
        }
        let chunk = buffer.get(..read).ok_or_else(|| {
            io_err(std::io::Error::other(
                "read reported bytes beyond buffer length",
            ))
        })?;
        hasher.update(chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn normalise_hex(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
