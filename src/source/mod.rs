// src/source/mod.rs

//! Source acquisition
//!
//! Downloads source archives into `sources/`, verifies their SHA-256
//! digest against the recipe, and extracts them. Verification always
//! precedes extraction; extraction always precedes any build command.

pub mod archive;

pub use archive::{post_extract_dir, safe_extract, Archiver, SystemArchiver};

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::recipe::PackageInfo;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for a single HTTP download
const HTTP_TIMEOUT: Duration = Duration::from_secs(600);

/// Downloader/verifier/extractor for one invocation
pub struct SourceAcquirer<'a> {
    layout: &'a Layout,
    archiver: &'a dyn Archiver,
}

impl<'a> SourceAcquirer<'a> {
    pub fn new(layout: &'a Layout, archiver: &'a dyn Archiver) -> Self {
        Self { layout, archiver }
    }

    /// Path the archive for `url` is cached at.
    pub fn source_path(&self, url: &str) -> PathBuf {
        let basename = url.rsplit('/').next().unwrap_or(url);
        self.layout.sources_dir().join(basename)
    }

    /// Download the archive unless it is already present (or `force`).
    /// Any HTTP status other than 200 is `DownloadFailed`.
    pub fn fetch_source(&self, url: &str, force: bool) -> Result<PathBuf> {
        let dest = self.source_path(url);
        if dest.exists() && !force {
            warn!(
                "source already exists at {}, skipping download (use --force to re-download)",
                dest.display()
            );
            return Ok(dest);
        }

        info!("downloading {url}");
        std::fs::create_dir_all(self.layout.sources_dir())?;

        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let mut response = client.get(url).send().map_err(|e| Error::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::DownloadFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let mut file = File::create(&dest)?;
        io::copy(&mut response, &mut file)?;
        debug!("saved source to {}", dest.display());
        Ok(dest)
    }

    /// Recompute the file's SHA-256 and compare case-insensitively.
    pub fn verify(&self, expected_sha256: &str, file: &Path) -> Result<()> {
        let mut reader = File::open(file)?;
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher)?;
        let actual = format!("{:x}", hasher.finalize());

        if !actual.eq_ignore_ascii_case(expected_sha256) {
            return Err(Error::HashMismatch {
                subject: file.display().to_string(),
                expected: expected_sha256.to_lowercase(),
                actual,
            });
        }
        debug!("digest verified for {}", file.display());
        Ok(())
    }

    /// Extract the package's cached source archive into `dest`.
    pub fn decompress(&self, pkg: &PackageInfo, dest: &Path) -> Result<()> {
        let archive = self.source_path(&pkg.source.url);
        if !archive.exists() {
            return Err(Error::DownloadFailed {
                url: pkg.source.url.clone(),
                reason: format!("source archive not found at {}", archive.display()),
            });
        }
        info!("extracting {} into {}", archive.display(), dest.display());
        self.archiver.extract(&archive, dest)
    }

    /// Traversal-checked extraction for pre-compiled packages.
    pub fn safe_extract_to_root(&self, pkg: &PackageInfo, extract_root: &Path) -> Result<()> {
        let archive = self.source_path(&pkg.source.url);
        safe_extract(self.archiver, &archive, extract_root)
    }
}
