// src/manifest.rs

//! Installed-package manifest
//!
//! `etc/manifest.toml` is the authoritative record of what is installed:
//! a top-level `installed` array of `{name, version, release}` tables,
//! names unique. Every write goes through an atomic
//! write-to-temp-then-rename, so a crash mid-write leaves either the
//! previous snapshot or the new one on disk, never a torn file.

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::recipe::PackageInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// One installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPkg {
    pub name: String,
    pub version: String,
    pub release: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    installed: Vec<InstalledPkg>,
}

/// Reader/writer for the manifest; the sole component allowed to touch it
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(layout: &Layout) -> Self {
        Self {
            path: layout.manifest_file(),
        }
    }

    /// Create an empty manifest file if none exists.
    pub fn ensure(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.save(&[])
    }

    /// All installed packages, in recorded order. A missing file reads
    /// as empty.
    pub fn load(&self) -> Result<Vec<InstalledPkg>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        let file: ManifestFile = toml::from_str(&text)
            .map_err(|e| Error::ManifestMalformed(format!("{}: {e}", self.path.display())))?;
        Ok(file.installed)
    }

    /// Look up one entry by package name.
    pub fn has(&self, name: &str) -> Result<Option<InstalledPkg>> {
        Ok(self.load()?.into_iter().find(|p| p.name == name))
    }

    pub fn is_installed(&self, name: &str) -> Result<bool> {
        Ok(self.has(name)?.is_some())
    }

    /// Record an install. Warns and leaves the manifest untouched when
    /// the package is already present; never inserts a duplicate name.
    pub fn add(&self, pkg: &PackageInfo) -> Result<()> {
        let mut installed = self.load()?;
        if installed.iter().any(|p| p.name == pkg.name) {
            warn!("{} already recorded in manifest", pkg.name);
            return Ok(());
        }
        installed.push(InstalledPkg {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
            release: pkg.release,
        });
        info!("recording {} {} in manifest", pkg.name, pkg.version);
        self.save(&installed)
    }

    /// Remove a package's entry. Warns and leaves the manifest untouched
    /// when the package is absent.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut installed = self.load()?;
        let before = installed.len();
        installed.retain(|p| p.name != name);
        if installed.len() == before {
            warn!("{name} not recorded in manifest, nothing to remove");
            return Ok(());
        }
        info!("removing {name} from manifest");
        self.save(&installed)
    }

    /// Atomic write: serialize to `<path>.tmp`, then rename over the
    /// manifest.
    fn save(&self, installed: &[InstalledPkg]) -> Result<()> {
        let file = ManifestFile {
            installed: installed.to_vec(),
        };
        let text = toml::to_string_pretty(&file)
            .map_err(|e| Error::ManifestMalformed(e.to_string()))?;

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!("manifest saved ({} packages)", installed.len());
        Ok(())
    }
}
