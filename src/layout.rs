// src/layout.rs

//! On-disk path layout
//!
//! All paths blink touches are derived from a single root directory,
//! `/` by default. Everything lives under `<root>/var/blink/`:
//!
//! ```text
//! etc/config.toml    repository configuration
//! etc/blink.lock     exclusion lock
//! etc/manifest.toml  installed-package manifest
//! repositories/      synchronized recipe repositories
//! recipes/           local recipe cache
//! sources/           downloaded source archives
//! build/             per-package build trees
//! ```
//!
//! The layout is a value constructed once in the entry point and passed
//! by shared reference into every component; no global path state.

use crate::error::Result;
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

/// Directory mode for everything blink creates under its root.
const DIR_MODE: u32 = 0o750;

/// Resolved path layout for one invocation
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    base: PathBuf,
    recipes_override: Option<PathBuf>,
}

impl Layout {
    /// Build a layout from a root directory. An empty root means `/`.
    /// The root is normalized to an absolute path.
    pub fn new(root: &str) -> Result<Self> {
        let root = if root.is_empty() {
            PathBuf::from("/")
        } else {
            std::path::absolute(root)?
        };
        let base = root.join("var").join("blink");
        Ok(Self {
            root,
            base,
            recipes_override: None,
        })
    }

    /// Point the recipe cache somewhere else (the `-p` flag).
    pub fn override_recipes_dir(&mut self, dir: &str) -> Result<()> {
        self.recipes_override = Some(std::path::absolute(dir)?);
        Ok(())
    }

    /// The installation root (target of pre-compiled file deployment)
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/var/blink`
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("etc").join("config.toml")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.base.join("etc").join("blink.lock")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.base.join("etc").join("manifest.toml")
    }

    pub fn repositories_dir(&self) -> PathBuf {
        self.base.join("repositories")
    }

    /// Working tree of one synchronized repository
    pub fn repository_dir(&self, name: &str) -> PathBuf {
        self.repositories_dir().join(name)
    }

    pub fn recipes_dir(&self) -> PathBuf {
        match &self.recipes_override {
            Some(dir) => dir.clone(),
            None => self.base.join("recipes"),
        }
    }

    /// Cached recipe file for a package
    pub fn recipe_file(&self, package: &str) -> PathBuf {
        self.recipes_dir().join(format!("{package}.json"))
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.base.join("sources")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.base.join("build")
    }

    /// Per-package build tree
    pub fn package_build_dir(&self, package: &str) -> PathBuf {
        self.build_dir().join(package)
    }

    /// Create every required subtree with mode 0750. Must run before any
    /// other component touches the layout.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.base.join("etc"),
            self.repositories_dir(),
            self.recipes_dir(),
            self.sources_dir(),
            self.build_dir(),
        ] {
            create_dir_restricted(&dir)?;
        }
        Ok(())
    }
}

/// `mkdir -p` with mode 0750 on every directory created
pub fn create_dir_restricted(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true).mode(DIR_MODE);
    builder.create(dir)?;
    Ok(())
}
