// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are JSON files authored upstream that describe where a
//! package's source lives, how to build it, and what it depends on.
//! Unknown fields are ignored; missing collections default to empty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build kind for packages compiled from source
pub const KIND_TO_COMPILE: &str = "toCompile";
/// Build kind for pre-built archives deployed into the filesystem
pub const KIND_PRE_COMPILED: &str = "preCompiled";

/// A complete package recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package name
    pub name: String,

    /// Version string (informational; updates compare `release`)
    pub version: String,

    /// Monotonically increasing release counter
    pub release: i64,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub license: String,

    /// Where the source archive lives and how to verify it
    pub source: SourceInfo,

    /// Mandatory dependencies, name to version hint. Resolution is by
    /// name only; the hint is informational.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Optional-dependency groups, presented interactively at install
    #[serde(default, rename = "opt_dependencies")]
    pub opt_dependencies: Vec<OptGroup>,

    /// Build instructions
    pub build: BuildInfo,
}

impl PackageInfo {
    /// Metadata block printed by `search`
    pub fn print_metadata(&self, repo_name: &str, repo_url: &str) {
        println!();
        println!("Repository: {repo_name} ({repo_url})");
        println!();
        println!("Name: {}", self.name);
        println!("Version: {} (release {})", self.version, self.release);
        println!("Description: {}", self.description);
        println!("Author: {}", self.author);
        println!("License: {}", self.license);
    }
}

/// Source archive location and integrity data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Download URL; the basename is the cached archive file name
    pub url: String,

    /// Archive type tag (informational; dispatch is by URL suffix)
    #[serde(default, rename = "type")]
    pub archive_type: String,

    /// Expected SHA-256 of the archive, hex, case-insensitive
    pub sha256: String,
}

/// One optional-dependency group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptGroup {
    pub id: i64,

    #[serde(default)]
    pub description: String,

    /// Option package names, in presentation order
    #[serde(default)]
    pub options: Vec<String>,

    /// Default option name (informational)
    #[serde(default, rename = "default")]
    pub default_option: String,
}

/// Build instructions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    /// `toCompile` or `preCompiled`; anything else is rejected at
    /// install time, not at decode time
    pub kind: String,

    /// Environment overrides exported before running build commands
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Commands run before `install` for source builds
    #[serde(default)]
    pub prepare: Vec<String>,

    /// Commands that perform the installation
    #[serde(default)]
    pub install: Vec<String>,

    /// Commands that undo the installation
    #[serde(default)]
    pub uninstall: Vec<String>,
}
