// src/config.rs

//! Repository configuration
//!
//! `etc/config.toml` holds one table per recipe repository; the table key
//! is the repository name. Recognized keys: `git_url` (required),
//! `branch`, `hash` (commit pin, prefix allowed) and `trustedKey` (path of
//! the signing public key, relative to the repository root).
//!
//! A missing file is created with a default pointing at the upstream
//! recipe repository. The configuration is loaded at the start of every
//! mutating command and immutable within a run.

use crate::error::{Error, Result};
use crate::layout::Layout;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Default configuration written on first run
const DEFAULT_CONFIG: &str = r#"# blink repository configuration.
# One table per repository; the table key is the repository name.
#
#   git_url    - remote URL of the recipe repository (required)
#   branch     - branch or tag to track (optional)
#   hash       - pinned commit hash, full or prefix (optional)
#   trustedKey - path of the signing public key, relative to the
#                repository root (optional)

[pseudoRepository]
git_url = "https://github.com/Aperture-OS/testing-blink-repo.git"
branch = "main"
"#;

/// One configured recipe repository
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Unique name; doubles as the working-tree directory name
    pub name: String,
    /// Remote URL
    pub url: String,
    /// Branch or tag to track; `None` tracks the remote default
    pub reference: Option<String>,
    /// Pinned commit hash the synchronized head must start with
    pub pin: Option<String>,
    /// Path of the trusted signing key, relative to the repository root
    pub trusted_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    git_url: String,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default, rename = "trustedKey", alias = "trusted_key")]
    trusted_key: Option<String>,
}

/// Create the default configuration file if none exists.
pub fn ensure_config(layout: &Layout) -> Result<()> {
    let path = layout.config_file();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, DEFAULT_CONFIG)?;
    info!("created default repository config at {}", path.display());
    Ok(())
}

/// Load the repository configuration. The file must exist (run
/// [`ensure_config`] first); decoding problems and an empty repository
/// set are `ConfigMalformed`.
pub fn load_config(layout: &Layout) -> Result<Vec<RepoConfig>> {
    let path = layout.config_file();
    if !path.exists() {
        return Err(Error::ConfigMissing(path));
    }
    parse_config(&path)
}

fn parse_config(path: &Path) -> Result<Vec<RepoConfig>> {
    let text = fs::read_to_string(path)?;

    // BTreeMap keeps repository iteration deterministic.
    let raw: BTreeMap<String, RawRepo> = toml::from_str(&text)
        .map_err(|e| Error::ConfigMalformed(format!("{}: {e}", path.display())))?;

    if raw.is_empty() {
        return Err(Error::ConfigMalformed(format!(
            "no repositories defined in {}",
            path.display()
        )));
    }

    let repos = raw
        .into_iter()
        .map(|(name, r)| RepoConfig {
            name,
            url: r.git_url,
            reference: r.branch,
            pin: r.hash,
            trusted_key: r.trusted_key,
        })
        .collect::<Vec<_>>();

    info!("loaded {} repositories from {}", repos.len(), path.display());
    Ok(repos)
}
