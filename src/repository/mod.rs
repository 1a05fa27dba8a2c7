// src/repository/mod.rs

//! Recipe repository synchronization
//!
//! Each configured repository is a git working tree under
//! `repositories/<name>`. Synchronization is clone-if-missing, then
//! fetch, then verification (pinned commit hash, commit signature), and
//! only after verification does the working tree advance. Fetch is safe
//! before verification because it writes only remote-tracking refs and
//! the object database, never tracked files.

pub mod signer;
pub mod vcs;

pub use signer::{GpgCli, Signer};
pub use vcs::{GitCli, Vcs};

use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::layout::Layout;
use std::cell::Cell;
use std::path::Path;
use tracing::{debug, info, warn};

/// The set of configured repositories for one invocation. `ensure` is
/// memoized so repeated calls within a run do no redundant network work.
pub struct Repositories<'a> {
    layout: &'a Layout,
    repos: &'a [RepoConfig],
    vcs: &'a dyn Vcs,
    signer: &'a dyn Signer,
    ensured: Cell<bool>,
}

impl<'a> Repositories<'a> {
    pub fn new(
        layout: &'a Layout,
        repos: &'a [RepoConfig],
        vcs: &'a dyn Vcs,
        signer: &'a dyn Signer,
    ) -> Self {
        Self {
            layout,
            repos,
            vcs,
            signer,
            ensured: Cell::new(false),
        }
    }

    pub fn configured(&self) -> &[RepoConfig] {
        self.repos
    }

    /// Synchronize every configured repository. A no-op after the first
    /// successful call on this instance.
    pub fn ensure(&self, force: bool) -> Result<()> {
        if self.ensured.get() {
            debug!("repositories already synchronized this run");
            return Ok(());
        }
        std::fs::create_dir_all(self.layout.repositories_dir())?;
        for repo in self.repos {
            self.sync_repo(repo, force)?;
        }
        self.ensured.set(true);
        Ok(())
    }

    /// Clone/fetch/verify/advance one repository. Order is load-bearing:
    /// the working tree is never mutated before verification passes.
    fn sync_repo(&self, repo: &RepoConfig, force: bool) -> Result<()> {
        let dir = self.layout.repository_dir(&repo.name);

        if !dir.exists() {
            info!("cloning repository {} from {}", repo.name, repo.url);
            self.vcs
                .clone_repo(&repo.url, repo.reference.as_deref(), &dir)?;
        }

        self.vcs.fetch(&dir)?;

        let refspec = match &repo.reference {
            Some(reference) => format!("origin/{reference}"),
            None => "FETCH_HEAD".to_string(),
        };
        let target = self.vcs.rev_parse(&dir, &refspec)?;
        debug!("repository {} resolved {refspec} to {target}", repo.name);

        if let Some(pin) = &repo.pin {
            if !target.starts_with(pin.as_str()) {
                return Err(Error::HashMismatch {
                    subject: format!("repository '{}'", repo.name),
                    expected: pin.clone(),
                    actual: target,
                });
            }
        }

        if let Some(key) = &repo.trusted_key {
            self.verify_signature(repo, &dir, &target, key)?;
        }

        if force {
            info!("resetting repository {} to {target}", repo.name);
            self.vcs.hard_reset(&dir, &target)?;
        } else {
            self.vcs.fast_forward(&dir, &target).map_err(|e| {
                warn!("fast-forward of {} failed: {e}", repo.name);
                Error::DivergedHistory(repo.name.clone())
            })?;
        }

        info!("repository {} synchronized at {target}", repo.name);
        Ok(())
    }

    /// Require `target` to be signed by the repository's trusted key.
    /// The key is imported into a keyring directory created fresh per
    /// call and removed on every exit path.
    fn verify_signature(
        &self,
        repo: &RepoConfig,
        dir: &Path,
        target: &str,
        key_rel: &str,
    ) -> Result<()> {
        let failed = |reason: String| Error::SignatureFailed {
            repo: repo.name.clone(),
            reason,
        };

        // Dropped (and deleted) on all exit paths.
        let keyring = tempfile::Builder::new()
            .prefix("blink-keyring-")
            .tempdir()?;

        let key_path = dir.join(key_rel.trim_start_matches('/'));
        self.signer
            .import_key(keyring.path(), &key_path)
            .map_err(|e| failed(format!("key import: {e}")))?;

        let fingerprint = self
            .signer
            .fingerprint(keyring.path())
            .map_err(|e| failed(format!("fingerprint: {e}")))?;

        let raw = self
            .vcs
            .verify_commit_raw(dir, target, keyring.path())
            .map_err(|e| failed(format!("verification: {e}")))?;

        if !raw.contains(&fingerprint) {
            return Err(failed(format!(
                "commit {target} is not signed by the trusted key {fingerprint}"
            )));
        }

        debug!("commit {target} verified against {fingerprint}");
        Ok(())
    }
}
