// src/repository/vcs.rs

//! Version-control capability
//!
//! Repository synchronization talks to the version-control tool through
//! the [`Vcs`] trait so tests can swap in a fake. The production
//! implementation shells out to `git` with a deadline on every
//! operation.

use crate::error::Result;
use crate::shell::run_tool;
use std::path::Path;
use std::time::Duration;

/// Deadline for any single repository operation.
pub const VCS_TIMEOUT: Duration = Duration::from_secs(600);

/// Operations the synchronizer needs from the version-control tool
pub trait Vcs {
    /// Clone `url` into `dest`, at `reference` when given.
    fn clone_repo(&self, url: &str, reference: Option<&str>, dest: &Path) -> Result<()>;

    /// Fetch all branches and tags, pruning removed refs. Must not touch
    /// the working tree.
    fn fetch(&self, repo: &Path) -> Result<()>;

    /// Resolve a refspec to a full commit hash.
    fn rev_parse(&self, repo: &Path, refspec: &str) -> Result<String>;

    /// Hard-reset the working tree to a verified commit.
    fn hard_reset(&self, repo: &Path, commit: &str) -> Result<()>;

    /// Fast-forward-only merge to a verified commit.
    fn fast_forward(&self, repo: &Path, commit: &str) -> Result<()>;

    /// Signature-verify a commit with the given keyring home, returning
    /// the verifier's raw status output.
    fn verify_commit_raw(&self, repo: &Path, commit: &str, gnupg_home: &Path) -> Result<String>;
}

/// Production implementation shelling out to `git`
#[derive(Debug, Default)]
pub struct GitCli;

impl Vcs for GitCli {
    fn clone_repo(&self, url: &str, reference: Option<&str>, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        let mut args = vec!["clone"];
        if let Some(reference) = reference {
            args.extend(["-b", reference]);
        }
        args.extend([url, dest.as_ref()]);
        run_tool("git", &args, None, &[], Some(VCS_TIMEOUT))?;
        Ok(())
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        run_tool(
            "git",
            &["fetch", "--all", "--tags", "--prune"],
            Some(repo),
            &[],
            Some(VCS_TIMEOUT),
        )?;
        Ok(())
    }

    fn rev_parse(&self, repo: &Path, refspec: &str) -> Result<String> {
        let out = run_tool(
            "git",
            &["rev-parse", refspec],
            Some(repo),
            &[],
            Some(VCS_TIMEOUT),
        )?;
        Ok(out.stdout.trim().to_string())
    }

    fn hard_reset(&self, repo: &Path, commit: &str) -> Result<()> {
        run_tool(
            "git",
            &["reset", "--hard", commit],
            Some(repo),
            &[],
            Some(VCS_TIMEOUT),
        )?;
        Ok(())
    }

    fn fast_forward(&self, repo: &Path, commit: &str) -> Result<()> {
        run_tool(
            "git",
            &["merge", "--ff-only", commit],
            Some(repo),
            &[],
            Some(VCS_TIMEOUT),
        )?;
        Ok(())
    }

    fn verify_commit_raw(&self, repo: &Path, commit: &str, gnupg_home: &Path) -> Result<String> {
        let home = gnupg_home.to_string_lossy();
        // The verifier writes its status records to stderr; return both
        // streams so the caller can scan for the fingerprint.
        let out = run_tool(
            "git",
            &["verify-commit", "--raw", commit],
            Some(repo),
            &[("GNUPGHOME", home.as_ref())],
            Some(VCS_TIMEOUT),
        )?;
        Ok(format!("{}{}", out.stdout, out.stderr))
    }
}
