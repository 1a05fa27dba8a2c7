// src/error.rs

//! Error types for the blink package manager
//!
//! Every failure a command can surface maps to one variant here. Lock,
//! digest, signature, path-traversal and manifest errors are fatal to the
//! invocation; callers never retry them.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by blink operations
#[derive(Error, Debug)]
pub enum Error {
    /// Repository configuration file does not exist
    #[error("configuration file missing: {0}")]
    ConfigMissing(PathBuf),

    /// Repository configuration could not be decoded or is empty
    #[error("configuration malformed: {0}")]
    ConfigMalformed(String),

    /// Installed-package manifest could not be decoded
    #[error("manifest malformed: {0}")]
    ManifestMalformed(String),

    /// The per-root lock is held by another process
    #[error("another instance is already running (lock held at {0})")]
    AnotherInstanceRunning(PathBuf),

    /// `release()` called on a lock that is not held
    #[error("lock is not acquired")]
    NotAcquired,

    /// A recipe failed to decode
    #[error("recipe for package '{name}' is malformed: {reason}")]
    RecipeMalformed { name: String, reason: String },

    /// No configured repository provides the package
    #[error("package '{0}' not found in any configured repository")]
    PackageNotFound(String),

    /// Multiple repositories provide the package and the selection was invalid
    #[error("invalid repository selection for package '{0}'")]
    AmbiguousPackage(String),

    /// The dependency graph contains a cycle
    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    /// The user answered no to a required confirmation
    #[error("aborted: user declined")]
    UserDeclined,

    /// Install requested for a package already in the manifest
    #[error("package '{name}' already installed (version={version} release={release})")]
    AlreadyInstalled {
        name: String,
        version: String,
        release: i64,
    },

    /// Uninstall requested for a package not in the manifest
    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    /// HTTP download did not complete with status 200
    #[error("download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// A SHA-256 digest or pinned commit hash did not match
    #[error("hash mismatch for {subject}: expected {expected}, got {actual}")]
    HashMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    /// Commit signature verification failed
    #[error("signature verification failed for repository '{repo}': {reason}")]
    SignatureFailed { repo: String, reason: String },

    /// Repository history cannot be fast-forwarded to the verified commit
    #[error("repository '{0}' has diverged from its remote; re-run sync with --force to reset")]
    DivergedHistory(String),

    /// Archive suffix is not one of the supported formats
    #[error("unsupported archive format: {0}")]
    UnsupportedArchive(String),

    /// Archive entry would escape the extraction root
    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),

    /// Recipe build.kind is neither toCompile nor preCompiled
    #[error("unknown build kind '{0}'")]
    UnknownBuildKind(String),

    /// A prepare/install/uninstall command exited non-zero
    #[error("build step failed: `{command}`\nstderr: {stderr}")]
    BuildStepFailed { command: String, stderr: String },

    /// Mutating command invoked without super-user privileges
    #[error("this command must be run as the super-user (root)")]
    PermissionDenied,

    /// An external tool (git, gpg, tar, unzip) failed
    #[error("subprocess `{command}` failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
