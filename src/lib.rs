// src/lib.rs

//! Blink Package Manager
//!
//! A source-based package manager: given a package name it resolves the
//! recipe, resolves the transitive dependency graph, fetches and
//! verifies sources, builds or unpacks them, and records the result in
//! the installation manifest.
//!
//! # Architecture
//!
//! - Value-typed [`layout::Layout`] derives every on-disk path from a
//!   single root; no global path state
//! - A per-root advisory [`lock::Lock`] serializes mutating commands
//!   across processes
//! - Verify-before-use everywhere: pinned commits and commit signatures
//!   before a repository working tree advances, SHA-256 digests before
//!   extraction, entry paths before pre-compiled deployment
//! - The manifest is rewritten atomically (write-to-temp-then-rename)
//! - External tools (git, gpg, tar/unzip) and interactive input sit
//!   behind capability traits so tests can script them

pub mod config;
mod error;
pub mod install;
pub mod layout;
pub mod lock;
pub mod manifest;
pub mod prompt;
pub mod recipe;
pub mod repository;
pub mod resolver;
pub mod shell;
pub mod source;

pub use config::{ensure_config, load_config, RepoConfig};
pub use error::{Error, Result};
pub use install::Installer;
pub use layout::Layout;
pub use lock::Lock;
pub use manifest::{InstalledPkg, ManifestStore};
pub use prompt::{Prompter, ScriptedPrompter, StdinPrompter};
pub use recipe::{PackageInfo, RecipeCache};
pub use repository::{GitCli, GpgCli, Repositories, Signer, Vcs};
pub use resolver::{DependencyGraph, Resolver};
pub use source::{Archiver, SourceAcquirer, SystemArchiver};
