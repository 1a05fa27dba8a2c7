// src/install/mod.rs

//! Installation pipeline
//!
//! Orchestrates manifest, recipe cache, resolver and source acquirer to
//! install, uninstall, or update packages. Per package the pipeline is:
//! recipe, dependencies, clean build tree, fetch + verify + extract,
//! build (or deploy, for pre-compiled archives), and only after every
//! build command succeeded, the manifest record.

use crate::error::{Error, Result};
use crate::layout::{create_dir_restricted, Layout};
use crate::manifest::ManifestStore;
use crate::prompt::Prompter;
use crate::recipe::{PackageInfo, RecipeCache, KIND_PRE_COMPILED, KIND_TO_COMPILE};
use crate::repository::Repositories;
use crate::resolver::Resolver;
use crate::shell::run_recipe_command;
use crate::source::{post_extract_dir, SourceAcquirer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Restores the working directory on every exit path.
struct CwdGuard {
    original: PathBuf,
}

impl CwdGuard {
    fn new() -> Result<Self> {
        Ok(Self {
            original: std::env::current_dir()?,
        })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Package install/uninstall/update orchestrator
pub struct Installer<'a> {
    layout: &'a Layout,
    manifest: &'a ManifestStore,
    cache: &'a RecipeCache<'a>,
    sources: &'a SourceAcquirer<'a>,
    repositories: &'a Repositories<'a>,
    prompter: &'a dyn Prompter,
}

impl<'a> Installer<'a> {
    pub fn new(
        layout: &'a Layout,
        manifest: &'a ManifestStore,
        cache: &'a RecipeCache<'a>,
        sources: &'a SourceAcquirer<'a>,
        repositories: &'a Repositories<'a>,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            layout,
            manifest,
            cache,
            sources,
            repositories,
            prompter,
        }
    }

    /// Full install pipeline for `name`: mandatory dependencies first,
    /// then the selected optional groups, then the package itself.
    pub fn install(&self, name: &str, force: bool) -> Result<()> {
        info!("installing {name} (force={force})");
        self.manifest.ensure()?;

        let pkg = self.cache.fetch_recipe(name, force, false)?;

        if let Some(existing) = self.manifest.has(&pkg.name)? {
            if !force {
                return Err(Error::AlreadyInstalled {
                    name: existing.name,
                    version: existing.version,
                    release: existing.release,
                });
            }
        }

        let resolver = Resolver::new(self.cache, self.manifest, self.prompter);
        resolver.install_mandatory(name, |dep| self.install_unit(dep, false))?;
        resolver.install_optional(&pkg, |dep| self.install_unit(dep, false))?;

        self.install_unit(name, force)
    }

    /// Install exactly one package, dependencies already settled.
    fn install_unit(&self, name: &str, force: bool) -> Result<()> {
        let pkg = self.cache.fetch_recipe(name, false, true)?;

        if !force && self.manifest.is_installed(&pkg.name)? {
            debug!("{name} already installed, nothing to do");
            return Ok(());
        }

        let build_root = self.prepare_build_tree(name)?;
        let _cwd = CwdGuard::new()?;

        match pkg.build.kind.as_str() {
            KIND_TO_COMPILE => self.build_from_source(&pkg, &build_root, force)?,
            KIND_PRE_COMPILED => self.deploy_prebuilt(&pkg, &build_root, force)?,
            other => return Err(Error::UnknownBuildKind(other.to_string())),
        }

        self.record(&pkg)?;
        info!("installed {} {} (release {})", pkg.name, pkg.version, pkg.release);
        Ok(())
    }

    /// Run the recipe's uninstall commands against a re-prepared build
    /// tree, then drop the manifest entry.
    pub fn uninstall(&self, name: &str, force: bool) -> Result<()> {
        info!("uninstalling {name}");
        self.manifest.ensure()?;

        let pkg = self.cache.fetch_recipe(name, force, true)?;
        if !self.manifest.is_installed(&pkg.name)? {
            return Err(Error::NotInstalled(pkg.name));
        }

        // The uninstall commands expect the original source layout.
        let build_root = self.prepare_build_tree(name)?;
        let archive = self.sources.fetch_source(&pkg.source.url, force)?;
        self.sources.verify(&pkg.source.sha256, &archive)?;

        let _cwd = CwdGuard::new()?;
        match pkg.build.kind.as_str() {
            KIND_TO_COMPILE => {
                self.sources.decompress(&pkg, &build_root)?;
                let build_dir = post_extract_dir(&build_root)?;
                std::env::set_current_dir(&build_dir)?;
            }
            KIND_PRE_COMPILED => {
                self.sources.safe_extract_to_root(&pkg, &build_root)?;
                std::env::set_current_dir(&build_root)?;
            }
            other => return Err(Error::UnknownBuildKind(other.to_string())),
        }

        self.export_env(&pkg);
        for command in &pkg.build.uninstall {
            info!("uninstall step: {command}");
            run_recipe_command(command)?;
        }

        self.manifest.remove(&pkg.name)
    }

    /// Survey installed packages for newer releases and reinstall the
    /// confirmed candidates.
    pub fn update(&self) -> Result<()> {
        self.manifest.ensure()?;
        self.repositories.ensure(false)?;

        let installed = self.manifest.load()?;
        let mut candidates = Vec::new();
        for entry in &installed {
            // One broken recipe must not abort the whole survey.
            match self.cache.fetch_recipe(&entry.name, true, true) {
                Ok(pkg) if pkg.release > entry.release => {
                    info!(
                        "{}: release {} -> {}",
                        entry.name, entry.release, pkg.release
                    );
                    candidates.push(pkg);
                }
                Ok(_) => debug!("{} is up to date", entry.name),
                Err(e) => warn!("skipping {} in update survey: {e}", entry.name),
            }
        }

        if candidates.is_empty() {
            println!("All packages are up to date.");
            return Ok(());
        }

        println!("Packages with a newer release:");
        for pkg in &candidates {
            println!("  {} {} (release {})", pkg.name, pkg.version, pkg.release);
        }
        if !self.prompter.confirm("Update the packages listed above?")? {
            return Err(Error::UserDeclined);
        }

        for pkg in &candidates {
            self.install(&pkg.name, true)?;
        }
        Ok(())
    }

    /// Confirm, then truncate the recipe cache, the source cache and the
    /// build trees.
    pub fn clean(&self) -> Result<()> {
        if !self
            .prompter
            .confirm("Delete cached recipes, sources and build trees?")?
        {
            return Err(Error::UserDeclined);
        }

        for dir in [
            self.layout.recipes_dir(),
            self.layout.sources_dir(),
            self.layout.build_dir(),
        ] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            create_dir_restricted(&dir)?;
            info!("truncated {}", dir.display());
        }
        Ok(())
    }

    /// Remove-and-recreate `build/<name>/`.
    fn prepare_build_tree(&self, name: &str) -> Result<PathBuf> {
        let build_root = self.layout.package_build_dir(name);
        if build_root.exists() {
            fs::remove_dir_all(&build_root)?;
        }
        create_dir_restricted(&build_root)?;
        Ok(build_root)
    }

    /// Source build: fetch, verify, extract, then run the prepare and
    /// install command lists inside the build directory.
    fn build_from_source(&self, pkg: &PackageInfo, build_root: &Path, force: bool) -> Result<()> {
        let archive = self.sources.fetch_source(&pkg.source.url, force)?;
        self.sources.verify(&pkg.source.sha256, &archive)?;
        self.sources.decompress(pkg, build_root)?;

        let build_dir = post_extract_dir(build_root)?;
        debug!("build dir is {}", build_dir.display());
        std::env::set_current_dir(&build_dir)?;

        self.export_env(pkg);
        for command in &pkg.build.prepare {
            info!("prepare step: {command}");
            run_recipe_command(command)?;
        }
        for command in &pkg.build.install {
            info!("install step: {command}");
            run_recipe_command(command)?;
        }
        Ok(())
    }

    /// Pre-compiled deployment: traversal-checked extraction, then copy
    /// every regular file to the same path under the installation root.
    fn deploy_prebuilt(&self, pkg: &PackageInfo, build_root: &Path, force: bool) -> Result<()> {
        let archive = self.sources.fetch_source(&pkg.source.url, force)?;
        self.sources.verify(&pkg.source.sha256, &archive)?;
        self.sources.safe_extract_to_root(pkg, build_root)?;

        for entry in WalkDir::new(build_root) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_type().is_symlink() {
                debug!("skipping symlink {}", entry.path().display());
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(build_root)
                .map_err(|_| Error::UnsafePath(entry.path().display().to_string()))?;
            let target = self.layout.root().join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            // fs::copy carries the file mode along.
            fs::copy(entry.path(), &target)?;
            debug!("deployed {}", target.display());
        }

        std::env::set_current_dir(build_root)?;
        self.export_env(pkg);
        for command in &pkg.build.install {
            info!("install step: {command}");
            run_recipe_command(command)?;
        }
        Ok(())
    }

    /// Export build.env into the process environment. The variables
    /// outlive this package's build on purpose; the process is
    /// single-threaded and short-lived.
    fn export_env(&self, pkg: &PackageInfo) {
        for (key, value) in &pkg.build.env {
            debug!("env {key}={value}");
            std::env::set_var(key, value);
        }
    }

    /// Update the manifest, refreshing version/release on reinstall.
    fn record(&self, pkg: &PackageInfo) -> Result<()> {
        if self.manifest.is_installed(&pkg.name)? {
            self.manifest.remove(&pkg.name)?;
        }
        self.manifest.add(pkg)
    }
}
