// src/commands.rs
//! Command handlers for the blink CLI
//!
//! Every mutating command goes through the same gate: super-user check,
//! layout construction from the root flag, lock acquisition, and only
//! then the directory and default-config bootstrap. The lock is
//! released on every exit path.

use anyhow::{Context, Result};
use blink::{
    ensure_config, load_config, GitCli, GpgCli, Installer, Layout, Lock, ManifestStore,
    RecipeCache, RepoConfig, Repositories, SourceAcquirer, StdinPrompter, SystemArchiver,
};
use tracing::debug;

/// Support text printed by `blink support`
pub const SUPPORT_TEXT: &str = "\
Having trouble? Open an issue and include any debug logs (run with
BLINK_LOG=debug) when reporting.
Issues: https://github.com/Aperture-OS/Blink-Package-Manager/issues
";

/// Everything a mutating command needs, lock held
struct Workspace {
    layout: Layout,
    repos: Vec<RepoConfig>,
    lock: Lock,
}

/// Super-user gate for mutating commands.
fn require_root() -> Result<()> {
    if !nix::unistd::geteuid().is_root() {
        return Err(blink::Error::PermissionDenied.into());
    }
    Ok(())
}

/// Open the data root for mutation: privilege check, lock, then
/// directories and default config with the lock already held.
fn open_workspace(root: &str, recipes_dir: Option<&str>) -> Result<Workspace> {
    require_root()?;

    let mut layout = Layout::new(root).context("failed to resolve root directory")?;
    if let Some(dir) = recipes_dir {
        layout.override_recipes_dir(dir)?;
    }

    // Nothing under the root may be touched before the lock is held; a
    // loser on the lock must leave the root exactly as it found it.
    // On a later failure the lock's Drop releases it.
    let lock = Lock::acquire(&layout)?;

    layout.ensure_dirs().context("failed to create data directories")?;
    ensure_config(&layout)?;
    let repos = load_config(&layout)?;

    Ok(Workspace {
        layout,
        repos,
        lock,
    })
}

/// Run `body`, then release the lock whatever happened, preserving the
/// first error.
fn with_workspace<F>(root: &str, recipes_dir: Option<&str>, body: F) -> Result<()>
where
    F: FnOnce(&Workspace) -> Result<()>,
{
    let mut ws = open_workspace(root, recipes_dir)?;
    let result = body(&ws);
    match ws.lock.release() {
        Ok(()) => result,
        Err(release_err) => match result {
            Ok(()) => Err(release_err.into()),
            Err(e) => {
                debug!("lock release after failure also failed: {release_err}");
                Err(e)
            }
        },
    }
}

/// Wire the component graph for one invocation and hand it to `body`.
fn with_installer<F>(ws: &Workspace, body: F) -> Result<()>
where
    F: FnOnce(&Repositories, &Installer) -> blink::Result<()>,
{
    let prompter = StdinPrompter;
    let vcs = GitCli;
    let signer = GpgCli;
    let archiver = SystemArchiver;

    let repositories = Repositories::new(&ws.layout, &ws.repos, &vcs, &signer);
    let manifest = ManifestStore::new(&ws.layout);
    let cache = RecipeCache::new(&ws.layout, &ws.repos, &prompter);
    let sources = SourceAcquirer::new(&ws.layout, &archiver);
    let installer = Installer::new(
        &ws.layout,
        &manifest,
        &cache,
        &sources,
        &repositories,
        &prompter,
    );

    body(&repositories, &installer)?;
    Ok(())
}

/// `blink get`: download a package recipe into the local cache.
pub fn cmd_get(package: &str, force: bool, recipes_dir: Option<&str>, root: &str) -> Result<()> {
    with_workspace(root, recipes_dir, |ws| {
        let prompter = StdinPrompter;
        let vcs = GitCli;
        let signer = GpgCli;
        let repositories = Repositories::new(&ws.layout, &ws.repos, &vcs, &signer);
        repositories.ensure(false)?;

        let cache = RecipeCache::new(&ws.layout, &ws.repos, &prompter);
        let path = cache.get_recipe(package, force)?;
        println!("Recipe for {package} cached at {}", path.display());
        Ok(())
    })
}

/// `blink search`: fetch (if needed) and print recipe metadata.
pub fn cmd_search(package: &str, force: bool, recipes_dir: Option<&str>, root: &str) -> Result<()> {
    with_workspace(root, recipes_dir, |ws| {
        let prompter = StdinPrompter;
        let vcs = GitCli;
        let signer = GpgCli;
        let repositories = Repositories::new(&ws.layout, &ws.repos, &vcs, &signer);
        repositories.ensure(false)?;

        let cache = RecipeCache::new(&ws.layout, &ws.repos, &prompter);
        cache.fetch_recipe(package, force, false)?;
        Ok(())
    })
}

/// `blink install`: the full pipeline.
pub fn cmd_install(
    package: &str,
    force: bool,
    recipes_dir: Option<&str>,
    root: &str,
) -> Result<()> {
    with_workspace(root, recipes_dir, |ws| {
        with_installer(ws, |repositories, installer| {
            repositories.ensure(false)?;
            installer.install(package, force)
        })
    })
}

/// `blink uninstall`: run the recipe's uninstall commands and drop the
/// manifest entry.
pub fn cmd_uninstall(
    package: &str,
    force: bool,
    recipes_dir: Option<&str>,
    root: &str,
) -> Result<()> {
    with_workspace(root, recipes_dir, |ws| {
        with_installer(ws, |_repositories, installer| {
            installer.uninstall(package, force)
        })
    })
}

/// `blink sync`: synchronize the configured recipe repositories.
pub fn cmd_sync(force: bool, root: &str) -> Result<()> {
    with_workspace(root, None, |ws| {
        let vcs = GitCli;
        let signer = GpgCli;
        let repositories = Repositories::new(&ws.layout, &ws.repos, &vcs, &signer);
        repositories.ensure(force)?;
        println!("Repositories synchronized.");
        Ok(())
    })
}

/// `blink update`: reinstall packages whose recipe release advanced.
pub fn cmd_update(recipes_dir: Option<&str>, root: &str) -> Result<()> {
    with_workspace(root, recipes_dir, |ws| {
        with_installer(ws, |_repositories, installer| installer.update())
    })
}

/// `blink clean`: truncate recipes/, sources/ and build/.
pub fn cmd_clean(root: &str) -> Result<()> {
    with_workspace(root, None, |ws| {
        with_installer(ws, |_repositories, installer| installer.clean())
    })
}
