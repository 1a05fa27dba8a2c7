// src/recipe/cache.rs

//! Recipe location and local caching
//!
//! Recipes live inside synchronized repositories at
//! `repositories/<repo>/recipes/<package>.json`. Before use they are
//! copied into the local cache at `recipes/<package>.json`; decoding
//! always happens from the cache.

use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::prompt::Prompter;
use crate::recipe::PackageInfo;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Locator and cache for package recipes
pub struct RecipeCache<'a> {
    layout: &'a Layout,
    repos: &'a [RepoConfig],
    prompter: &'a dyn Prompter,
}

impl<'a> RecipeCache<'a> {
    pub fn new(layout: &'a Layout, repos: &'a [RepoConfig], prompter: &'a dyn Prompter) -> Self {
        Self {
            layout,
            repos,
            prompter,
        }
    }

    /// Find which configured repository provides `name`. Zero matches is
    /// `PackageNotFound`; with several, the user picks one from a
    /// numbered list and an invalid selection is `AmbiguousPackage`.
    pub fn find_repo_for_package(&self, name: &str) -> Result<(&'a RepoConfig, PathBuf)> {
        let mut matches = Vec::new();
        for repo in self.repos {
            let path = self
                .layout
                .repository_dir(&repo.name)
                .join("recipes")
                .join(format!("{name}.json"));
            if path.is_file() {
                matches.push((repo, path));
            }
        }

        match matches.len() {
            0 => Err(Error::PackageNotFound(name.to_string())),
            1 => Ok(matches.remove(0)),
            _ => {
                let options: Vec<String> = matches
                    .iter()
                    .map(|(repo, _)| format!("{} ({})", repo.name, repo.url))
                    .collect();
                let picked = self
                    .prompter
                    .choose(
                        &format!("Multiple repositories provide package '{name}':"),
                        &options,
                    )?
                    .ok_or_else(|| Error::AmbiguousPackage(name.to_string()))?;
                Ok(matches.remove(picked))
            }
        }
    }

    /// Copy the located recipe into the local cache. An existing cached
    /// copy is only overwritten when `force` is set.
    pub fn get_recipe(&self, name: &str, force: bool) -> Result<PathBuf> {
        let cached = self.layout.recipe_file(name);
        if cached.exists() && !force {
            debug!("recipe for {name} already cached at {}", cached.display());
            return Ok(cached);
        }

        let (repo, source) = self.find_repo_for_package(name)?;
        if let Some(parent) = cached.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &cached)?;
        info!("cached recipe for {name} from repository {}", repo.name);
        Ok(cached)
    }

    /// Decode the recipe for `name`, caching it first when absent or
    /// when `force` is set. Non-quiet prints the metadata block.
    pub fn fetch_recipe(&self, name: &str, force: bool, quiet: bool) -> Result<PackageInfo> {
        let cached = self.layout.recipe_file(name);
        if !cached.exists() || force {
            self.get_recipe(name, force)?;
        }

        let text = fs::read_to_string(&cached)?;
        let pkg: PackageInfo =
            serde_json::from_str(&text).map_err(|e| Error::RecipeMalformed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if !quiet {
            // Best effort: the providing repo for display only.
            let (repo_name, repo_url) = match self.find_repo_for_package(name) {
                Ok((repo, _)) => (repo.name.clone(), repo.url.clone()),
                Err(_) => ("local cache".to_string(), String::new()),
            };
            pkg.print_metadata(&repo_name, &repo_url);
        }

        Ok(pkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use tempfile::TempDir;

    fn test_layout(temp: &TempDir) -> Layout {
        let layout = Layout::new(temp.path().to_str().unwrap()).unwrap();
        layout.ensure_dirs().unwrap();
        layout
    }

    fn repo_config(name: &str) -> RepoConfig {
        RepoConfig {
            name: name.to_string(),
            url: format!("https://example.org/{name}.git"),
            reference: None,
            pin: None,
            trusted_key: None,
        }
    }

    fn seed_recipe(layout: &Layout, repo: &str, pkg: &str, release: i64) {
        let dir = layout.repository_dir(repo).join("recipes");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(format!("{pkg}.json")),
            format!(
                r#"{{
                    "name": "{pkg}", "version": "1.0", "release": {release},
                    "source": {{ "url": "https://example.org/{pkg}.tar.gz", "sha256": "00" }},
                    "build": {{ "kind": "toCompile" }}
                }}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_package_not_found() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        let repos = [repo_config("main")];
        let prompter = ScriptedPrompter::default();
        let cache = RecipeCache::new(&layout, &repos, &prompter);

        assert!(matches!(
            cache.find_repo_for_package("ghost"),
            Err(Error::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_single_match() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        seed_recipe(&layout, "main", "alpha", 1);
        let repos = [repo_config("main")];
        let prompter = ScriptedPrompter::default();
        let cache = RecipeCache::new(&layout, &repos, &prompter);

        let (repo, path) = cache.find_repo_for_package("alpha").unwrap();
        assert_eq!(repo.name, "main");
        assert!(path.ends_with("recipes/alpha.json"));
    }

    #[test]
    fn test_ambiguous_match_resolved_by_prompt() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        seed_recipe(&layout, "first", "alpha", 1);
        seed_recipe(&layout, "second", "alpha", 2);
        let repos = [repo_config("first"), repo_config("second")];

        let prompter = ScriptedPrompter::new(["2"]);
        let cache = RecipeCache::new(&layout, &repos, &prompter);
        let (repo, _) = cache.find_repo_for_package("alpha").unwrap();
        assert_eq!(repo.name, "second");
    }

    #[test]
    fn test_ambiguous_match_invalid_selection() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        seed_recipe(&layout, "first", "alpha", 1);
        seed_recipe(&layout, "second", "alpha", 2);
        let repos = [repo_config("first"), repo_config("second")];

        let prompter = ScriptedPrompter::new(["7"]);
        let cache = RecipeCache::new(&layout, &repos, &prompter);
        assert!(matches!(
            cache.find_repo_for_package("alpha"),
            Err(Error::AmbiguousPackage(_))
        ));
    }

    #[test]
    fn test_fetch_recipe_decodes_and_caches() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        seed_recipe(&layout, "main", "alpha", 3);
        let repos = [repo_config("main")];
        let prompter = ScriptedPrompter::default();
        let cache = RecipeCache::new(&layout, &repos, &prompter);

        let pkg = cache.fetch_recipe("alpha", false, true).unwrap();
        assert_eq!(pkg.release, 3);
        assert!(layout.recipe_file("alpha").exists());
    }

    #[test]
    fn test_cached_copy_served_until_forced() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        seed_recipe(&layout, "main", "alpha", 1);
        let repos = [repo_config("main")];
        let prompter = ScriptedPrompter::default();
        let cache = RecipeCache::new(&layout, &repos, &prompter);

        cache.fetch_recipe("alpha", false, true).unwrap();

        // The repository moves on; the cache still serves release 1.
        seed_recipe(&layout, "main", "alpha", 2);
        let stale = cache.fetch_recipe("alpha", false, true).unwrap();
        assert_eq!(stale.release, 1);

        // Force refreshes the cache.
        let fresh = cache.fetch_recipe("alpha", true, true).unwrap();
        assert_eq!(fresh.release, 2);
    }

    #[test]
    fn test_malformed_recipe() {
        let temp = TempDir::new().unwrap();
        let layout = test_layout(&temp);
        let dir = layout.repository_dir("main").join("recipes");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("broken.json"), "{ not json").unwrap();
        let repos = [repo_config("main")];
        let prompter = ScriptedPrompter::default();
        let cache = RecipeCache::new(&layout, &repos, &prompter);

        assert!(matches!(
            cache.fetch_recipe("broken", false, true),
            Err(Error::RecipeMalformed { .. })
        ));
    }
}
