// src/resolver/mod.rs

//! Dependency resolution
//!
//! Builds the dependency graph for an install action by walking recipes
//! (each reachable package visited exactly once), rejects cycles, and
//! drives installation in topological order: mandatory dependencies
//! behind a single confirmation, optional-dependency groups through an
//! interactive picker. The actual per-package installation is a
//! capability injected by the installer.

mod graph;

pub use graph::DependencyGraph;

use crate::error::{Error, Result};
use crate::manifest::ManifestStore;
use crate::prompt::Prompter;
use crate::recipe::{OptGroup, PackageInfo, RecipeCache};
use std::collections::HashSet;
use tracing::{info, warn};

/// Escape hatch that skips missing mandatory dependencies. Debug use
/// only; never advertised.
const BYPASS_ANSWER: &str = "bypass-donotuse";

/// Resolver for one install action
pub struct Resolver<'a> {
    cache: &'a RecipeCache<'a>,
    manifest: &'a ManifestStore,
    prompter: &'a dyn Prompter,
}

impl<'a> Resolver<'a> {
    pub fn new(
        cache: &'a RecipeCache<'a>,
        manifest: &'a ManifestStore,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            cache,
            manifest,
            prompter,
        }
    }

    /// Build the dependency graph reachable from `root` and require it
    /// to be acyclic.
    pub fn build_graph(&self, root: &str) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut visited = HashSet::new();
        self.visit(root, &mut graph, &mut visited)?;

        if let Some(cycle) = graph.detect_cycle() {
            return Err(Error::DependencyCycle(cycle));
        }
        Ok(graph)
    }

    fn visit(
        &self,
        name: &str,
        graph: &mut DependencyGraph,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        graph.add_node(name);

        let pkg = self.cache.fetch_recipe(name, false, true)?;
        for dep in pkg.dependencies.keys() {
            graph.add_edge(name, dep);
            self.visit(dep, graph, visited)?;
        }
        Ok(())
    }

    /// Resolve and install the mandatory dependencies of `root`. The
    /// root itself is skipped (the caller installs it last), as is
    /// anything already in the manifest. When installs are needed the
    /// user confirms once; declining is fatal.
    pub fn install_mandatory<F>(&self, root: &str, mut install: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let graph = self.build_graph(root)?;

        let mut missing = Vec::new();
        for name in graph.topo_order() {
            if name == root {
                continue;
            }
            if self.manifest.is_installed(&name)? {
                info!("dependency {name} already installed");
                continue;
            }
            missing.push(name);
        }

        if missing.is_empty() {
            return Ok(());
        }

        warn!("missing mandatory dependencies: {}", missing.join(", "));
        let answer = self
            .prompter
            .input("Install mandatory dependencies? [ (Y)es / (N)o ]: ")?
            .to_lowercase();
        match answer.as_str() {
            "n" | "no" => return Err(Error::UserDeclined),
            BYPASS_ANSWER => {
                warn!(
                    "INSECURE: bypassing mandatory dependency installation; \
                     the package may not function until {} are installed",
                    missing.join(", ")
                );
                return Ok(());
            }
            _ => {}
        }

        for dep in &missing {
            info!("installing dependency {dep}");
            install(dep)?;
        }
        Ok(())
    }

    /// Walk the root package's optional-dependency groups. A failure
    /// inside one group is contained: the group is skipped with a
    /// warning and the next group is offered.
    pub fn install_optional<F>(&self, pkg: &PackageInfo, mut install: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<()>,
    {
        for group in &pkg.opt_dependencies {
            if let Err(e) = self.offer_group(group, &mut install) {
                warn!("skipping optional group {}: {e}", group.id);
            }
        }
        Ok(())
    }

    /// Present one group and install the chosen option's sub-graph.
    fn offer_group<F>(&self, group: &OptGroup, install: &mut F) -> Result<()>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let mut installed = Vec::new();
        let mut available = Vec::new();
        for option in &group.options {
            if self.manifest.is_installed(option)? {
                installed.push(option.clone());
            } else {
                available.push(option.clone());
            }
        }

        println!();
        println!(
            "Optional dependency group {}: {}",
            group.id, group.description
        );
        if !installed.is_empty() {
            println!("Already installed: {}", installed.join(", "));
        }

        let default = if !installed.is_empty() || available.is_empty() {
            "0"
        } else {
            "1"
        };

        println!("[ 0 ] None");
        for (i, option) in available.iter().enumerate() {
            println!("[ {} ] {option}", i + 1);
        }

        let mut answer = self
            .prompter
            .input(&format!("Select optional dependency (default={default}): "))?;
        if answer.is_empty() {
            answer = default.to_string();
        }

        let choice = match answer.parse::<usize>() {
            Ok(n) if n <= available.len() => n,
            _ => {
                warn!("invalid choice, skipping optional group {}", group.id);
                return Ok(());
            }
        };
        if choice == 0 {
            info!("skipping optional group {}", group.id);
            return Ok(());
        }

        let selected = &available[choice - 1];
        let graph = self.build_graph(selected)?;
        for name in graph.topo_order() {
            if self.manifest.is_installed(&name)? {
                continue;
            }
            info!("installing optional dependency {name}");
            install(&name)?;
        }
        Ok(())
    }
}
