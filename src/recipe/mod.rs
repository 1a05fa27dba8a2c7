// src/recipe/mod.rs

//! Package recipes
//!
//! A recipe is the unit of buildable software: a JSON manifest naming
//! the source archive, its SHA-256 digest, the dependency set, and the
//! build/uninstall command lists. Recipes are authored upstream,
//! synchronized into the repository working trees, located and cached
//! by [`cache::RecipeCache`], and never mutated here.

pub mod cache;
pub mod format;

pub use cache::RecipeCache;
pub use format::{BuildInfo, OptGroup, PackageInfo, SourceInfo, KIND_PRE_COMPILED, KIND_TO_COMPILE};
