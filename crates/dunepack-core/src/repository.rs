use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dunepack_util::errors::DunepackError;

use crate::recipe::Recipe;

/// A set of recipes loaded from one or more directories, keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct RecipeRepository {
    recipes: BTreeMap<String, Recipe>,
    roots: Vec<PathBuf>,
}

impl RecipeRepository {
    /// Load every `*.toml` recipe in `dir`.
    pub fn load(dir: &Path) -> miette::Result<Self> {
        let mut repo = Self::default();
        repo.add_dir(dir)?;
        Ok(repo)
    }

    /// Load every directory in order; a package name may only appear once overall.
    pub fn load_all(dirs: &[PathBuf]) -> miette::Result<Self> {
        let mut repo = Self::default();
        for dir in dirs {
            repo.add_dir(dir)?;
        }
        Ok(repo)
    }

    fn add_dir(&mut self, dir: &Path) -> miette::Result<()> {
        let files = dunepack_util::fs::toml_files(dir).map_err(|e| DunepackError::Recipe {
            message: format!("Failed to list recipes in {}: {e}", dir.display()),
        })?;
        for path in files {
            let recipe = Recipe::from_path(&path)?;
            tracing::debug!("loaded recipe '{}' from {}", recipe.name(), path.display());
            self.insert(recipe)?;
        }
        self.roots.push(dir.to_path_buf());
        Ok(())
    }

    /// Add an already-parsed recipe.
    pub fn insert(&mut self, recipe: Recipe) -> Result<(), DunepackError> {
        let name = recipe.name().to_string();
        if self.recipes.contains_key(&name) {
            return Err(DunepackError::Recipe {
                message: format!("package '{name}' is defined more than once"),
            });
        }
        self.recipes.insert(name, recipe);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Recipe, DunepackError> {
        self.recipes
            .get(name)
            .ok_or_else(|| DunepackError::UnknownPackage {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    /// Recipes in package-name order.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
