//! Recipe discovery and the loaded state shared by every command.
//!
//! The recipe directory is taken from, in order:
//! - the `--recipes` argument
//! - the `DUNEPACK_RECIPES` environment variable
//! - the nearest ancestor of the working directory containing `recipes/`
//!
//! Directories listed under `[recipes] paths` in the global config are
//! loaded after it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dunepack_core::config::{GlobalConfig, RECIPES_ENV};
use dunepack_core::recipe::Recipe;
use dunepack_core::repository::RecipeRepository;
use dunepack_core::spec::Spec;
use dunepack_resolver::resolver::VariantResolver;
use dunepack_util::errors::DunepackError;

use crate::concretize::{concretize, BuildRequest};
use crate::plan::{plan, BuildLayout, Plan};

/// Loaded recipes, their resolvers and the user's configuration.
///
/// Each recipe's closure and conflict rules are derived once here and shared
/// by every request against it.
#[derive(Debug)]
pub struct Context {
    pub repository: RecipeRepository,
    pub config: GlobalConfig,
    resolvers: BTreeMap<String, VariantResolver>,
}

impl Context {
    pub fn new(repository: RecipeRepository, config: GlobalConfig) -> Result<Self, DunepackError> {
        let resolvers = repository
            .iter()
            .map(|recipe| Ok((recipe.name().to_string(), VariantResolver::for_recipe(recipe)?)))
            .collect::<Result<BTreeMap<_, _>, DunepackError>>()?;
        Ok(Self {
            repository,
            config,
            resolvers,
        })
    }

    /// Locate and load every recipe directory.
    pub fn load(recipes: Option<&Path>) -> miette::Result<Self> {
        let config = GlobalConfig::load().unwrap_or_else(|e| {
            tracing::warn!("ignoring global config: {e}");
            GlobalConfig::default()
        });

        let mut dirs = vec![recipe_dir(recipes)?];
        for extra in config.recipe_paths() {
            if extra.is_dir() {
                dirs.push(extra);
            } else {
                tracing::warn!("recipe path {} does not exist", extra.display());
            }
        }
        tracing::debug!("loading recipes from {dirs:?}");

        let repository = RecipeRepository::load_all(&dirs)?;
        Ok(Self::new(repository, config)?)
    }

    pub fn recipe(&self, name: &str) -> Result<&Recipe, DunepackError> {
        self.repository.get(name)
    }

    /// The resolver derived for `name` when the repository was loaded.
    pub fn resolver(&self, name: &str) -> Result<&VariantResolver, DunepackError> {
        self.resolvers
            .get(name)
            .ok_or_else(|| DunepackError::UnknownPackage {
                name: name.to_string(),
            })
    }

    /// Concretize a parsed spec against its recipe.
    pub fn request(&self, spec: &Spec) -> Result<(&Recipe, BuildRequest), DunepackError> {
        let name = spec.name.as_deref().ok_or_else(|| DunepackError::Generic {
            message: format!("spec '{spec}' does not name a package"),
        })?;
        let recipe = self.recipe(name)?;
        let request = concretize(recipe, spec, &self.config.build.build_type)?;
        Ok((recipe, request))
    }

    /// Concretize and plan `spec`. Without an explicit prefix the configured
    /// prefix template is used.
    pub fn plan(&self, spec: &str, prefix: Option<&Path>) -> Result<Plan, DunepackError> {
        let spec = Spec::parse(spec)?;
        let (recipe, request) = self.request(&spec)?;
        let prefix = match prefix {
            Some(p) => p.to_path_buf(),
            None => self
                .config
                .build
                .prefix_for(recipe.name(), request.version.as_str()),
        };
        let resolver = self.resolver(recipe.name())?;
        plan(recipe, resolver, &request, &BuildLayout::new(recipe.name(), prefix))
    }
}

/// The primary recipe directory.
pub fn recipe_dir(explicit: Option<&Path>) -> miette::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(RECIPES_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let cwd = std::env::current_dir().map_err(DunepackError::Io)?;
    let root = dunepack_util::fs::find_ancestor_with(&cwd, "recipes").ok_or_else(|| {
        DunepackError::Generic {
            message: format!(
                "Could not find a recipes/ directory; pass --recipes or set {RECIPES_ENV}"
            ),
        }
    })?;
    Ok(root.join("recipes"))
}
