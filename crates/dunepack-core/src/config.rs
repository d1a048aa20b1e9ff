use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use dunepack_util::errors::DunepackError;

/// Environment variable naming the recipe directory.
pub const RECIPES_ENV: &str = "DUNEPACK_RECIPES";

/// Global user configuration loaded from `~/.dunepack/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub recipes: RecipesConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Recipe search settings from `[recipes]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// Extra recipe directories, searched after the primary one.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Build defaults from `[build]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_type", rename = "build-type")]
    pub build_type: String,
    /// Install prefix template; `{name}` and `{version}` are substituted.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_type: default_build_type(),
            prefix: default_prefix(),
        }
    }
}

fn default_build_type() -> String {
    crate::DEFAULT_BUILD_TYPE.to_string()
}

fn default_prefix() -> String {
    "~/.dunepack/opt/{name}-{version}".to_string()
}

impl BuildConfig {
    /// Expand the prefix template for one package build.
    pub fn prefix_for(&self, name: &str, version: &str) -> PathBuf {
        let expanded = self
            .prefix
            .replace("{name}", name)
            .replace("{version}", version);
        dunepack_util::fs::expand_home(&expanded)
    }
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| DunepackError::Generic {
            message: format!("Failed to read global config: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            DunepackError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Extra recipe directories with `~` expanded.
    pub fn recipe_paths(&self) -> Vec<PathBuf> {
        self.recipes
            .paths
            .iter()
            .map(|p| dunepack_util::fs::expand_home(p))
            .collect()
    }
}

/// Returns the path to the dunepack data directory (`~/.dunepack/`).
pub fn dirs_path() -> PathBuf {
    dunepack_util::fs::expand_home("~/.dunepack")
}
