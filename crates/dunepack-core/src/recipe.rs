use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dunepack_util::errors::DunepackError;

use crate::module::{find_cycle, EdgeTable, ModuleEntry, ModuleSource, ModuleTable, SourceDescriptor, VariantMap};
use crate::spec::Spec;
use crate::version::{Version, VersionConstraint};

/// The parsed representation of a recipe file such as `recipes/dune.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub package: PackageMetadata,

    /// Buildable versions; the first entry is the preferred one.
    #[serde(default, rename = "version")]
    pub versions: Vec<VersionEntry>,

    #[serde(default)]
    pub variants: BTreeMap<String, VariantDef>,

    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDef>,

    #[serde(default)]
    pub dependencies: Vec<DependencyDef>,

    #[serde(default)]
    pub conflicts: Vec<ConflictDef>,

    #[serde(default)]
    pub patches: Vec<PatchDef>,

    #[serde(default)]
    pub flags: Vec<FlagDef>,

    #[serde(default)]
    pub prepare: Vec<PrepareDef>,

    #[serde(default)]
    pub build: BuildDef,
}

/// Package identity and metadata from the `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Repository for versions declared with a `branch`.
    #[serde(default)]
    pub git: Option<String>,
    /// Archive URL template for versions declared with a `sha256`; `{version}` is substituted.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub maintainers: Vec<String>,
    /// Interpreter package this one installs components into (e.g. `python`).
    #[serde(default)]
    pub extends: Option<String>,
}

/// A `[[version]]` entry: either a git branch or a checksummed archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub submodules: bool,
}

/// A boolean variant from `[variants.<name>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantDef {
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// The module this variant enables, if it is a module variant.
    #[serde(default)]
    pub module: Option<String>,
}

/// An optional source module from `[modules.<name>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub git: String,
    /// Modules required directly; the closure is computed at load time.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Package versions the module exists for; all versions when absent.
    #[serde(default)]
    pub versions: Option<Vec<String>>,
    /// Per-version branch overrides; otherwise the package version's branch is used.
    #[serde(default)]
    pub branches: BTreeMap<String, String>,
    /// Activation predicate for modules that have no variant of their own.
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub submodules: bool,
}

/// An upstream package dependency from `[[dependencies]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDef {
    pub spec: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default = "default_dependency_types", rename = "type")]
    pub types: Vec<DependencyType>,
}

fn default_dependency_types() -> Vec<DependencyType> {
    vec![DependencyType::Build, DependencyType::Link]
}

/// When an upstream dependency is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Build,
    Link,
    Run,
    Test,
}

/// A recipe-level conflict: `spec` may not be built when `when` holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictDef {
    pub spec: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A patch file applied when its predicate holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchDef {
    pub file: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default, rename = "working-dir")]
    pub working_dir: Option<String>,
}

/// A script run inside the source tree before configuring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareDef {
    pub run: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default, rename = "working-dir")]
    pub working_dir: Option<String>,
}

/// A CMake cache definition from `[[flags]]`.
///
/// With `variant` set the flag is `ON`/`OFF` following the variant (flipped
/// by `invert`); otherwise `value` is emitted verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagDef {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: FlagKind,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub unless: Option<String>,
}

/// CMake cache entry type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagKind {
    #[default]
    Bool,
    String,
    Path,
}

impl FlagKind {
    pub fn as_cmake(&self) -> &'static str {
        match self {
            FlagKind::Bool => "BOOL",
            FlagKind::String => "STRING",
            FlagKind::Path => "PATH",
        }
    }
}

/// Build settings from `[build]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDef {
    #[serde(default)]
    pub system: BuildSystem,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Versions whose `dunecontrol` still names the configure step `configure`.
    #[serde(default, rename = "legacy-configure")]
    pub legacy_configure: Vec<String>,
    #[serde(default)]
    pub headers: Option<HeaderInstall>,
}

impl Default for BuildDef {
    fn default() -> Self {
        Self {
            system: BuildSystem::default(),
            parallel: default_parallel(),
            legacy_configure: Vec::new(),
            headers: None,
        }
    }
}

fn default_parallel() -> bool {
    true
}

/// The build tool driving a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildSystem {
    #[default]
    Cmake,
    Dunecontrol,
    CopyHeaders,
}

/// Header-only install layout for [`BuildSystem::CopyHeaders`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderInstall {
    pub from: String,
    pub to: String,
}

impl Recipe {
    /// Load, parse and validate a recipe file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DunepackError::Recipe {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let recipe = Self::from_str(&content).map_err(|e| match e {
            DunepackError::Recipe { message } => DunepackError::Recipe {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })?;
        Ok(recipe)
    }

    /// Parse and validate a recipe from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, DunepackError> {
        let recipe: Recipe = toml::from_str(content).map_err(|e| DunepackError::Recipe {
            message: format!("Failed to parse recipe: {e}"),
        })?;
        recipe.validate()?;
        Ok(recipe)
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Check every cross-reference inside the recipe.
    pub fn validate(&self) -> Result<(), DunepackError> {
        if self.versions.is_empty() {
            return Err(self.recipe_error("declares no versions".to_string()));
        }
        let mut seen = BTreeSet::new();
        for v in &self.versions {
            Version::parse(&v.name)?;
            if !seen.insert(v.name.as_str()) {
                return Err(self.recipe_error(format!("version '{}' declared twice", v.name)));
            }
            if v.branch.is_none() && v.sha256.is_none() {
                return Err(self.recipe_error(format!(
                    "version '{}' needs a branch or a sha256",
                    v.name
                )));
            }
            if v.branch.is_some() && self.package.git.is_none() {
                return Err(self.recipe_error(format!(
                    "version '{}' uses a branch but [package] has no git",
                    v.name
                )));
            }
            if v.sha256.is_some() && self.package.url.is_none() {
                return Err(self.recipe_error(format!(
                    "version '{}' uses a sha256 but [package] has no url",
                    v.name
                )));
            }
        }

        let variant_map = self.variant_map()?;

        for (name, module) in &self.modules {
            for dep in &module.requires {
                if !self.modules.contains_key(dep) {
                    return Err(DunepackError::UnknownModule {
                        package: self.package.name.clone(),
                        module: dep.clone(),
                    });
                }
            }
            for v in module.versions.iter().flatten().chain(module.branches.keys()) {
                if !seen.contains(v.as_str()) {
                    return Err(self.recipe_error(format!(
                        "module '{name}' refers to undeclared version '{v}'"
                    )));
                }
            }
            if let Some(when) = &module.when {
                if let Some(variant) = variant_map.variant_of(name) {
                    return Err(self.recipe_error(format!(
                        "module '{name}' is enabled by variant '{variant}' and cannot have a `when`"
                    )));
                }
                self.check_predicate(when)?;
            }
        }

        let edges: EdgeTable = self
            .modules
            .iter()
            .filter(|(_, def)| !def.requires.is_empty())
            .map(|(name, def)| (name.clone(), def.requires.iter().cloned().collect()))
            .collect();
        if let Some(cycle) = find_cycle(&edges) {
            return Err(DunepackError::DependencyCycle { cycle });
        }

        for dep in &self.dependencies {
            Spec::parse(&dep.spec)?;
            if let Some(when) = &dep.when {
                self.check_predicate(when)?;
            }
        }
        for conflict in &self.conflicts {
            self.check_predicate(&conflict.spec)?;
            if let Some(when) = &conflict.when {
                self.check_predicate(when)?;
            }
        }
        for when in self
            .patches
            .iter()
            .filter_map(|p| p.when.as_ref())
            .chain(self.prepare.iter().filter_map(|p| p.when.as_ref()))
        {
            self.check_predicate(when)?;
        }
        for flag in &self.flags {
            match (&flag.variant, &flag.value) {
                (Some(v), _) => self.check_variant(v)?,
                (None, Some(_)) => {}
                (None, None) => {
                    return Err(self.recipe_error(format!(
                        "flag '{}' needs a variant or a value",
                        flag.name
                    )))
                }
            }
            for pred in flag.when.iter().chain(flag.unless.iter()) {
                self.check_predicate(pred)?;
            }
        }

        for v in &self.build.legacy_configure {
            VersionConstraint::parse(v)?;
        }
        if self.build.system == BuildSystem::CopyHeaders && self.build.headers.is_none() {
            return Err(self.recipe_error("copy-headers build needs [build.headers]".to_string()));
        }
        Ok(())
    }

    /// Parse a predicate and make sure it only names this package's variants.
    fn check_predicate(&self, predicate: &str) -> Result<Spec, DunepackError> {
        let spec = Spec::parse(predicate)?;
        if let Some(name) = &spec.name {
            if name != &self.package.name {
                return Err(self.recipe_error(format!(
                    "predicate '{predicate}' names another package '{name}'"
                )));
            }
        }
        for v in spec.variant_names() {
            self.check_variant(v)?;
        }
        Ok(spec)
    }

    fn check_variant(&self, variant: &str) -> Result<(), DunepackError> {
        if self.variants.contains_key(variant) {
            Ok(())
        } else {
            Err(DunepackError::UnknownVariant {
                package: self.package.name.clone(),
                variant: variant.to_string(),
            })
        }
    }

    fn recipe_error(&self, message: String) -> DunepackError {
        DunepackError::Recipe {
            message: format!("package '{}' {message}", self.package.name),
        }
    }

    /// The variant↔module bijection over module variants.
    pub fn variant_map(&self) -> Result<VariantMap, DunepackError> {
        let pairs = self
            .variants
            .iter()
            .filter_map(|(v, def)| def.module.as_ref().map(|m| (v.clone(), m.clone())));
        let map = VariantMap::new(pairs)?;
        for (_, module) in map.iter() {
            if !self.modules.contains_key(module) {
                return Err(DunepackError::UnknownModule {
                    package: self.package.name.clone(),
                    module: module.to_string(),
                });
            }
        }
        Ok(map)
    }

    /// Compile `[modules]` into version-tagged source descriptors and the edge table.
    pub fn module_table(&self) -> Result<ModuleTable, DunepackError> {
        let mut entries = Vec::new();
        let mut edges = EdgeTable::new();
        for (name, def) in &self.modules {
            let mut sources = Vec::new();
            for v in &self.versions {
                if let Some(allowed) = &def.versions {
                    if !allowed.contains(&v.name) {
                        continue;
                    }
                }
                let Some(branch) = def.branches.get(&v.name).or(v.branch.as_ref()) else {
                    continue;
                };
                sources.push(ModuleSource {
                    version: Version::parse(&v.name)?,
                    descriptor: SourceDescriptor {
                        git: def.git.clone(),
                        branch: branch.clone(),
                        submodules: def.submodules,
                    },
                });
            }
            let when = def.when.as_deref().map(Spec::parse).transpose()?;
            entries.push(ModuleEntry {
                name: name.clone(),
                sources,
                when,
            });
            if !def.requires.is_empty() {
                edges.insert(name.clone(), def.requires.iter().cloned().collect());
            }
        }
        Ok(ModuleTable::new(entries, edges))
    }

    /// Declared versions in preference order.
    pub fn parsed_versions(&self) -> Result<Vec<Version>, DunepackError> {
        self.versions.iter().map(|v| Version::parse(&v.name)).collect()
    }

    /// The preferred version satisfying `constraint`: the first declared
    /// match, or the first declared version when unconstrained.
    pub fn select_version(
        &self,
        constraint: Option<&VersionConstraint>,
    ) -> Result<Version, DunepackError> {
        self.parsed_versions()?
            .into_iter()
            .find(|v| constraint.map_or(true, |c| c.matches(v)))
            .ok_or_else(|| DunepackError::UnknownVersion {
                package: self.package.name.clone(),
                constraint: constraint.map(|c| c.to_string()).unwrap_or_default(),
            })
    }

    pub fn version_entry(&self, version: &Version) -> Option<&VersionEntry> {
        self.versions
            .iter()
            .find(|v| Version::parse(&v.name).is_ok_and(|p| &p == version))
    }

    /// Variants that are on unless the request turns them off.
    pub fn default_variants(&self) -> BTreeSet<String> {
        self.variants
            .iter()
            .filter(|(_, def)| def.default)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[package]
name = "demo"
git = "https://example.org/demo.git"

[[version]]
name = "2.7"
branch = "releases/2.7"

[[version]]
name = "master"
branch = "master"

[variants.shared]
default = true

[variants.grid]
module = "demo-grid"

[modules.demo-grid]
git = "https://example.org/demo-grid.git"
requires = ["demo-geometry"]

[modules.demo-geometry]
git = "https://example.org/demo-geometry.git"
versions = ["2.7"]
"#;

    #[test]
    fn parses_minimal_recipe() {
        let recipe = Recipe::from_str(MINIMAL).unwrap();
        assert_eq!(recipe.name(), "demo");
        assert_eq!(recipe.versions.len(), 2);
        assert_eq!(recipe.build.system, BuildSystem::Cmake);
        assert!(recipe.build.parallel);
        assert_eq!(recipe.default_variants().into_iter().collect::<Vec<_>>(), vec!["shared"]);
    }

    #[test]
    fn module_table_follows_version_branches() {
        let recipe = Recipe::from_str(MINIMAL).unwrap();
        let table = recipe.module_table().unwrap();
        let grid = table.get("demo-grid").unwrap();
        assert_eq!(grid.sources.len(), 2);
        let master = grid.source_for(&Version::parse("master").unwrap()).unwrap();
        assert_eq!(master.branch, "master");

        let geometry = table.get("demo-geometry").unwrap();
        assert_eq!(geometry.sources.len(), 1);
        assert!(geometry.source_for(&Version::parse("master").unwrap()).is_none());

        assert_eq!(
            table.edges().get("demo-grid").unwrap().iter().collect::<Vec<_>>(),
            vec!["demo-geometry"]
        );
        assert!(!table.edges().contains_key("demo-geometry"));
    }

    #[test]
    fn select_version_prefers_first_declared() {
        let recipe = Recipe::from_str(MINIMAL).unwrap();
        assert_eq!(recipe.select_version(None).unwrap().as_str(), "2.7");
        let c = VersionConstraint::parse("2.7:").unwrap();
        assert_eq!(recipe.select_version(Some(&c)).unwrap().as_str(), "2.7");
        let c = VersionConstraint::parse("2.6").unwrap();
        assert!(matches!(
            recipe.select_version(Some(&c)),
            Err(DunepackError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn rejects_unknown_required_module() {
        let bad = MINIMAL.replace(r#"requires = ["demo-geometry"]"#, r#"requires = ["demo-nope"]"#);
        let err = Recipe::from_str(&bad).unwrap_err();
        assert!(matches!(err, DunepackError::UnknownModule { ref module, .. } if module == "demo-nope"));
    }

    #[test]
    fn rejects_variant_for_missing_module() {
        let bad = MINIMAL.replace(r#"module = "demo-grid""#, r#"module = "demo-missing""#);
        assert!(matches!(
            Recipe::from_str(&bad),
            Err(DunepackError::UnknownModule { .. })
        ));
    }

    #[test]
    fn rejects_predicate_with_unknown_variant() {
        let bad = format!("{MINIMAL}\n[[patches]]\nfile = \"x.patch\"\nwhen = \"+nope\"\n");
        assert!(matches!(
            Recipe::from_str(&bad),
            Err(DunepackError::UnknownVariant { ref variant, .. }) if variant == "nope"
        ));
    }

    #[test]
    fn rejects_module_with_undeclared_version() {
        let bad = MINIMAL.replace(r#"versions = ["2.7"]"#, r#"versions = ["2.5"]"#);
        let err = Recipe::from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("undeclared version '2.5'"), "got: {err}");
    }

    #[test]
    fn rejects_recipe_without_versions() {
        let err = Recipe::from_str("[package]\nname = \"empty\"\n").unwrap_err();
        assert!(err.to_string().contains("declares no versions"), "got: {err}");
    }

    #[test]
    fn rejects_flag_without_value() {
        let bad = format!("{MINIMAL}\n[[flags]]\nname = \"FOO\"\n");
        assert!(Recipe::from_str(&bad).is_err());
    }

    #[test]
    fn rejects_module_dependency_cycle() {
        let bad = MINIMAL.replace(
            "versions = [\"2.7\"]",
            "versions = [\"2.7\"]\nrequires = [\"demo-grid\"]",
        );
        let err = Recipe::from_str(&bad).unwrap_err();
        assert!(matches!(
            err,
            DunepackError::DependencyCycle { ref cycle } if cycle == &["demo-geometry", "demo-grid"]
        ));
    }

    #[test]
    fn rejects_module_requiring_itself() {
        let bad = MINIMAL.replace(
            r#"requires = ["demo-geometry"]"#,
            r#"requires = ["demo-geometry", "demo-grid"]"#,
        );
        assert!(matches!(
            Recipe::from_str(&bad),
            Err(DunepackError::DependencyCycle { ref cycle }) if cycle == &["demo-grid"]
        ));
    }

    #[test]
    fn rejects_when_on_variant_module() {
        let bad = MINIMAL.replace(
            r#"requires = ["demo-geometry"]"#,
            "requires = [\"demo-geometry\"]\nwhen = \"+shared\"",
        );
        let err = Recipe::from_str(&bad).unwrap_err();
        assert!(
            err.to_string()
                .contains("module 'demo-grid' is enabled by variant 'grid' and cannot have a `when`"),
            "got: {err}"
        );
    }

    #[test]
    fn accepts_when_on_variantless_module() {
        let ok = MINIMAL.replace(
            r#"versions = ["2.7"]"#,
            "versions = [\"2.7\"]\nwhen = \"+shared\"",
        );
        let recipe = Recipe::from_str(&ok).unwrap();
        let table = recipe.module_table().unwrap();
        assert!(table.get("demo-geometry").unwrap().when.is_some());
    }

    #[test]
    fn dependency_types_default_to_build_and_link() {
        let with_dep = format!("{MINIMAL}\n[[dependencies]]\nspec = \"mpi\"\n");
        let recipe = Recipe::from_str(&with_dep).unwrap();
        assert_eq!(
            recipe.dependencies[0].types,
            vec![DependencyType::Build, DependencyType::Link]
        );
    }
}
