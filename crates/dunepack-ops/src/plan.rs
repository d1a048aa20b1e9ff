//! The orchestrator-facing plan for one build request.
//!
//! A [`Plan`] is pure data: which sources to fetch, which upstream packages
//! must exist, which patches apply, which CMake cache entries to pass and
//! which commands a build orchestrator runs in which order. Nothing here
//! touches the network or spawns a process.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use dunepack_core::module::SourceDescriptor;
use dunepack_core::recipe::{BuildSystem, DependencyType, FlagKind, Recipe};
use dunepack_core::spec::Spec;
use dunepack_core::version::{Version, VersionConstraint};
use dunepack_resolver::flags::FeatureFlag;
use dunepack_resolver::resolver::{BuildConfiguration, VariantResolver};
use dunepack_util::errors::DunepackError;

use crate::concretize::BuildRequest;

/// Where the package's own source comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PackageSource {
    Git {
        url: String,
        branch: String,
        submodules: bool,
    },
    Archive {
        url: String,
        sha256: String,
    },
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSource::Git {
                url,
                branch,
                submodules,
            } => {
                write!(f, "{url} (branch {branch})")?;
                if *submodules {
                    f.write_str(" with submodules")?;
                }
                Ok(())
            }
            PackageSource::Archive { url, sha256 } => write!(f, "{url} (sha256 {sha256})"),
        }
    }
}

/// A module checkout placed inside the package source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: String,
    #[serde(flatten)]
    pub source: SourceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamDependency {
    pub spec: String,
    pub types: Vec<DependencyType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchStep {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

/// One `-D<name>:<type>=<value>` cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmakeFlag {
    pub name: String,
    pub kind: FlagKind,
    pub value: String,
}

impl CmakeFlag {
    pub fn new(name: impl Into<String>, kind: FlagKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }

    pub fn switch(name: impl Into<String>, on: bool) -> Self {
        Self::new(name, FlagKind::Bool, on_off(on))
    }
}

impl fmt::Display for CmakeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-D{}:{}={}", self.name, self.kind.as_cmake(), self.value)
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prepare,
    Configure,
    Build,
    Install,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Prepare => "prepare",
            Phase::Configure => "configure",
            Phase::Build => "build",
            Phase::Install => "install",
        })
    }
}

/// A command for the orchestrator, run from the source root unless
/// `working_dir` says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    pub argv: Vec<String>,
}

impl BuildStep {
    fn new(phase: Phase, argv: Vec<String>) -> Self {
        Self {
            phase,
            working_dir: None,
            argv,
        }
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Install prefix and scratch locations, relative to the source root.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    pub prefix: PathBuf,
    pub build_dir: PathBuf,
    /// dunecontrol options file, written next to the source tree.
    pub opts_file: PathBuf,
}

impl BuildLayout {
    pub fn new(package: &str, prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            build_dir: PathBuf::from("build"),
            opts_file: PathBuf::from("..").join(format!("{package}.opts")),
        }
    }
}

/// Everything an orchestrator needs to build one request.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    #[serde(flatten)]
    pub request: BuildRequest,
    pub prefix: PathBuf,
    pub build_system: BuildSystem,
    pub source: PackageSource,
    pub resources: Vec<Resource>,
    pub dependencies: Vec<UpstreamDependency>,
    pub patches: Vec<PatchStep>,
    pub features: Vec<FeatureFlag>,
    pub cmake_flags: Vec<CmakeFlag>,
    /// Contents of the dunecontrol options file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opts: Option<String>,
    pub steps: Vec<BuildStep>,
}

impl Plan {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn flag(&self, name: &str) -> Option<&CmakeFlag> {
        self.cmake_flags.iter().find(|f| f.name == name)
    }
}

/// Evaluate an optional predicate; an absent one always holds.
fn holds(
    predicate: Option<&str>,
    version: &Version,
    enabled: &BTreeSet<String>,
) -> Result<bool, DunepackError> {
    match predicate {
        Some(p) => Ok(Spec::parse(p)?.matches(version, enabled)),
        None => Ok(true),
    }
}

/// Build the plan for `request`.
///
/// Declared conflicts are checked before the variant set is resolved.
pub fn plan(
    recipe: &Recipe,
    resolver: &VariantResolver,
    request: &BuildRequest,
    layout: &BuildLayout,
) -> Result<Plan, DunepackError> {
    let version = &request.version;
    let enabled = &request.variants;

    check_declared_conflicts(recipe, version, enabled)?;

    let config = resolver.resolve(enabled)?;
    let resources = resources(recipe, resolver, &config, version, enabled)?;
    tracing::debug!("{request} resolves to {} resources", resources.len());

    let mut dependencies = Vec::new();
    for dep in &recipe.dependencies {
        if holds(dep.when.as_deref(), version, enabled)? {
            dependencies.push(UpstreamDependency {
                spec: dep.spec.clone(),
                types: dep.types.clone(),
            });
        }
    }

    let mut patches = Vec::new();
    for patch in &recipe.patches {
        if holds(patch.when.as_deref(), version, enabled)? {
            patches.push(PatchStep {
                file: patch.file.clone(),
                working_dir: patch.working_dir.clone(),
            });
        }
    }

    let cmake_flags = cmake_flags(recipe, request, layout, resolver, &config)?;
    let opts = match recipe.build.system {
        BuildSystem::Dunecontrol => Some(render_opts(
            &cmake_flags,
            &layout.prefix,
            recipe.build.parallel,
        )),
        _ => None,
    };
    let steps = build_steps(recipe, request, layout, &cmake_flags)?;

    Ok(Plan {
        request: request.clone(),
        prefix: layout.prefix.clone(),
        build_system: recipe.build.system,
        source: package_source(recipe, version)?,
        resources,
        dependencies,
        patches,
        features: config.features,
        cmake_flags,
        opts,
        steps,
    })
}

fn check_declared_conflicts(
    recipe: &Recipe,
    version: &Version,
    enabled: &BTreeSet<String>,
) -> Result<(), DunepackError> {
    for conflict in &recipe.conflicts {
        if holds(Some(conflict.spec.as_str()), version, enabled)?
            && holds(conflict.when.as_deref(), version, enabled)?
        {
            return Err(DunepackError::DeclaredConflict {
                package: recipe.name().to_string(),
                spec: conflict.spec.clone(),
                when: conflict.when.clone().unwrap_or_default(),
                reason: conflict.reason.clone(),
            });
        }
    }
    Ok(())
}

/// The resolved modules, plus variant-less modules that are always present
/// or whose own predicate holds, each mapped to its source at `version`.
fn resources(
    recipe: &Recipe,
    resolver: &VariantResolver,
    config: &BuildConfiguration,
    version: &Version,
    enabled: &BTreeSet<String>,
) -> Result<Vec<Resource>, DunepackError> {
    let table = recipe.module_table()?;
    let mut wanted = config.modules.clone();
    for entry in table.iter() {
        if resolver.variant_map().variant_of(&entry.name).is_some() {
            continue;
        }
        if let Some(when) = &entry.when {
            if !when.matches(version, enabled) {
                continue;
            }
            // Gated modules may simply not exist at this version.
            if entry.source_for(version).is_none() {
                tracing::debug!("skipping '{}': no source for {version}", entry.name);
                continue;
            }
        }
        wanted.insert(entry.name.clone());
        wanted.extend(resolver.closure().requires(&entry.name).iter().cloned());
    }

    wanted
        .into_iter()
        .map(|name| {
            let source = table
                .get(&name)
                .and_then(|entry| entry.source_for(version))
                .cloned()
                .ok_or_else(|| DunepackError::MissingSource {
                    module: name.clone(),
                    version: version.to_string(),
                })?;
            Ok(Resource { name, source })
        })
        .collect()
}

fn package_source(recipe: &Recipe, version: &Version) -> Result<PackageSource, DunepackError> {
    let entry = recipe
        .version_entry(version)
        .ok_or_else(|| DunepackError::UnknownVersion {
            package: recipe.name().to_string(),
            constraint: version.to_string(),
        })?;
    let missing = |what: &str| DunepackError::Recipe {
        message: format!("package '{}' has no {what} for version {version}", recipe.name()),
    };
    match (&entry.branch, &entry.sha256) {
        (Some(branch), _) => Ok(PackageSource::Git {
            url: recipe.package.git.clone().ok_or_else(|| missing("git url"))?,
            branch: branch.clone(),
            submodules: entry.submodules,
        }),
        (None, Some(sha256)) => {
            let template = recipe.package.url.as_ref().ok_or_else(|| missing("archive url"))?;
            Ok(PackageSource::Archive {
                url: template.replace("{version}", version.as_str()),
                sha256: sha256.clone(),
            })
        }
        (None, None) => Err(missing("branch or sha256")),
    }
}

/// Build type first, then the recipe's flags in declaration order, then one
/// `CMAKE_DISABLE_FIND_PACKAGE_<module>` per module variant.
///
/// `{prefix}` in a flag value becomes the install prefix.
fn cmake_flags(
    recipe: &Recipe,
    request: &BuildRequest,
    layout: &BuildLayout,
    resolver: &VariantResolver,
    config: &BuildConfiguration,
) -> Result<Vec<CmakeFlag>, DunepackError> {
    let version = &request.version;
    let enabled = &request.variants;
    let prefix = layout.prefix.display().to_string();
    let mut flags = vec![CmakeFlag::new(
        "CMAKE_BUILD_TYPE",
        FlagKind::String,
        request.build_type.clone(),
    )];

    for def in &recipe.flags {
        if !holds(def.when.as_deref(), version, enabled)? {
            continue;
        }
        if def.unless.is_some() && holds(def.unless.as_deref(), version, enabled)? {
            continue;
        }
        let value = match (&def.variant, &def.value) {
            (Some(variant), _) => {
                let on = config.feature(variant).is_some_and(|f| f.enabled);
                on_off(on != def.invert).to_string()
            }
            (None, Some(value)) => value.replace("{prefix}", &prefix),
            (None, None) => {
                return Err(DunepackError::Recipe {
                    message: format!("flag '{}' needs a variant or a value", def.name),
                })
            }
        };
        flags.push(CmakeFlag::new(def.name.clone(), def.kind, value));
    }

    for (_, module) in resolver.variant_map().iter() {
        flags.push(CmakeFlag::switch(
            format!("CMAKE_DISABLE_FIND_PACKAGE_{module}"),
            !config.has_module(module),
        ));
    }
    Ok(flags)
}

/// The dunecontrol options file. Double quotes inside flag values become
/// single quotes so the whole list fits in one quoted shell variable.
pub fn render_opts(flags: &[CmakeFlag], prefix: &Path, parallel: bool) -> String {
    let mut out = String::from("CMAKE_FLAGS=\"");
    for flag in flags {
        out.push_str(&flag.to_string().replace('"', "'"));
        out.push(' ');
    }
    out.push_str(&format!("-DCMAKE_INSTALL_PREFIX={}\"", prefix.display()));
    if !parallel {
        out.push_str("\nMAKE_FLAGS=\"-j1\"");
    }
    out.push('\n');
    out
}

fn build_steps(
    recipe: &Recipe,
    request: &BuildRequest,
    layout: &BuildLayout,
    flags: &[CmakeFlag],
) -> Result<Vec<BuildStep>, DunepackError> {
    let version = &request.version;
    let mut steps = Vec::new();

    for prepare in &recipe.prepare {
        if holds(prepare.when.as_deref(), version, &request.variants)? {
            steps.push(BuildStep {
                phase: Phase::Prepare,
                working_dir: prepare.working_dir.clone(),
                argv: prepare.run.split_whitespace().map(str::to_string).collect(),
            });
        }
    }

    let build_dir = layout.build_dir.display().to_string();
    let prefix = layout.prefix.display().to_string();

    match recipe.build.system {
        BuildSystem::Cmake => {
            let mut configure: Vec<String> =
                ["cmake", "-S", ".", "-B", build_dir.as_str()].map(String::from).to_vec();
            configure.extend(flags.iter().map(|f| f.to_string()));
            configure.push(format!("-DCMAKE_INSTALL_PREFIX={prefix}"));
            steps.push(BuildStep::new(Phase::Configure, configure));

            let mut build: Vec<String> = ["cmake", "--build", build_dir.as_str()].map(String::from).to_vec();
            if !recipe.build.parallel {
                build.push("-j1".to_string());
            }
            steps.push(BuildStep::new(Phase::Build, build));

            steps.push(BuildStep::new(
                Phase::Install,
                ["cmake", "--install", build_dir.as_str()].map(String::from).to_vec(),
            ));
        }
        BuildSystem::Dunecontrol => {
            let mut legacy = false;
            for v in &recipe.build.legacy_configure {
                legacy |= VersionConstraint::parse(v)?.matches(version);
            }
            let base = vec![
                "bin/dunecontrol".to_string(),
                format!("--builddir={build_dir}"),
                format!("--opts={}", layout.opts_file.display()),
            ];
            let with = |args: &[&str]| {
                let mut argv = base.clone();
                argv.extend(args.iter().map(|a| a.to_string()));
                argv
            };
            let configure = if legacy { "configure" } else { "cmake" };
            steps.push(BuildStep::new(Phase::Configure, with(&[configure])));
            steps.push(BuildStep::new(Phase::Build, with(&["make"])));
            steps.push(BuildStep::new(Phase::Install, with(&["make", "install"])));
        }
        BuildSystem::CopyHeaders => {
            let headers = recipe.build.headers.as_ref().ok_or_else(|| DunepackError::Recipe {
                message: format!("package '{}' has no [build.headers]", recipe.name()),
            })?;
            let dest = layout.prefix.join(&headers.to).display().to_string();
            steps.push(BuildStep::new(
                Phase::Install,
                vec!["mkdir".to_string(), "-p".to_string(), dest.clone()],
            ));
            steps.push(BuildStep::new(
                Phase::Install,
                vec![
                    "cp".to_string(),
                    "-R".to_string(),
                    format!("{}/.", headers.from),
                    dest,
                ],
            ));
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_rendering() {
        assert_eq!(
            CmakeFlag::switch("BUILD_SHARED_LIBS", true).to_string(),
            "-DBUILD_SHARED_LIBS:BOOL=ON"
        );
        assert_eq!(
            CmakeFlag::new("DUNE_PYTHON_INSTALL_LOCATION", FlagKind::String, "\"system\"")
                .to_string(),
            "-DDUNE_PYTHON_INSTALL_LOCATION:STRING=\"system\""
        );
    }

    #[test]
    fn opts_replace_double_quotes() {
        let flags = vec![
            CmakeFlag::switch("BUILD_SHARED_LIBS", false),
            CmakeFlag::new("DUNE_PYTHON_INSTALL_LOCATION", FlagKind::String, "\"system\""),
        ];
        let opts = render_opts(&flags, Path::new("/opt/dune"), true);
        assert_eq!(
            opts,
            "CMAKE_FLAGS=\"-DBUILD_SHARED_LIBS:BOOL=OFF \
             -DDUNE_PYTHON_INSTALL_LOCATION:STRING='system' \
             -DCMAKE_INSTALL_PREFIX=/opt/dune\"\n"
        );
    }

    #[test]
    fn serial_opts_limit_make_jobs() {
        let opts = render_opts(&[], Path::new("/p"), false);
        assert_eq!(opts, "CMAKE_FLAGS=\"-DCMAKE_INSTALL_PREFIX=/p\"\nMAKE_FLAGS=\"-j1\"\n");
    }

    #[test]
    fn git_source_display() {
        let src = PackageSource::Git {
            url: "https://example.org/x.git".into(),
            branch: "master".into(),
            submodules: true,
        };
        assert_eq!(
            src.to_string(),
            "https://example.org/x.git (branch master) with submodules"
        );
    }

    #[test]
    fn default_layout() {
        let layout = BuildLayout::new("dune", "/opt/dune-2.7");
        assert_eq!(layout.build_dir, PathBuf::from("build"));
        assert_eq!(layout.opts_file, PathBuf::from("../dune.opts"));
    }
}
