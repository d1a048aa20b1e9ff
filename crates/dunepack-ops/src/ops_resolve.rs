//! Operations: `resolve`, `flags` and `opts` for a single spec.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use dunepack_core::recipe::{BuildSystem, DependencyType};
use dunepack_util::errors::DunepackError;

use crate::ops_setup::Context;
use crate::plan::Plan;

/// Options for `dunepack resolve`.
#[derive(Debug, Default)]
pub struct ResolveOptions {
    pub prefix: Option<PathBuf>,
    /// Print the plan as JSON instead of the human-readable summary.
    pub json: bool,
}

/// Resolve `spec` and print its plan.
pub fn resolve(ctx: &Context, spec: &str, opts: &ResolveOptions) -> miette::Result<()> {
    dunepack_util::progress::status("Resolving", spec);
    let plan = ctx.plan(spec, opts.prefix.as_deref())?;
    dunepack_util::progress::status_info(
        "Planned",
        &format!("{} resources, {} steps", plan.resources.len(), plan.steps.len()),
    );
    if opts.json {
        let json = serde_json::to_string_pretty(&plan).map_err(|e| DunepackError::Generic {
            message: format!("Failed to serialize plan: {e}"),
        })?;
        println!("{json}");
    } else {
        print!("{}", format_plan(&plan));
    }
    Ok(())
}

/// Print the CMake cache entries for `spec`, one per line.
pub fn flags(ctx: &Context, spec: &str) -> miette::Result<()> {
    let plan = ctx.plan(spec, None)?;
    for flag in &plan.cmake_flags {
        println!("{flag}");
    }
    Ok(())
}

/// Print the dunecontrol options file for `spec`.
pub fn opts(ctx: &Context, spec: &str, prefix: &Path) -> miette::Result<()> {
    let plan = ctx.plan(spec, Some(prefix))?;
    match plan.opts {
        Some(opts) => {
            print!("{opts}");
            Ok(())
        }
        None => Err(DunepackError::Generic {
            message: format!(
                "package '{}' is not built with dunecontrol",
                plan.request.package
            ),
        }
        .into()),
    }
}

/// Human-readable plan summary.
pub fn format_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", plan.request);
    let _ = writeln!(out, "  prefix: {}", plan.prefix.display());
    let _ = writeln!(out, "  source: {}", plan.source);
    let _ = writeln!(out, "  build system: {}", build_system_name(plan.build_system));

    let _ = writeln!(out, "\nResources ({}):", plan.resources.len());
    for r in &plan.resources {
        let _ = write!(out, "  {:<24} {} ({})", r.name, r.source.git, r.source.branch);
        if r.source.submodules {
            out.push_str(" +submodules");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nDependencies ({}):", plan.dependencies.len());
    for d in &plan.dependencies {
        let types: Vec<&str> = d.types.iter().map(dependency_type_name).collect();
        let _ = writeln!(out, "  {:<40} [{}]", d.spec, types.join(", "));
    }

    if !plan.patches.is_empty() {
        let _ = writeln!(out, "\nPatches ({}):", plan.patches.len());
        for p in &plan.patches {
            match &p.working_dir {
                Some(dir) => {
                    let _ = writeln!(out, "  {} (in {dir})", p.file);
                }
                None => {
                    let _ = writeln!(out, "  {}", p.file);
                }
            }
        }
    }

    if !plan.features.is_empty() {
        let _ = writeln!(out, "\nFeatures:");
        for f in &plan.features {
            let _ = writeln!(out, "  {f}");
        }
    }

    let _ = writeln!(out, "\nSteps:");
    for step in &plan.steps {
        let _ = write!(out, "  {:<10} {}", step.phase.to_string(), step.command_line());
        if let Some(dir) = &step.working_dir {
            let _ = write!(out, "  (in {dir})");
        }
        out.push('\n');
    }
    out
}

fn build_system_name(system: BuildSystem) -> &'static str {
    match system {
        BuildSystem::Cmake => "cmake",
        BuildSystem::Dunecontrol => "dunecontrol",
        BuildSystem::CopyHeaders => "copy-headers",
    }
}

fn dependency_type_name(t: &DependencyType) -> &'static str {
    match t {
        DependencyType::Build => "build",
        DependencyType::Link => "link",
        DependencyType::Run => "run",
        DependencyType::Test => "test",
    }
}
