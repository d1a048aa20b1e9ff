//! Operations: `list` and `info`.

use std::fmt::Write as _;

use dunepack_core::recipe::Recipe;
use dunepack_core::repository::RecipeRepository;
use dunepack_core::version::Version;

use crate::ops_setup::Context;

pub fn list(ctx: &Context) -> miette::Result<()> {
    print!("{}", format_list(&ctx.repository));
    Ok(())
}

/// One line per package: name, preferred version, description.
pub fn format_list(repository: &RecipeRepository) -> String {
    if repository.is_empty() {
        return "No recipes found.\n".to_string();
    }
    let mut out = String::new();
    for recipe in repository.iter() {
        let preferred = recipe.versions.first().map_or("-", |v| v.name.as_str());
        let _ = writeln!(
            out,
            "{:<20} {:<8} {}",
            recipe.name(),
            preferred,
            recipe.package.description.as_deref().unwrap_or("")
        );
    }
    out
}

pub fn info(ctx: &Context, package: &str) -> miette::Result<()> {
    print!("{}", format_info(ctx.recipe(package)?));
    Ok(())
}

pub fn format_info(recipe: &Recipe) -> String {
    let pkg = &recipe.package;
    let mut out = String::new();
    let _ = writeln!(out, "{}", pkg.name);
    if let Some(desc) = &pkg.description {
        let _ = writeln!(out, "  {desc}");
    }
    if let Some(home) = &pkg.homepage {
        let _ = writeln!(out, "  homepage: {home}");
    }
    if !pkg.maintainers.is_empty() {
        let _ = writeln!(out, "  maintainers: {}", pkg.maintainers.join(", "));
    }
    if let Some(ext) = &pkg.extends {
        let _ = writeln!(out, "  extends: {ext}");
    }

    let _ = writeln!(out, "\nVersions:");
    for v in &recipe.versions {
        match (&v.branch, &v.sha256) {
            (Some(branch), _) => {
                let line = Version::parse(&v.name).is_ok_and(|p| p.is_development());
                let suffix = if line { " (development)" } else { "" };
                let _ = writeln!(out, "  {:<10} branch {branch}{suffix}", v.name);
            }
            (None, Some(sha)) => {
                let _ = writeln!(out, "  {:<10} sha256 {sha}", v.name);
            }
            (None, None) => {
                let _ = writeln!(out, "  {}", v.name);
            }
        }
    }

    if !recipe.variants.is_empty() {
        let _ = writeln!(out, "\nVariants:");
        for (name, def) in &recipe.variants {
            let sigil = if def.default { '+' } else { '~' };
            let _ = write!(out, "  {sigil}{name:<18}");
            if let Some(desc) = &def.description {
                let _ = write!(out, " {desc}");
            }
            if let Some(module) = &def.module {
                let _ = write!(out, " [{module}]");
            }
            out.push('\n');
        }
    }

    if !recipe.modules.is_empty() {
        let _ = writeln!(out, "\nModules:");
        for (name, def) in &recipe.modules {
            let _ = write!(out, "  {name}");
            if !def.requires.is_empty() {
                let _ = write!(out, " -> {}", def.requires.join(", "));
            }
            if let Some(versions) = &def.versions {
                let _ = write!(out, " (only {})", versions.join(", "));
            }
            if let Some(when) = &def.when {
                let _ = write!(out, " when {when}");
            }
            out.push('\n');
        }
    }

    if !recipe.dependencies.is_empty() {
        let _ = writeln!(out, "\nDependencies:");
        for dep in &recipe.dependencies {
            match &dep.when {
                Some(when) => {
                    let _ = writeln!(out, "  {} when {when}", dep.spec);
                }
                None => {
                    let _ = writeln!(out, "  {}", dep.spec);
                }
            }
        }
    }
    out
}
