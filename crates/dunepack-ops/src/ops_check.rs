//! Operation: cross-check every recipe in the repository.
//!
//! Each recipe is planned with its default request, and every dependency
//! that names another recipe in the repository is concretized and planned
//! as written. All failures are collected before reporting.

use std::fmt;

use dunepack_core::spec::Spec;
use dunepack_util::errors::DunepackError;

use crate::ops_setup::Context;

/// One request that failed to plan.
#[derive(Debug)]
pub struct CheckFailure {
    /// The recipe whose check failed, and the spec that was planned.
    pub recipe: String,
    pub spec: String,
    pub error: DunepackError,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.recipe, self.spec, self.error)
    }
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub checked: usize,
    pub failures: Vec<CheckFailure>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Plan every recipe and every in-repository dependency.
pub fn check_repository(ctx: &Context) -> CheckReport {
    let mut report = CheckReport::default();
    for recipe in ctx.repository.iter() {
        let mut specs = vec![recipe.name().to_string()];
        for dep in &recipe.dependencies {
            match Spec::parse(&dep.spec) {
                Ok(spec) if spec.name.as_deref().is_some_and(|n| ctx.repository.contains(n)) => {
                    specs.push(dep.spec.clone());
                }
                Ok(_) => {}
                Err(error) => report.failures.push(CheckFailure {
                    recipe: recipe.name().to_string(),
                    spec: dep.spec.clone(),
                    error,
                }),
            }
        }

        for spec in specs {
            report.checked += 1;
            tracing::debug!("checking {spec} for {}", recipe.name());
            if let Err(error) = ctx.plan(&spec, None) {
                report.failures.push(CheckFailure {
                    recipe: recipe.name().to_string(),
                    spec,
                    error,
                });
            }
        }
    }
    report
}

pub fn check(ctx: &Context) -> miette::Result<()> {
    dunepack_util::progress::status(
        "Checking",
        &format!("{} recipes", ctx.repository.len()),
    );
    let report = check_repository(ctx);
    for failure in &report.failures {
        dunepack_util::progress::status_warn("Failed", &failure.to_string());
    }
    if !report.is_ok() {
        return Err(DunepackError::Generic {
            message: format!(
                "{} of {} checks failed",
                report.failures.len(),
                report.checked
            ),
        }
        .into());
    }
    println!("All {} checks passed.", report.checked);
    Ok(())
}
