//! Operation: list the conflicts that apply to a package.

use dunepack_resolver::conflict::{ConflictReport, DeclaredRule};
use dunepack_util::errors::DunepackError;

use crate::ops_setup::Context;

pub fn conflicts(ctx: &Context, package: &str) -> miette::Result<()> {
    let report = conflict_report(ctx, package)?;
    print!("{report}");
    Ok(())
}

/// Derived variant requirements plus the recipe's declared conflicts.
pub fn conflict_report(ctx: &Context, package: &str) -> Result<ConflictReport, DunepackError> {
    let recipe = ctx.recipe(package)?;
    let resolver = ctx.resolver(package)?;
    let mut report = ConflictReport::new(recipe.name());
    report.derived = resolver.conflicts().clone();
    report.declared = recipe
        .conflicts
        .iter()
        .map(|c| DeclaredRule {
            spec: c.spec.clone(),
            when: c.when.clone(),
            reason: c.reason.clone(),
        })
        .collect();
    Ok(report)
}
