//! Operation: display a package's module dependency tree.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use dunepack_util::errors::DunepackError;

use crate::ops_setup::Context;

/// Options for `dunepack tree`.
#[derive(Debug, Default)]
pub struct TreeOptions {
    /// Start from this module instead of every root.
    pub module: Option<String>,
    /// Show which modules require `module` instead of what it requires.
    pub inverted: bool,
    pub depth: Option<usize>,
}

pub fn tree(ctx: &Context, package: &str, opts: &TreeOptions) -> miette::Result<()> {
    print!("{}", render_tree(ctx, package, opts)?);
    Ok(())
}

pub fn render_tree(
    ctx: &Context,
    package: &str,
    opts: &TreeOptions,
) -> Result<String, DunepackError> {
    let resolver = ctx.resolver(package)?;
    let graph = resolver.graph();

    if let Some(module) = &opts.module {
        if opts.inverted {
            if !graph.contains(module) {
                return Err(DunepackError::UnknownModule {
                    package: package.to_string(),
                    module: module.clone(),
                });
            }
            return Ok(graph.print_inverted_tree(module));
        }
        // Fetching `module` fetches its whole closure.
        let fetched = resolver.expand(&BTreeSet::from([module.clone()]))?;
        let mut out = graph.print_tree(module, opts.depth);
        let _ = writeln!(
            out,
            "\n{module} fetches {} module{}",
            fetched.len(),
            if fetched.len() == 1 { "" } else { "s" }
        );
        return Ok(out);
    }

    if opts.inverted {
        return Err(DunepackError::Generic {
            message: "--inverted needs a module to start from".to_string(),
        });
    }
    let roots = graph.roots();
    if roots.is_empty() {
        return Ok(format!("{package} has no modules.\n"));
    }
    let mut out = String::new();
    for root in roots {
        out.push_str(&graph.print_tree(root, opts.depth));
    }
    Ok(out)
}
