//! Handler for `dunepack opts`.

use std::path::Path;

use miette::Result;

use dunepack_ops::ops_setup::Context;

pub fn exec(ctx: &Context, spec: &str, prefix: &Path) -> Result<()> {
    dunepack_ops::ops_resolve::opts(ctx, spec, prefix)
}
