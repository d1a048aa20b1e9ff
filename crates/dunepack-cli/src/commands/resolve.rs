//! Handler for `dunepack resolve`.

use std::path::PathBuf;

use miette::Result;

use dunepack_ops::ops_resolve::{self, ResolveOptions};
use dunepack_ops::ops_setup::Context;

pub fn exec(ctx: &Context, spec: &str, prefix: Option<PathBuf>, json: bool) -> Result<()> {
    let opts = ResolveOptions { prefix, json };
    ops_resolve::resolve(ctx, spec, &opts)
}
