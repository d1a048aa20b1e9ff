use miette::Result;

use dunepack_ops::ops_setup::Context;

pub fn exec(ctx: &Context, spec: &str) -> Result<()> {
    dunepack_ops::ops_resolve::flags(ctx, spec)
}
