//! Handler for `dunepack info`.

use miette::Result;

use dunepack_ops::ops_setup::Context;

pub fn exec(ctx: &Context, package: &str) -> Result<()> {
    dunepack_ops::ops_info::info(ctx, package)
}
