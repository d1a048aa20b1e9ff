//! Handler for `dunepack list`.

use miette::Result;

use dunepack_ops::ops_setup::Context;

pub fn exec(ctx: &Context) -> Result<()> {
    dunepack_ops::ops_info::list(ctx)
}
