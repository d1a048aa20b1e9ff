//! Handler for `dunepack tree`.

use miette::Result;

use dunepack_ops::ops_setup::Context;
use dunepack_ops::ops_tree::{self, TreeOptions};

pub fn exec(
    ctx: &Context,
    package: &str,
    module: Option<String>,
    inverted: bool,
    depth: Option<usize>,
) -> Result<()> {
    let opts = TreeOptions {
        module,
        inverted,
        depth,
    };
    ops_tree::tree(ctx, package, &opts)
}
