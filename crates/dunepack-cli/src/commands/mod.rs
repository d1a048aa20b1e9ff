//! Command dispatch and handler modules.

mod check;
mod conflicts;
mod flags;
mod info;
mod list;
mod opts;
mod resolve;
mod tree;

use miette::Result;

use dunepack_ops::ops_setup::Context;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.recipes.as_deref())?;
    match cli.command {
        Command::List => list::exec(&ctx),
        Command::Info { package } => info::exec(&ctx, &package),
        Command::Resolve { spec, prefix, json } => resolve::exec(&ctx, &spec, prefix, json),
        Command::Flags { spec } => flags::exec(&ctx, &spec),
        Command::Opts { spec, prefix } => opts::exec(&ctx, &spec, &prefix),
        Command::Tree {
            package,
            module,
            inverted,
            depth,
        } => tree::exec(&ctx, &package, module, inverted, depth),
        Command::Conflicts { package } => conflicts::exec(&ctx, &package),
        Command::Check => check::exec(&ctx),
    }
}
