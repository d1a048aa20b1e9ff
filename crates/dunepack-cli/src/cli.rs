//! CLI argument definitions for dunepack.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dunepack",
    version,
    about = "Resolve DUNE package recipes into build plans",
    long_about = "dunepack reads declarative DUNE package recipes, checks a requested \
                  variant set against the module dependency graph, and prints the \
                  sources, CMake flags and build steps an orchestrator needs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Recipe directory (defaults to $DUNEPACK_RECIPES or the nearest recipes/)
    #[arg(long, global = true, env = "DUNEPACK_RECIPES")]
    pub recipes: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available recipes
    List,

    /// Show versions, variants and modules of a package
    Info {
        /// Package name
        package: String,
    },

    /// Resolve a spec into a build plan
    Resolve {
        /// Package spec, e.g. "dune@2.7+pdelab+functions+typetree"
        spec: String,
        /// Install prefix (defaults to the configured prefix template)
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the CMake cache entries for a spec
    Flags {
        /// Package spec
        spec: String,
    },

    /// Print the dunecontrol options file for a spec
    Opts {
        /// Package spec
        spec: String,
        /// Install prefix written into the options file
        #[arg(long)]
        prefix: PathBuf,
    },

    /// Display the module dependency tree of a package
    Tree {
        /// Package name
        package: String,
        /// Start from this module
        module: Option<String>,
        /// Show which modules require the given one
        #[arg(short, long)]
        inverted: bool,
        /// Maximum depth to display
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Show variant requirements and declared conflicts of a package
    Conflicts {
        /// Package name
        package: String,
    },

    /// Plan every recipe and its in-repository dependencies
    Check,
}

pub fn parse() -> Cli {
    Cli::parse()
}
