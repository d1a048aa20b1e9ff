use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all dunepack operations.
#[derive(Debug, Error, Diagnostic)]
pub enum DunepackError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed recipe file.
    #[error("Recipe error: {message}")]
    #[diagnostic(help("Check the recipe TOML for typos and undeclared names"))]
    Recipe { message: String },

    /// A spec string (`name@version+variant~variant`) could not be parsed.
    #[error("Invalid spec '{input}': {message}")]
    SpecParse { input: String, message: String },

    /// No recipe with this name is known.
    #[error("Unknown package '{name}'")]
    UnknownPackage { name: String },

    /// No declared version satisfies the requested constraint.
    #[error("Package '{package}' has no version matching '{constraint}'")]
    UnknownVersion { package: String, constraint: String },

    /// A request referenced a variant the recipe does not declare.
    #[error("Package '{package}' has no variant '{variant}'")]
    UnknownVariant { package: String, variant: String },

    /// A module name is absent from the module table.
    #[error("Package '{package}' has no module '{module}'")]
    UnknownModule { package: String, module: String },

    /// An enabled variant transitively requires another variant that is disabled.
    #[error("Variant '+{variant}' requires '+{requires}', which is not enabled")]
    #[diagnostic(help("Enable '+{requires}' or drop '+{variant}'"))]
    ConflictViolation { variant: String, requires: String },

    /// A conflict declared by the recipe itself matched the request.
    #[error(
        "Package '{package}': '{spec}' conflicts with '{when}'{}",
        .reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default()
    )]
    DeclaredConflict {
        package: String,
        spec: String,
        when: String,
        reason: Option<String>,
    },

    /// The module dependency table contains a cycle.
    #[error("Module dependency cycle: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// A required module has no source for the requested version.
    #[error("Module '{module}' has no source for version '{version}'")]
    MissingSource { module: String, version: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}
