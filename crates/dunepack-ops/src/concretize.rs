//! Turning a spec string into a concrete build request.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use dunepack_core::recipe::Recipe;
use dunepack_core::spec::Spec;
use dunepack_core::version::Version;
use dunepack_util::errors::DunepackError;

/// The only `key=value` setting a request may carry.
pub const BUILD_TYPE_KEY: &str = "build_type";

/// One package at one version with a fixed variant set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    pub package: String,
    pub version: Version,
    pub variants: BTreeSet<String>,
    pub build_type: String,
}

impl fmt::Display for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package, self.version)?;
        for v in &self.variants {
            write!(f, "+{v}")?;
        }
        write!(f, " {BUILD_TYPE_KEY}={}", self.build_type)
    }
}

/// Pick the version and variant set `spec` asks for.
///
/// The version is the first declared one satisfying the constraint. Variants
/// start from the recipe defaults, then `+` and `~` apply on top.
pub fn concretize(
    recipe: &Recipe,
    spec: &Spec,
    default_build_type: &str,
) -> Result<BuildRequest, DunepackError> {
    if let Some(name) = &spec.name {
        if name != recipe.name() {
            return Err(DunepackError::Generic {
                message: format!("spec '{spec}' does not name package '{}'", recipe.name()),
            });
        }
    }

    let version = recipe.select_version(spec.versions.as_ref())?;

    for variant in spec.variant_names() {
        if !recipe.variants.contains_key(variant) {
            return Err(DunepackError::UnknownVariant {
                package: recipe.name().to_string(),
                variant: variant.clone(),
            });
        }
    }
    let mut variants = recipe.default_variants();
    variants.extend(spec.enabled.iter().cloned());
    variants.retain(|v| !spec.disabled.contains(v));

    let mut build_type = default_build_type.to_string();
    for (key, value) in &spec.settings {
        if key != BUILD_TYPE_KEY {
            return Err(DunepackError::UnknownVariant {
                package: recipe.name().to_string(),
                variant: key.clone(),
            });
        }
        build_type = value.clone();
    }

    tracing::debug!("concretized '{spec}' to {}@{}", recipe.name(), version);
    Ok(BuildRequest {
        package: recipe.name().to_string(),
        version,
        variants,
        build_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = r#"
[package]
name = "demo"
git = "https://example.org/demo.git"

[[version]]
name = "2.7"
branch = "releases/2.7"

[[version]]
name = "2.6"
branch = "releases/2.6"

[variants.shared]
default = true

[variants.doc]
"#;

    fn recipe() -> Recipe {
        Recipe::from_str(RECIPE).unwrap()
    }

    fn request(spec: &str) -> Result<BuildRequest, DunepackError> {
        concretize(&recipe(), &Spec::parse(spec).unwrap(), "RelWithDebInfo")
    }

    #[test]
    fn defaults_apply() {
        let req = request("demo").unwrap();
        assert_eq!(req.version.as_str(), "2.7");
        assert_eq!(req.variants.iter().collect::<Vec<_>>(), vec!["shared"]);
        assert_eq!(req.build_type, "RelWithDebInfo");
        assert_eq!(req.to_string(), "demo@2.7+shared build_type=RelWithDebInfo");
    }

    #[test]
    fn overrides_apply() {
        let req = request("demo@2.6~shared+doc build_type=Debug").unwrap();
        assert_eq!(req.version.as_str(), "2.6");
        assert_eq!(req.variants.iter().collect::<Vec<_>>(), vec!["doc"]);
        assert_eq!(req.build_type, "Debug");
    }

    #[test]
    fn anonymous_spec_is_accepted() {
        assert!(request("+doc").is_ok());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            request("demo+nope"),
            Err(DunepackError::UnknownVariant { ref variant, .. }) if variant == "nope"
        ));
        assert!(matches!(
            request("demo precision=double"),
            Err(DunepackError::UnknownVariant { ref variant, .. }) if variant == "precision"
        ));
        assert!(matches!(
            request("demo@3.0"),
            Err(DunepackError::UnknownVersion { .. })
        ));
        assert!(matches!(request("other"), Err(DunepackError::Generic { .. })));
    }
}
