//! Validation and expansion of a requested variant set.

use std::collections::BTreeSet;

use serde::Serialize;

use dunepack_core::module::{EdgeTable, VariantMap};
use dunepack_core::recipe::Recipe;
use dunepack_util::errors::DunepackError;

use crate::closure::{compute_closure, ClosureTable};
use crate::conflict::{derive_conflicts, ConflictSet};
use crate::flags::FeatureFlag;
use crate::graph::ModuleGraph;

/// The outcome of resolving one variant set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
    /// The requested variants, as validated.
    pub variants: BTreeSet<String>,
    /// Every module to fetch: enabled module variants plus their closures.
    pub modules: BTreeSet<String>,
    /// One flag per declared variant, in variant order.
    pub features: Vec<FeatureFlag>,
}

impl BuildConfiguration {
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn feature(&self, variant: &str) -> Option<&FeatureFlag> {
        self.features.iter().find(|f| f.variant == variant)
    }
}

/// Closure, conflict rules and variant table of one package, derived once
/// at load time.
#[derive(Debug, Clone)]
pub struct VariantResolver {
    package: String,
    graph: ModuleGraph,
    closure: ClosureTable,
    conflicts: ConflictSet,
    variant_map: VariantMap,
    variants: BTreeSet<String>,
}

impl VariantResolver {
    /// Derive the tables for `package`.
    ///
    /// `variants` lists every declared variant, module variants included.
    /// Fails with [`DunepackError::DependencyCycle`] if the edges contain a
    /// cycle.
    pub fn new(
        package: impl Into<String>,
        edges: &EdgeTable,
        variant_map: VariantMap,
        variants: BTreeSet<String>,
    ) -> Result<Self, DunepackError> {
        let modules: Vec<String> = variant_map.iter().map(|(_, m)| m.to_string()).collect();
        Self::build(package.into(), &modules, edges, variant_map, variants)
    }

    /// Derive the tables of a loaded recipe. Every declared module shows up
    /// in [`Self::graph`], with or without edges and variants.
    pub fn for_recipe(recipe: &Recipe) -> Result<Self, DunepackError> {
        let table = recipe.module_table()?;
        let modules: Vec<String> = table.iter().map(|m| m.name.clone()).collect();
        Self::build(
            recipe.name().to_string(),
            &modules,
            table.edges(),
            recipe.variant_map()?,
            recipe.variants.keys().cloned().collect(),
        )
    }

    fn build(
        package: String,
        modules: &[String],
        edges: &EdgeTable,
        variant_map: VariantMap,
        variants: BTreeSet<String>,
    ) -> Result<Self, DunepackError> {
        let graph = ModuleGraph::new(modules.iter().map(String::as_str), edges)?;
        let closure = compute_closure(edges);
        let conflicts = derive_conflicts(&closure, &variant_map);
        tracing::debug!(
            "resolver for '{package}': {} modules, {} variants, {} conflict rules",
            graph.modules().len(),
            variants.len(),
            conflicts.len()
        );
        Ok(Self {
            package,
            graph,
            closure,
            conflicts,
            variant_map,
            variants,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub fn closure(&self) -> &ClosureTable {
        &self.closure
    }

    pub fn conflicts(&self) -> &ConflictSet {
        &self.conflicts
    }

    pub fn variant_map(&self) -> &VariantMap {
        &self.variant_map
    }

    /// Check `enabled` against the conflict rules and expand it into the
    /// modules to fetch.
    ///
    /// Unknown variants are reported before any rule is checked. Of several
    /// violated rules, the first in sorted order is reported.
    pub fn resolve(&self, enabled: &BTreeSet<String>) -> Result<BuildConfiguration, DunepackError> {
        if let Some(unknown) = enabled.iter().find(|v| !self.variants.contains(*v)) {
            return Err(DunepackError::UnknownVariant {
                package: self.package.clone(),
                variant: unknown.clone(),
            });
        }
        if let Some(rule) = self.conflicts.iter().find(|r| r.is_violated_by(enabled)) {
            return Err(DunepackError::ConflictViolation {
                variant: rule.variant.clone(),
                requires: rule.requires.clone(),
            });
        }

        let modules = self
            .closure
            .expand(enabled.iter().filter_map(|v| self.variant_map.module_of(v)));
        tracing::debug!(
            "resolved {} variants of '{}' to {} modules",
            enabled.len(),
            self.package,
            modules.len()
        );

        let features = self
            .variants
            .iter()
            .map(|variant| {
                let module = self.variant_map.module_of(variant);
                let on = match module {
                    Some(m) => modules.contains(m),
                    None => enabled.contains(variant),
                };
                FeatureFlag {
                    variant: variant.clone(),
                    module: module.map(str::to_string),
                    enabled: on,
                }
            })
            .collect();

        Ok(BuildConfiguration {
            variants: enabled.clone(),
            modules,
            features,
        })
    }

    /// `modules` plus their closures, without any variant check.
    pub fn expand(&self, modules: &BTreeSet<String>) -> Result<BTreeSet<String>, DunepackError> {
        if let Some(unknown) = modules.iter().find(|m| !self.graph.contains(m)) {
            return Err(DunepackError::UnknownModule {
                package: self.package.clone(),
                module: unknown.clone(),
            });
        }
        Ok(self.closure.expand(modules.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &[&str])]) -> EdgeTable {
        pairs
            .iter()
            .map(|(m, deps)| (m.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resolver(edge_list: &[(&str, &[&str])], pairs: &[(&str, &str)]) -> VariantResolver {
        let map = VariantMap::new(pairs.iter().copied()).unwrap();
        let variants = pairs.iter().map(|(v, _)| v.to_string()).collect();
        VariantResolver::new("dune", &edges(edge_list), map, variants).unwrap()
    }

    const PDELAB_EDGES: &[(&str, &[&str])] = &[
        ("dune-pdelab", &["dune-istl", "dune-functions"]),
        (
            "dune-functions",
            &["dune-grid", "dune-typetree", "dune-localfunctions", "dune-istl"],
        ),
    ];

    const PDELAB_VARIANTS: &[(&str, &str)] = &[
        ("pdelab", "dune-pdelab"),
        ("functions", "dune-functions"),
        ("typetree", "dune-typetree"),
    ];

    #[test]
    fn variantless_requirement_is_fetched() {
        let r = resolver(&[("dune-alugrid", &["dune-grid"])], &[("alugrid", "dune-alugrid")]);
        let config = r.resolve(&set(&["alugrid"])).unwrap();
        assert_eq!(config.modules, set(&["dune-alugrid", "dune-grid"]));
    }

    #[test]
    fn missing_required_variant_is_rejected() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        let err = r.resolve(&set(&["pdelab"])).unwrap_err();
        match err {
            DunepackError::ConflictViolation { variant, requires } => {
                assert_eq!(variant, "pdelab");
                assert_eq!(requires, "functions");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn complete_variant_set_resolves() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        let config = r.resolve(&set(&["pdelab", "functions", "typetree"])).unwrap();
        assert_eq!(
            config.modules,
            set(&[
                "dune-functions",
                "dune-grid",
                "dune-istl",
                "dune-localfunctions",
                "dune-pdelab",
                "dune-typetree"
            ])
        );
    }

    #[test]
    fn three_hop_chain() {
        let chain: &[(&str, &[&str])] = &[("a", &["b"]), ("b", &["c"]), ("c", &["d"])];

        let r = resolver(chain, &[("va", "a"), ("vd", "d")]);
        assert!(r.closure().contains("a", "d"));
        assert_eq!(r.conflicts().len(), 1);
        assert!(r.resolve(&set(&["va"])).is_err());
        assert_eq!(
            r.resolve(&set(&["va", "vd"])).unwrap().modules,
            set(&["a", "b", "c", "d"])
        );

        let r = resolver(chain, &[("va", "a")]);
        assert!(r.closure().contains("a", "d"));
        assert!(r.conflicts().is_empty());
        assert_eq!(r.resolve(&set(&["va"])).unwrap().modules, set(&["a", "b", "c", "d"]));
    }

    #[test]
    fn empty_request_always_resolves() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        let config = r.resolve(&BTreeSet::new()).unwrap();
        assert!(config.modules.is_empty());
        assert!(config.features.iter().all(|f| !f.enabled));
    }

    #[test]
    fn every_rule_is_sound() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        let all: BTreeSet<String> = PDELAB_VARIANTS.iter().map(|(v, _)| v.to_string()).collect();
        for rule in r.conflicts() {
            let mut without = all.clone();
            without.remove(&rule.requires);
            assert!(
                matches!(r.resolve(&without), Err(DunepackError::ConflictViolation { .. })),
                "{rule} should be enforced"
            );
            // The dependent together with everything it needs must pass.
            let needed: BTreeSet<String> = r
                .closure()
                .expand([r.variant_map().module_of(&rule.variant).unwrap()])
                .iter()
                .filter_map(|m| r.variant_map().variant_of(m))
                .map(str::to_string)
                .collect();
            assert!(needed.contains(&rule.requires));
            assert!(r.resolve(&needed).is_ok(), "{needed:?} should resolve");
        }
    }

    #[test]
    fn unknown_variant_is_reported_first() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        let err = r.resolve(&set(&["pdelab", "zzz"])).unwrap_err();
        assert!(matches!(err, DunepackError::UnknownVariant { ref variant, .. } if variant == "zzz"));
    }

    #[test]
    fn features_follow_resolved_modules() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        let config = r.resolve(&set(&["functions", "typetree"])).unwrap();
        assert!(config.feature("functions").unwrap().enabled);
        assert!(config.feature("typetree").unwrap().enabled);
        assert!(!config.feature("pdelab").unwrap().enabled);
        assert_eq!(config.feature("pdelab").unwrap().to_string(), "feature pdelab: OFF");
    }

    #[test]
    fn plain_variants_follow_request() {
        let map = VariantMap::new([("alugrid", "dune-alugrid")]).unwrap();
        let r = VariantResolver::new(
            "dune",
            &edges(&[("dune-alugrid", &["dune-grid"])]),
            map,
            set(&["alugrid", "shared"]),
        )
        .unwrap();
        let config = r.resolve(&set(&["shared"])).unwrap();
        let shared = config.feature("shared").unwrap();
        assert!(shared.enabled);
        assert_eq!(shared.module, None);
        assert!(!config.feature("alugrid").unwrap().enabled);
    }

    #[test]
    fn cyclic_edges_are_rejected() {
        let map = VariantMap::new([("va", "a")]).unwrap();
        let err = VariantResolver::new(
            "demo",
            &edges(&[("a", &["b"]), ("b", &["a"])]),
            map,
            set(&["va"]),
        )
        .unwrap_err();
        assert!(matches!(err, DunepackError::DependencyCycle { ref cycle } if cycle == &["a", "b"]));
    }

    #[test]
    fn expand_rejects_unknown_module() {
        let r = resolver(PDELAB_EDGES, PDELAB_VARIANTS);
        assert_eq!(
            r.expand(&set(&["dune-functions"])).unwrap().len(),
            5
        );
        assert!(matches!(
            r.expand(&set(&["dune-nope"])),
            Err(DunepackError::UnknownModule { .. })
        ));
    }
}
