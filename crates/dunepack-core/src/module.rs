//! Compiled module tables: per-version source descriptors, the
//! module dependency edges and the variant↔module bijection.
//!
//! These are built once from a [`Recipe`](crate::recipe::Recipe) and never
//! mutated afterwards; the resolver only reads them.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use dunepack_util::errors::DunepackError;

use crate::spec::Spec;
use crate::version::Version;

/// Adjacency map from a module to the modules it requires directly.
pub type EdgeTable = BTreeMap<String, BTreeSet<String>>;

/// Where to fetch a module's source for one package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub git: String,
    pub branch: String,
    pub submodules: bool,
}

/// A source descriptor tagged with the package version it applies to.
#[derive(Debug, Clone)]
pub struct ModuleSource {
    pub version: Version,
    pub descriptor: SourceDescriptor,
}

/// One optional source module of a package.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub name: String,
    pub sources: Vec<ModuleSource>,
    /// Extra activation predicate for modules without a variant, e.g. `+fem+python`.
    pub when: Option<Spec>,
}

impl ModuleEntry {
    /// The descriptor for `version`, if the module exists at that version.
    pub fn source_for(&self, version: &Version) -> Option<&SourceDescriptor> {
        self.sources
            .iter()
            .find(|s| &s.version == version)
            .map(|s| &s.descriptor)
    }
}

/// All modules of a package plus their declared dependency edges.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    modules: BTreeMap<String, ModuleEntry>,
    edges: EdgeTable,
}

impl ModuleTable {
    pub fn new(modules: Vec<ModuleEntry>, edges: EdgeTable) -> Self {
        Self {
            modules: modules.into_iter().map(|m| (m.name.clone(), m)).collect(),
            edges,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleEntry> {
        self.modules.values()
    }

    /// Direct dependency edges as declared (not transitively closed).
    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Members of the first dependency cycle in `edges`, sorted by name.
///
/// Self-edges count as cycles of one. Of several cycles the one whose
/// sorted member list is smallest is returned.
pub fn find_cycle(edges: &EdgeTable) -> Option<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (from, targets) in edges {
        graph.add_node(from.as_str());
        for to in targets {
            graph.add_edge(from.as_str(), to.as_str(), ());
        }
    }
    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut names: Vec<String> = scc.into_iter().map(str::to_string).collect();
            names.sort();
            names
        })
        .collect();
    cycles.sort();
    cycles.into_iter().next()
}

/// The fixed bijection between module variants and the modules they enable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantMap {
    to_module: BTreeMap<String, String>,
    to_variant: BTreeMap<String, String>,
}

impl VariantMap {
    /// Build the map from `(variant, module)` pairs.
    ///
    /// Fails if a variant or a module appears twice, since the mapping must
    /// be invertible.
    pub fn new<I, V, M>(pairs: I) -> Result<Self, DunepackError>
    where
        I: IntoIterator<Item = (V, M)>,
        V: Into<String>,
        M: Into<String>,
    {
        let mut map = Self::default();
        for (variant, module) in pairs {
            let (variant, module) = (variant.into(), module.into());
            if let Some(existing) = map.to_variant.get(&module) {
                return Err(DunepackError::Recipe {
                    message: format!(
                        "module '{module}' is mapped by both '{existing}' and '{variant}'"
                    ),
                });
            }
            if map.to_module.contains_key(&variant) {
                return Err(DunepackError::Recipe {
                    message: format!("variant '{variant}' is mapped twice"),
                });
            }
            map.to_variant.insert(module.clone(), variant.clone());
            map.to_module.insert(variant, module);
        }
        Ok(map)
    }

    pub fn module_of(&self, variant: &str) -> Option<&str> {
        self.to_module.get(variant).map(String::as_str)
    }

    pub fn variant_of(&self, module: &str) -> Option<&str> {
        self.to_variant.get(module).map(String::as_str)
    }

    /// `(variant, module)` pairs in variant order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.to_module.iter().map(|(v, m)| (v.as_str(), m.as_str()))
    }

    pub fn len(&self) -> usize {
        self.to_module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_module.is_empty()
    }
}
