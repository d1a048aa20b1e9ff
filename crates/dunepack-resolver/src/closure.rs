//! Transitive closure of the module dependency table.

use std::collections::{BTreeMap, BTreeSet};

use dunepack_core::module::EdgeTable;

static NO_MODULES: BTreeSet<String> = BTreeSet::new();

/// Every module mapped to the full set of modules it transitively requires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureTable {
    table: BTreeMap<String, BTreeSet<String>>,
}

impl ClosureTable {
    /// Modules `module` requires directly or transitively. Modules without
    /// declared dependencies map to the empty set.
    pub fn requires(&self, module: &str) -> &BTreeSet<String> {
        self.table.get(module).unwrap_or(&NO_MODULES)
    }

    pub fn contains(&self, module: &str, required: &str) -> bool {
        self.requires(module).contains(required)
    }

    /// `modules` plus everything they require.
    pub fn expand<'a>(&self, modules: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for m in modules {
            out.extend(self.requires(m).iter().cloned());
            out.insert(m.to_string());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.table.iter()
    }

    /// The closure as a plain adjacency map, suitable as input to [`compute_closure`].
    pub fn as_edges(&self) -> &EdgeTable {
        &self.table
    }
}

/// Close `edges` under transitivity.
///
/// Repeated passes union into each module's set the sets of everything it
/// already contains. Sets only grow and are bounded by the number of
/// modules, so the loop stops after the first full pass in which no set
/// changed size. Declaration order does not matter.
///
/// A module on a cycle ends up requiring itself; callers that must reject
/// cycles check with [`crate::graph::ModuleGraph`] first.
pub fn compute_closure(edges: &EdgeTable) -> ClosureTable {
    let mut table: BTreeMap<String, BTreeSet<String>> = edges.clone();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut grown = false;
        let modules: Vec<String> = table.keys().cloned().collect();
        for module in &modules {
            let before = table[module].len();
            let mut next = table[module].clone();
            for required in &table[module] {
                if let Some(indirect) = table.get(required) {
                    next.extend(indirect.iter().cloned());
                }
            }
            if next.len() != before {
                grown = true;
                table.insert(module.clone(), next);
            }
        }
        if !grown {
            break;
        }
    }
    tracing::debug!("module closure reached a fixed point after {passes} passes");
    ClosureTable { table }
}
