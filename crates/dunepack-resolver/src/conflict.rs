//! Variant conflict derivation and reporting.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use dunepack_core::module::VariantMap;

use crate::closure::ClosureTable;

/// "Enabling `variant` without `requires` is invalid."
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConflictRule {
    pub variant: String,
    pub requires: String,
}

impl ConflictRule {
    /// Whether `enabled` breaks this rule.
    pub fn is_violated_by(&self, enabled: &BTreeSet<String>) -> bool {
        enabled.contains(&self.variant) && !enabled.contains(&self.requires)
    }
}

impl fmt::Display for ConflictRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} requires +{}", self.variant, self.requires)
    }
}

/// The derived rules of one package, in sorted order.
pub type ConflictSet = BTreeSet<ConflictRule>;

/// Emit `(variant(M), variant(N))` for every `N` in `closure(M)` where both
/// modules carry a variant. Modules without a variant never appear in a rule.
pub fn derive_conflicts(closure: &ClosureTable, variants: &VariantMap) -> ConflictSet {
    let mut rules = ConflictSet::new();
    for (module, required) in closure.iter() {
        let Some(variant) = variants.variant_of(module) else {
            continue;
        };
        for dep in required {
            if let Some(requires) = variants.variant_of(dep) {
                rules.insert(ConflictRule {
                    variant: variant.to_string(),
                    requires: requires.to_string(),
                });
            }
        }
    }
    tracing::debug!("derived {} variant conflict rules", rules.len());
    rules
}

/// A recipe-level conflict listed next to the derived rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredRule {
    pub spec: String,
    pub when: Option<String>,
    pub reason: Option<String>,
}

/// Every conflict that applies to one package.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub package: String,
    pub derived: ConflictSet,
    pub declared: Vec<DeclaredRule>,
}

impl ConflictReport {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.derived.is_empty() && self.declared.is_empty()
    }

    pub fn len(&self) -> usize {
        self.derived.len() + self.declared.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No conflicts for {}.", self.package);
        }
        if !self.derived.is_empty() {
            writeln!(f, "Variant requirements ({}):", self.derived.len())?;
            for rule in &self.derived {
                writeln!(f, "  {rule}")?;
            }
        }
        if !self.declared.is_empty() {
            writeln!(f, "Declared conflicts ({}):", self.declared.len())?;
            for c in &self.declared {
                write!(f, "  {}", c.spec)?;
                if let Some(when) = &c.when {
                    write!(f, " when {when}")?;
                }
                if let Some(reason) = &c.reason {
                    write!(f, " ({reason})")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
