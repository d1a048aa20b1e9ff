//! Module dependency graph: cycle detection and tree rendering.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use dunepack_core::module::{find_cycle, EdgeTable};
use dunepack_util::errors::DunepackError;

/// The declared "module requires module" edges of one package, backed by petgraph.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl ModuleGraph {
    /// Build the graph over `modules` plus every module named in `edges`.
    ///
    /// Fails with [`DunepackError::DependencyCycle`] if any module can reach
    /// itself, including through a self-edge.
    pub fn new<'a>(
        modules: impl IntoIterator<Item = &'a str>,
        edges: &EdgeTable,
    ) -> Result<Self, DunepackError> {
        let mut g = Self::default();
        for m in modules {
            g.add_module(m);
        }
        for (from, targets) in edges {
            let a = g.add_module(from);
            for to in targets {
                let b = g.add_module(to);
                if !g.graph.contains_edge(a, b) {
                    g.graph.add_edge(a, b, ());
                }
            }
        }
        if let Some(cycle) = find_cycle(edges) {
            return Err(DunepackError::DependencyCycle { cycle });
        }
        Ok(g)
    }

    fn add_module(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn contains(&self, module: &str) -> bool {
        self.index.contains_key(module)
    }

    /// All modules, sorted.
    pub fn modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.graph.node_weights().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Direct requirements of `module`, sorted.
    pub fn requires(&self, module: &str) -> Vec<&str> {
        self.neighbours(module, Direction::Outgoing)
    }

    /// Modules that directly require `module`, sorted.
    pub fn required_by(&self, module: &str) -> Vec<&str> {
        self.neighbours(module, Direction::Incoming)
    }

    fn neighbours(&self, module: &str, dir: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(module) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = if dir == Direction::Outgoing { e.target() } else { e.source() };
                self.graph[other].as_str()
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        out.sort_unstable();
        out
    }

    /// Modules that no other module requires, sorted.
    pub fn roots(&self) -> Vec<&str> {
        self.modules()
            .into_iter()
            .filter(|m| self.required_by(m).is_empty())
            .collect()
    }

    /// Render the requirement tree below `module`.
    pub fn print_tree(&self, module: &str, max_depth: Option<usize>) -> String {
        self.render(module, Direction::Outgoing, max_depth)
    }

    /// Render who requires `module`, transitively.
    pub fn print_inverted_tree(&self, module: &str) -> String {
        self.render(module, Direction::Incoming, None)
    }

    fn render(&self, module: &str, dir: Direction, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        if !self.contains(module) {
            return output;
        }
        output.push_str(module);
        output.push('\n');

        let mut visited = HashSet::new();
        visited.insert(module.to_string());
        let children = self.neighbours(module, dir);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let walk = Walk {
                dir,
                max_depth,
                depth: 1,
            };
            self.render_subtree(&mut output, child, "", i == count - 1, walk, &mut visited);
        }
        output
    }

    fn render_subtree(
        &self,
        output: &mut String,
        module: &str,
        prefix: &str,
        is_last: bool,
        walk: Walk,
        visited: &mut HashSet<String>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{module}\n"));

        if walk.max_depth.is_some_and(|max| walk.depth >= max) {
            return;
        }
        if !visited.insert(module.to_string()) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.neighbours(module, walk.dir);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let next = Walk {
                depth: walk.depth + 1,
                ..walk
            };
            self.render_subtree(output, child, &child_prefix, i == count - 1, next, visited);
        }

        visited.remove(module);
    }
}

#[derive(Clone, Copy)]
struct Walk {
    dir: Direction,
    max_depth: Option<usize>,
    depth: usize,
}
