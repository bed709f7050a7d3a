//! Workspace dependency graph
//!
//! Nodes live in an arena keyed by package name; edges are stored as
//! name-sets on each node rather than references, so pruning is removal from
//! the arena plus removal of the name from neighboring sets. The graph is
//! built once per command invocation and mutated in place as batches are
//! produced.

pub mod batches;
pub mod cycles;

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::error::{GraphError, Result};
use crate::package::{range_satisfied, Package};

/// A node wrapping one package plus its intra-workspace relationships
#[derive(Debug, Clone)]
pub struct PackageNode {
    /// The underlying package
    pub package: Package,
    /// Names of workspace packages this one depends on
    pub local_dependencies: BTreeSet<String>,
    /// Names of workspace packages depending on this one
    pub local_dependents: BTreeSet<String>,
}

/// Directed graph of intra-workspace dependencies
#[derive(Debug, Clone)]
pub struct PackageGraph {
    nodes: HashMap<String, PackageNode>,
    /// Name-sorted iteration order, stable across mutations
    order: Vec<String>,
}

impl PackageGraph {
    /// Build the graph from a point-in-time package list.
    ///
    /// A directed edge consumer → provider exists only when the provider is
    /// itself a workspace package whose current version satisfies the
    /// declared range, or the range uses an always-local protocol marker.
    #[instrument(skip_all, fields(packages = packages.len()))]
    pub fn build(packages: &[Package]) -> Self {
        let mut nodes: HashMap<String, PackageNode> = packages
            .iter()
            .map(|pkg| {
                (
                    pkg.name.clone(),
                    PackageNode {
                        package: pkg.clone(),
                        local_dependencies: BTreeSet::new(),
                        local_dependents: BTreeSet::new(),
                    },
                )
            })
            .collect();

        let versions: HashMap<&str, &semver::Version> = packages
            .iter()
            .map(|p| (p.name.as_str(), &p.version))
            .collect();

        for pkg in packages {
            for (_kind, dep_name, range) in pkg.dependency_entries() {
                let Some(&provider_version) = versions.get(dep_name) else {
                    continue;
                };
                if dep_name == pkg.name {
                    continue;
                }
                if !range_satisfied(range, provider_version) {
                    debug!(
                        consumer = %pkg.name,
                        provider = dep_name,
                        range,
                        "declared range does not match workspace copy; no edge"
                    );
                    continue;
                }
                if let Some(node) = nodes.get_mut(&pkg.name) {
                    node.local_dependencies.insert(dep_name.to_string());
                }
                if let Some(node) = nodes.get_mut(dep_name) {
                    node.local_dependents.insert(pkg.name.clone());
                }
            }
        }

        let mut order: Vec<String> = nodes.keys().cloned().collect();
        order.sort();

        Self { nodes, order }
    }

    /// Look up a node by package name.
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Number of nodes currently in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when every node has been pruned.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Package names in stable (sorted) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Nodes in stable (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = &PackageNode> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Detect reference cycles with a single-pass walk over
    /// `local_dependencies`, tracking the active path; revisiting a node on
    /// the active path records one simple cycle (the sub-path from its first
    /// occurrence to the current node).
    ///
    /// This is a heuristic detector, not exhaustive enumeration; overlapping
    /// cycles it does find are merged downstream into disjoint clusters.
    ///
    /// With `reject_on_cycle` any detected cycle is a fatal validation error
    /// listing every cycle path; otherwise a warning is emitted and the
    /// cycles are returned for clustering.
    #[instrument(skip(self), fields(nodes = self.nodes.len()))]
    pub fn partition_cycles(
        &self,
        reject_on_cycle: bool,
    ) -> Result<(Vec<Vec<String>>, HashSet<String>)> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut cycle_paths: Vec<Vec<String>> = Vec::new();

        for start in &self.order {
            if visited.contains(start) {
                continue;
            }
            let mut path: Vec<String> = Vec::new();
            self.walk(start, &mut path, &mut visited, &mut cycle_paths);
        }

        let cycle_nodes: HashSet<String> = cycle_paths.iter().flatten().cloned().collect();

        if !cycle_paths.is_empty() {
            let rendered: Vec<String> = cycle_paths
                .iter()
                .map(|p| {
                    let mut loop_path = p.clone();
                    loop_path.push(p[0].clone());
                    loop_path.join(" -> ")
                })
                .collect();

            if reject_on_cycle {
                return Err(GraphError::CyclicDependency(rendered).into());
            }
            warn!(
                cycles = cycle_paths.len(),
                paths = %rendered.join("; "),
                "dependency cycles detected; cycle members will be batched last"
            );
        }

        Ok((cycle_paths, cycle_nodes))
    }

    fn walk(
        &self,
        current: &str,
        path: &mut Vec<String>,
        visited: &mut HashSet<String>,
        cycle_paths: &mut Vec<Vec<String>>,
    ) {
        if let Some(pos) = path.iter().position(|n| n == current) {
            cycle_paths.push(path[pos..].to_vec());
            return;
        }
        if visited.contains(current) {
            return;
        }

        path.push(current.to_string());
        if let Some(node) = self.nodes.get(current) {
            for dep in &node.local_dependencies {
                self.walk(dep, path, visited, cycle_paths);
            }
        }
        path.pop();
        visited.insert(current.to_string());
    }

    /// Remove cycle-node names from every other node's dependency
    /// accounting so batching can make progress on the acyclic remainder.
    /// The cycle nodes themselves stay in the graph.
    pub fn prune_cycle_nodes(&mut self, cycle_nodes: &HashSet<String>) {
        for (name, node) in self.nodes.iter_mut() {
            if cycle_nodes.contains(name) {
                continue;
            }
            node.local_dependencies
                .retain(|dep| !cycle_nodes.contains(dep));
            node.local_dependents
                .retain(|dep| !cycle_nodes.contains(dep));
        }
    }

    /// Remove the given nodes entirely, also deleting them from every
    /// remaining node's relationship sets.
    pub fn prune<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed: HashSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect();

        self.nodes.retain(|name, _| !removed.contains(name));
        self.order.retain(|name| !removed.contains(name));

        for node in self.nodes.values_mut() {
            node.local_dependencies.retain(|n| !removed.contains(n));
            node.local_dependents.retain(|n| !removed.contains(n));
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use semver::Version;

    use crate::package::Package;

    /// Build an in-memory package with caret ranges on the given deps.
    pub fn package(name: &str, version: &str, deps: &[&str]) -> Package {
        let dependencies: BTreeMap<String, String> = deps
            .iter()
            .map(|d| (d.to_string(), "^1.0.0".to_string()))
            .collect();
        Package {
            name: name.to_string(),
            version: Version::parse(version).unwrap(),
            location: PathBuf::from(format!("packages/{}", name)),
            manifest_path: PathBuf::from(format!("packages/{}/package.json", name)),
            private: false,
            dependencies,
            dev_dependencies: BTreeMap::new(),
            peer_dependencies: BTreeMap::new(),
            scripts: BTreeMap::new(),
        }
    }
}
