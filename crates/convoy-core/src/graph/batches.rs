//! Topological batching
//!
//! Consumes the dependency graph and emits an ordered sequence of
//! parallel-safe groups: every package appears strictly after all of its
//! dependencies' groups, and no two packages in one group hold a direct
//! dependency edge between them.

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::package::Package;

use super::cycles::merge_overlapping_cycles;
use super::PackageGraph;

/// Produce execution batches from the graph.
///
/// The acyclic remainder is batched by repeated source elimination: every
/// node whose remaining `local_dependencies` set is empty forms one parallel
/// group, is emitted, and is pruned, which may create new sources.
///
/// Cycle clusters are excluded from that accounting up front and contribute
/// two trailing batches each: the cluster anchor (most dependents) alone,
/// then the remaining members together. Strict ordering inside a cycle is
/// impossible; building the highest-fan-in member first is a documented
/// trade-off, not a guarantee.
#[instrument(skip(graph), fields(nodes = graph.len()))]
pub fn build_batches(
    mut graph: PackageGraph,
    reject_on_cycle: bool,
) -> Result<Vec<Vec<Package>>> {
    let (cycle_paths, cycle_nodes) = graph.partition_cycles(reject_on_cycle)?;
    let clusters = merge_overlapping_cycles(&cycle_paths);

    // Resolve anchors and member packages against the intact graph, before
    // cycle edges are stripped from the accounting.
    let mut trailing: Vec<(Vec<Package>, Vec<Package>)> = Vec::new();
    for cluster in &clusters {
        let anchor_name = cluster.anchor(&graph);
        let mut anchor = Vec::new();
        let mut rest = Vec::new();
        for name in &cluster.members {
            let Some(node) = graph.get(name) else { continue };
            if Some(name.as_str()) == anchor_name {
                anchor.push(node.package.clone());
            } else {
                rest.push(node.package.clone());
            }
        }
        trailing.push((anchor, rest));
    }

    graph.prune_cycle_nodes(&cycle_nodes);

    let mut batches: Vec<Vec<Package>> = Vec::new();

    loop {
        let remaining = graph
            .names()
            .filter(|n| !cycle_nodes.contains(*n))
            .count();
        if remaining == 0 {
            break;
        }

        let sources: Vec<String> = graph
            .iter()
            .filter(|node| {
                !cycle_nodes.contains(&node.package.name)
                    && node.local_dependencies.is_empty()
            })
            .map(|node| node.package.name.clone())
            .collect();

        if sources.is_empty() {
            // Undetected entanglement left the remainder without a source.
            // Emit everything left as one group rather than spin forever.
            let leftovers: Vec<String> = graph
                .names()
                .filter(|n| !cycle_nodes.contains(*n))
                .map(String::from)
                .collect();
            warn!(
                packages = %leftovers.join(", "),
                "no dependency-free package remains; batching leftovers together"
            );
            let group: Vec<Package> = leftovers
                .iter()
                .filter_map(|n| graph.get(n).map(|node| node.package.clone()))
                .collect();
            graph.prune(&leftovers);
            batches.push(group);
            break;
        }

        let group: Vec<Package> = sources
            .iter()
            .filter_map(|n| graph.get(n).map(|node| node.package.clone()))
            .collect();
        graph.prune(&sources);
        batches.push(group);
    }

    for (anchor, rest) in trailing {
        if !anchor.is_empty() {
            batches.push(anchor);
        }
        if !rest.is_empty() {
            batches.push(rest);
        }
    }

    debug!(batches = batches.len(), "built execution batches");
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testutil::package;

    fn batch_names(batches: &[Vec<Package>]) -> Vec<Vec<String>> {
        batches
            .iter()
            .map(|group| group.iter().map(|p| p.name.clone()).collect())
            .collect()
    }

    fn position(batches: &[Vec<Package>], name: &str) -> usize {
        batches
            .iter()
            .position(|group| group.iter().any(|p| p.name == name))
            .unwrap_or_else(|| panic!("{} not batched", name))
    }

    #[test]
    fn test_acyclic_total_order() {
        let packages = vec![
            package("core", "1.0.0", &[]),
            package("utils", "1.0.0", &["core"]),
            package("widgets", "1.0.0", &["core"]),
            package("app", "1.0.0", &["utils", "widgets"]),
        ];
        let graph = PackageGraph::build(&packages);
        let batches = build_batches(graph, true).unwrap();

        // Every package appears strictly after all of its dependencies
        assert!(position(&batches, "core") < position(&batches, "utils"));
        assert!(position(&batches, "core") < position(&batches, "widgets"));
        assert!(position(&batches, "utils") < position(&batches, "app"));
        assert!(position(&batches, "widgets") < position(&batches, "app"));

        // utils and widgets are independent: same group
        assert_eq!(position(&batches, "utils"), position(&batches, "widgets"));

        let total: usize = batches.iter().map(|g| g.len()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_no_edge_inside_a_group() {
        let packages = vec![
            package("a", "1.0.0", &[]),
            package("b", "1.0.0", &["a"]),
            package("c", "1.0.0", &["a"]),
            package("d", "1.0.0", &["b", "c"]),
            package("e", "1.0.0", &[]),
        ];
        let graph = PackageGraph::build(&packages);
        let reference = PackageGraph::build(&packages);
        let batches = build_batches(graph, true).unwrap();

        for group in &batches {
            for p in group {
                for q in group {
                    if p.name == q.name {
                        continue;
                    }
                    let node = reference.get(&p.name).unwrap();
                    assert!(
                        !node.local_dependencies.contains(&q.name),
                        "{} and {} share a group but hold an edge",
                        p.name,
                        q.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_cycle_members_only_in_trailing_batches() {
        let packages = vec![
            package("base", "1.0.0", &[]),
            package("mid", "1.0.0", &["base"]),
            // ring1 <-> ring2, and ring2 also needs base
            package("ring1", "1.0.0", &["ring2"]),
            package("ring2", "1.0.0", &["ring1", "base"]),
            // leaf depends into the cycle
            package("leaf", "1.0.0", &["ring1", "mid"]),
        ];
        let graph = PackageGraph::build(&packages);
        let batches = build_batches(graph, false).unwrap();
        let names = batch_names(&batches);

        // Acyclic remainder first: base, mid, leaf in normal batches with no
        // cycle member among them
        let acyclic_batches = names.len() - 2;
        for group in names.iter().take(acyclic_batches) {
            assert!(!group.contains(&"ring1".to_string()));
            assert!(!group.contains(&"ring2".to_string()));
        }

        // Two trailing cluster batches: anchor alone, then the rest
        let anchor_batch = &names[names.len() - 2];
        let rest_batch = &names[names.len() - 1];
        assert_eq!(anchor_batch, &vec!["ring1".to_string()]);
        assert_eq!(rest_batch, &vec!["ring2".to_string()]);
    }

    #[test]
    fn test_anchor_has_most_dependents() {
        let packages = vec![
            package("hub", "1.0.0", &["looper"]),
            package("looper", "1.0.0", &["hub"]),
            package("user1", "1.0.0", &["hub"]),
            package("user2", "1.0.0", &["hub"]),
        ];
        let graph = PackageGraph::build(&packages);
        let batches = build_batches(graph, false).unwrap();
        let names = batch_names(&batches);

        // hub (3 dependents) precedes looper within the trailing batches
        assert_eq!(names[names.len() - 2], vec!["hub".to_string()]);
        assert_eq!(names[names.len() - 1], vec!["looper".to_string()]);
    }

    #[test]
    fn test_rejects_cycles_when_configured() {
        let packages = vec![
            package("a", "1.0.0", &["b"]),
            package("b", "1.0.0", &["a"]),
        ];
        let graph = PackageGraph::build(&packages);
        assert!(build_batches(graph, true).is_err());
    }

    #[test]
    fn test_every_iteration_makes_progress() {
        // A longer chain exercises repeated source elimination
        let packages = vec![
            package("p1", "1.0.0", &[]),
            package("p2", "1.0.0", &["p1"]),
            package("p3", "1.0.0", &["p2"]),
            package("p4", "1.0.0", &["p3"]),
        ];
        let graph = PackageGraph::build(&packages);
        let batches = build_batches(graph, true).unwrap();
        assert_eq!(batches.len(), 4);
        assert!(batches.iter().all(|g| g.len() == 1));
    }
}
