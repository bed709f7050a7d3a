//! Cycle clustering
//!
//! Raw cycles out of the detector may overlap. A package cannot be ordered
//! relative to another package it mutually depends on, directly or through
//! the same cluster, so overlapping cycles are merged until the clusters are
//! pairwise disjoint and each can be treated as one atomic unit.

use std::collections::BTreeSet;

use tracing::debug;

use super::PackageGraph;

/// A maximal set of mutually-entangled packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCluster {
    /// Member package names
    pub members: BTreeSet<String>,
}

impl CycleCluster {
    /// The member built first: the one with the most dependents in the full
    /// graph, so later cluster members are most likely to see a built
    /// artifact. Ties break on name to keep batch output deterministic.
    pub fn anchor(&self, graph: &PackageGraph) -> Option<&str> {
        self.members
            .iter()
            .max_by_key(|name| {
                let dependents = graph
                    .get(name)
                    .map(|n| n.local_dependents.len())
                    .unwrap_or(0);
                // BTreeSet iterates ascending; Reverse makes max_by_key
                // prefer the lexicographically smallest name on ties.
                (dependents, std::cmp::Reverse(name.as_str()))
            })
            .map(String::as_str)
    }
}

/// Merge overlapping cycles into disjoint clusters.
///
/// Repeatedly unions any two cycles sharing at least one node until no
/// further merges are possible. Idempotent: running it on its own output
/// returns the same clusters.
pub fn merge_overlapping_cycles(cycles: &[Vec<String>]) -> Vec<CycleCluster> {
    let mut clusters: Vec<BTreeSet<String>> = cycles
        .iter()
        .map(|c| c.iter().cloned().collect())
        .collect();

    loop {
        let mut merged_any = false;

        'scan: for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                if clusters[i].intersection(&clusters[j]).next().is_some() {
                    let absorbed = clusters.remove(j);
                    clusters[i].extend(absorbed);
                    merged_any = true;
                    break 'scan;
                }
            }
        }

        if !merged_any {
            break;
        }
    }

    // Deterministic cluster order: by smallest member name
    clusters.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));

    debug!(
        raw = cycles.len(),
        clusters = clusters.len(),
        "merged overlapping cycles"
    );

    clusters
        .into_iter()
        .map(|members| CycleCluster { members })
        .collect()
}
