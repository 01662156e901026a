//! Read-only statistics over a parse DAG.
//!
//! One traversal of everything reachable from the main root, the component
//! roots, and repeat operands. Useful for rulebase authors wondering what
//! their rules compiled into.

use crate::dag::{Motif, MotifData, Node, ParseDag};
use crate::entity::EntitySet;
use crate::fx::FxHashMap;
use core::fmt;

/// Counters describing a compiled parse DAG.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DagStats {
    /// Reachable nodes.
    pub nodes: usize,
    /// Reachable accepting nodes.
    pub terminals: usize,
    /// Reachable edges.
    pub edges: usize,
    /// Edge count of the longest path through the graph.
    pub longest_path: usize,
    /// How many edges use each motif.
    pub motif_usage: FxHashMap<Motif, usize>,
    /// `fanout[n]` is the number of reachable nodes with `n` edges.
    pub fanout: Vec<usize>,
}

impl DagStats {
    /// Traverse `dag` and count.
    pub fn compute(dag: &ParseDag) -> Self {
        let mut stats = Self::default();
        let mut visited = EntitySet::new();
        let mut stack: Vec<Node> = dag.entry_nodes().collect();
        while let Some(node) = stack.pop() {
            if visited.contains(node) {
                continue;
            }
            visited.insert(node);
            stats.nodes += 1;
            if dag[node].terminal {
                stats.terminals += 1;
            }
            let fanout = dag.node_edges(node).len();
            if stats.fanout.len() <= fanout {
                stats.fanout.resize(fanout + 1, 0);
            }
            stats.fanout[fanout] += 1;
            for &edge in dag.node_edges(node) {
                stats.edges += 1;
                let inst = &dag[edge];
                *stats.motif_usage.entry(inst.data.motif()).or_insert(0) += 1;
                if let MotifData::Repeat { parser, while_ } = inst.data {
                    stack.push(parser);
                    stack.push(while_);
                }
                stack.push(inst.successor);
            }
        }

        let mut memo = FxHashMap::default();
        stats.longest_path = dag
            .entry_nodes()
            .map(|root| longest_from(dag, root, &mut memo))
            .max()
            .unwrap_or(0);
        stats
    }
}

/// Edge count of the longest path starting at `node`. The graph is acyclic,
/// so memoized recursion terminates.
fn longest_from(dag: &ParseDag, node: Node, memo: &mut FxHashMap<Node, usize>) -> usize {
    if let Some(&known) = memo.get(&node) {
        return known;
    }
    let mut longest = 0;
    for &edge in dag.node_edges(node) {
        let inst = &dag[edge];
        let mut via = 1 + longest_from(dag, inst.successor, memo);
        if let MotifData::Repeat { parser, while_ } = inst.data {
            via = via
                .max(1 + longest_from(dag, parser, memo))
                .max(1 + longest_from(dag, while_, memo));
        }
        longest = longest.max(via);
    }
    memo.insert(node, longest);
    longest
}

impl fmt::Display for DagStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} nodes ({} terminal), {} edges, longest path {}",
            self.nodes, self.terminals, self.edges, self.longest_path
        )?;
        let mut usage: Vec<_> = self.motif_usage.iter().collect();
        usage.sort_by_key(|&(motif, _)| motif.name());
        for (motif, count) in usage {
            writeln!(f, "  {motif}: {count}")?;
        }
        for (fanout, count) in self.fanout.iter().enumerate().filter(|&(_, &c)| c > 0) {
            writeln!(f, "  {count} node(s) with {fanout} edge(s)")?;
        }
        Ok(())
    }
}
