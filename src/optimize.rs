//! Post-load optimization of the parse DAG.
//!
//! Runs once after the last rule is loaded, before the graph is frozen for
//! matching. Two rewrites, applied to every reachable node:
//!
//! 1. **Edge sort.** Each node's edges are stable-sorted into ascending
//!    combined-priority order, which is the order the matcher tries them in.
//!    Insertion order remains the final tiebreak.
//! 2. **Literal compaction.** A chain of single-successor literal edges is
//!    folded into one longer literal. Folding is conservative: both edges
//!    must be capture-free and the intermediate node must be unobservable,
//!    meaning not a terminal and not a root the matcher can enter directly.
//!
//! Neither rewrite changes the set of inputs the DAG accepts or the records
//! matching produces.

use crate::dag::{MotifData, Node, ParseDag};
use crate::entity::EntitySet;

/// Sort and compact `dag` in place.
pub fn optimize(dag: &mut ParseDag) {
    // Discover every reachable node first. Roots the matcher can enter
    // directly (the entry nodes plus all repeat operands) are protected:
    // compaction must not fold an edge across them.
    let mut protected = EntitySet::new();
    let mut visited = EntitySet::new();
    let mut order = Vec::new();
    let mut stack: Vec<Node> = dag.entry_nodes().collect();
    for &node in &stack {
        protected.insert(node);
    }
    while let Some(node) = stack.pop() {
        if visited.contains(node) {
            continue;
        }
        visited.insert(node);
        order.push(node);
        for &edge in dag.node_edges(node) {
            if let MotifData::Repeat { parser, while_ } = dag[edge].data {
                protected.insert(parser);
                protected.insert(while_);
                stack.push(parser);
                stack.push(while_);
            }
            stack.push(dag[edge].successor);
        }
    }

    let mut folded = 0;
    for &node in &order {
        sort_edges(dag, node);
        folded += compact_literals(dag, node, &protected);
    }
    log::debug!(
        "optimized parse dag: {} nodes, {} edges, {folded} literal(s) folded",
        dag.num_nodes(),
        dag.num_edges()
    );
}

fn sort_edges(dag: &mut ParseDag, node: Node) {
    let mut edges = dag.take_edges(node);
    edges.sort_by_key(|&e| dag[e].priority);
    dag.set_edges(node, edges);
}

/// Fold chains of capture-free literal edges rooted at `node`. Only the
/// first edge of a chain is rewritten; the bypassed node keeps its edge and
/// simply stops being reachable through this path.
fn compact_literals(dag: &mut ParseDag, node: Node, protected: &EntitySet<Node>) -> usize {
    let mut folded = 0;
    for i in 0..dag.node_edges(node).len() {
        loop {
            let edge = dag.node_edges(node)[i];
            let inst = &dag[edge];
            if inst.capture.is_some() || !matches!(inst.data, MotifData::Literal { .. }) {
                break;
            }
            let mid = inst.successor;
            if dag[mid].terminal || protected.contains(mid) || dag.node_edges(mid).len() != 1 {
                break;
            }
            let next = dag.node_edges(mid)[0];
            let tail = &dag[next];
            if tail.capture.is_some() {
                break;
            }
            let MotifData::Literal { text: tail_text } = &tail.data else {
                break;
            };
            let (tail_text, grand) = (tail_text.clone(), tail.successor);
            let inst = &mut dag[edge];
            match inst.data {
                MotifData::Literal { ref mut text } => text.push_str(&tail_text),
                _ => unreachable!(),
            }
            inst.successor = grand;
            folded += 1;
        }
    }
    folded
}
