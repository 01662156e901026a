//! Parse DAG entity references.
//!
//! The pieces of a compiled parse DAG reference each other constantly: an
//! edge names its successor node, a node owns an ordered list of edges, and a
//! custom-type edge names the component it invokes. These references are not
//! implemented as Rust references both because ownership and mutability rules
//! make that difficult with shared successors, and because 64-bit pointers
//! take up a lot of space in a graph we want compact. Instead, entity
//! references are structs wrapping a `u32` index into a table in the
//! [`ParseDag`](super::ParseDag) main data structure. There is a separate
//! index type for each entity type, so we don't lose type safety.

use crate::entity::entity_impl;

/// An opaque reference to a node in a [`ParseDag`](super::ParseDag).
///
/// A node is one state of the compiled automaton; its outgoing edges are the
/// parser instances tried from that state. While the order is stable, it is
/// arbitrary and does not resemble the order nodes are visited in during
/// matching.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(u32);
entity_impl!(Node, "node");

/// An opaque reference to an outgoing edge of a node: one configured parser
/// instance, leading to a successor node.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(u32);
entity_impl!(Edge, "edge");

/// An opaque reference to a named component: a reusable subgraph that rules
/// invoke with `@name` references.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Component(u32);
entity_impl!(Component, "comp");
