//! Representation of compiled parse DAGs.

pub mod entities;
pub mod graph;
pub mod motifs;

pub use crate::dag::entities::{Component, Edge, Node};
pub use crate::dag::graph::{
    CaptureName, ComponentData, EdgeData, MAX_USER_PRIORITY, NodeData, ParseDag, combined_priority,
};
pub use crate::dag::motifs::{Motif, MotifData};
