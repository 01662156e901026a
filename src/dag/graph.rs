//! The parse DAG: nodes, edges, and named components.
//!
//! A `ParseDag` is the compiled form of a rulebase. Nodes are states of the
//! automaton; each node owns an ordered list of edges, and each edge is one
//! configured parser instance leading to a successor node. Rules that share
//! a prefix share the corresponding nodes, so a node can be reached from
//! many predecessors. All entities live in [`PrimaryMap`] arenas owned by
//! the graph; dropping the graph releases everything reachable from it.
//!
//! The graph is acyclic by construction: every edge's successor is a node
//! created after the edge's source, so node indices strictly increase along
//! any path. Traversal passes rely on this to terminate.

use crate::dag::entities::{Component, Edge, Node};
use crate::dag::motifs::MotifData;
use crate::entity::PrimaryMap;
use crate::fx::FxHashMap;
use core::iter;
use smallvec::SmallVec;

/// Largest user-assignable rule priority. Doubles as the "priority not
/// specified" sentinel so that unprioritized rules sort after every rule the
/// user did prioritize and fall back to intrinsic motif order among
/// themselves.
pub const MAX_USER_PRIORITY: u32 = 0x00ff_ffff;

/// Combine a user-assigned rule priority with a motif's intrinsic priority.
///
/// The user priority occupies the high bits, so user-assigned order dominates
/// and the intrinsic priority only breaks ties. Smaller values are tried
/// first during matching.
pub fn combined_priority(user: u32, intrinsic: u8) -> u32 {
    debug_assert!(user <= MAX_USER_PRIORITY);
    (user << 8) | u32::from(intrinsic)
}

/// The key under which a captured value is written into the output record.
///
/// An edge with no capture name (`None` at the [`EdgeData`] level) consumes
/// input without producing a value at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureName {
    /// The name `"."`: if the captured value is an object, its fields are
    /// merged into the current record; any other value lands under the
    /// literal key `"."`.
    Splice,
    /// Any other name: the captured value is stored under this key.
    Field(String),
}

/// A node of the parse DAG.
#[derive(Clone, Default)]
pub struct NodeData {
    /// Outgoing parser-instance edges, in insertion order until the DAG is
    /// optimized and in ascending combined-priority order afterwards.
    pub edges: SmallVec<[Edge; 4]>,
    /// Accepting state: matching may stop here once the input is exhausted,
    /// or earlier when the caller allows a partial match.
    pub terminal: bool,
    /// Tags of the rules terminating here, unioned across rules.
    pub tags: Vec<String>,
}

/// One configured parser instance: a single attempt at consuming input.
#[derive(Clone)]
pub struct EdgeData {
    /// The motif payload driving the match attempt.
    pub data: MotifData,
    /// Where a captured value goes; `None` captures nothing.
    pub capture: Option<CaptureName>,
    /// Combined priority, see [`combined_priority`].
    pub priority: u32,
    /// Canonical serialization of the originating configuration. The builder
    /// compares fingerprints to merge identical edges; nothing consults them
    /// after loading.
    pub fingerprint: String,
    /// The node matching continues from once this instance consumed input.
    pub successor: Node,
}

/// A named component: a reusable subgraph invoked by `@name` edges.
#[derive(Clone)]
pub struct ComponentData {
    /// The exact name rules refer to this component by, without the `@`.
    pub name: String,
    /// Root node of the component subgraph.
    pub root: Node,
}

/// A compiled rulebase.
///
/// Built by [`RuleBuilder`](crate::builder::RuleBuilder), frozen by
/// [`optimize`](crate::optimize::optimize), and read by the matcher. Once
/// frozen, the graph is free of interior mutability and may be shared across
/// matching threads.
pub struct ParseDag {
    nodes: PrimaryMap<Node, NodeData>,
    edges: PrimaryMap<Edge, EdgeData>,
    components: PrimaryMap<Component, ComponentData>,
    component_names: FxHashMap<String, Component>,
    root: Node,
}

impl ParseDag {
    /// Create an empty graph containing only the main root node.
    pub fn new() -> Self {
        let mut nodes = PrimaryMap::new();
        let root = nodes.push(NodeData::default());
        Self {
            nodes,
            edges: PrimaryMap::new(),
            components: PrimaryMap::new(),
            component_names: FxHashMap::default(),
            root,
        }
    }

    /// The main root: matching a full log line starts here.
    pub fn root(&self) -> Node {
        self.root
    }

    /// Create a fresh node with no edges.
    pub fn make_node(&mut self) -> Node {
        self.nodes.push(NodeData::default())
    }

    /// Append an edge to `from`. The successor named by `data` must already
    /// exist.
    pub fn push_edge(&mut self, from: Node, data: EdgeData) -> Edge {
        debug_assert!(data.successor != from, "an edge must advance the match");
        let edge = self.edges.push(data);
        self.nodes[from].edges.push(edge);
        edge
    }

    /// The outgoing edges of `node`, in the order the matcher tries them.
    pub fn node_edges(&self, node: Node) -> &[Edge] {
        &self.nodes[node].edges
    }

    /// Mark `node` as accepting and union `tags` into its tag set.
    ///
    /// Several rules may terminate on the same node; each contributes its
    /// tags once, in first-seen order.
    pub fn mark_terminal(&mut self, node: Node, tags: &[String]) {
        let data = &mut self.nodes[node];
        data.terminal = true;
        for tag in tags {
            if !data.tags.contains(tag) {
                data.tags.push(tag.clone());
            }
        }
    }

    /// Register a fully built component subgraph under `name`.
    ///
    /// The caller is responsible for checking that the name is free; names
    /// are only registered once the body exists, so a component can never
    /// reference itself.
    pub fn register_component(&mut self, name: &str, root: Node) -> Component {
        debug_assert!(!self.component_names.contains_key(name));
        let comp = self.components.push(ComponentData {
            name: name.to_string(),
            root,
        });
        self.component_names.insert(name.to_string(), comp);
        comp
    }

    /// Look up a component by its exact name.
    pub fn component_by_name(&self, name: &str) -> Option<Component> {
        self.component_names.get(name).copied()
    }

    /// Iterate over all registered components.
    pub fn components(&self) -> impl Iterator<Item = (Component, &ComponentData)> {
        self.components.iter()
    }

    /// The nodes the matcher can enter directly: the main root followed by
    /// every component root. Graph traversals start from these.
    pub fn entry_nodes(&self) -> impl Iterator<Item = Node> + '_ {
        iter::once(self.root).chain(self.components.values().map(|c| c.root))
    }

    /// Total number of nodes ever created, reachable or not.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of edges ever created.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of registered components.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn take_edges(&mut self, node: Node) -> SmallVec<[Edge; 4]> {
        core::mem::take(&mut self.nodes[node].edges)
    }

    pub(crate) fn set_edges(&mut self, node: Node, edges: SmallVec<[Edge; 4]>) {
        self.nodes[node].edges = edges;
    }
}

impl Default for ParseDag {
    fn default() -> Self {
        Self::new()
    }
}

impl core::ops::Index<Node> for ParseDag {
    type Output = NodeData;

    fn index(&self, node: Node) -> &NodeData {
        &self.nodes[node]
    }
}

impl core::ops::Index<Edge> for ParseDag {
    type Output = EdgeData;

    fn index(&self, edge: Edge) -> &EdgeData {
        &self.edges[edge]
    }
}

impl core::ops::IndexMut<Edge> for ParseDag {
    fn index_mut(&mut self, edge: Edge) -> &mut EdgeData {
        &mut self.edges[edge]
    }
}

impl core::ops::Index<Component> for ParseDag {
    type Output = ComponentData;

    fn index(&self, comp: Component) -> &ComponentData {
        &self.components[comp]
    }
}
