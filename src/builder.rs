//! Building the parse DAG from parser configurations.
//!
//! The rulebase loader hands this module `serde_json` configuration values.
//! A configuration is either a single object (`{"type": "word", ...}`), an
//! array of configurations matched in sequence, or an `alternative` object
//! whose `parser` array lists branches that converge on one shared successor
//! node.
//!
//! Adding a configuration to a node advances a frontier: each instance
//! either merges into an existing identical edge (so rules with a common
//! prefix share nodes) or appends a fresh edge to a fresh successor.
//! Building is strictly single-writer; the builder borrows the graph
//! mutably for its whole lifetime.

use crate::dag::{
    CaptureName, Component, EdgeData, MAX_USER_PRIORITY, Motif, MotifData, Node, ParseDag,
    combined_priority,
};
use crate::result::{BuildError, BuildResult};
use serde_json::{Map, Value};

const TYPE_KEY: &str = "type";
const NAME_KEY: &str = "name";
const PRIORITY_KEY: &str = "priority";
const ALTERNATIVE_TYPE: &str = "alternative";
const PARSER_KEY: &str = "parser";
const WHILE_KEY: &str = "while";

/// Adds rules and components to a [`ParseDag`].
pub struct RuleBuilder<'a> {
    dag: &'a mut ParseDag,
}

impl<'a> RuleBuilder<'a> {
    /// Create a builder over `dag`.
    pub fn new(dag: &'a mut ParseDag) -> Self {
        Self { dag }
    }

    /// Add one rule, starting from the main root.
    ///
    /// The node reached after the final instance becomes a terminal and
    /// carries `tags`; it is returned so callers can correlate rules with
    /// their accepting nodes. A rejected configuration leaves already-added
    /// edges of this rule in place but never marks a terminal, so the
    /// half-added rule cannot accept anything by itself.
    pub fn add_rule(&mut self, parser: &Value, tags: &[String]) -> BuildResult<Node> {
        let root = self.dag.root();
        let end = self.add(root, parser, &mut None)?;
        self.dag.mark_terminal(end, tags);
        log::debug!("rule added, accepting at {end}");
        Ok(end)
    }

    /// Build a named component from `parser` and register it.
    ///
    /// Component names are looked up by exact match when rules reference
    /// them as `@name`. The name only becomes visible once the body is
    /// fully built, so a component cannot invoke itself.
    pub fn define_component(&mut self, name: &str, parser: &Value) -> BuildResult<Component> {
        if self.dag.component_by_name(name).is_some() {
            return Err(BuildError::DuplicateComponent(name.to_string()));
        }
        let root = self.subdag(parser)?;
        let comp = self.dag.register_component(name, root);
        log::debug!("component @{name} defined, rooted at {root}");
        Ok(comp)
    }

    /// Add `config` to `from`, returning the advanced frontier node.
    ///
    /// `shared` threads the common successor through alternative branches:
    /// the first branch to need a successor creates it (or adopts one from a
    /// merge) and every later branch reuses it.
    fn add(&mut self, from: Node, config: &Value, shared: &mut Option<Node>) -> BuildResult<Node> {
        match config {
            Value::Array(seq) => {
                let (last, init) = seq.split_last().ok_or(BuildError::BadShape)?;
                let mut frontier = from;
                for element in init {
                    frontier = self.add(frontier, element, &mut None)?;
                }
                self.add(frontier, last, shared)
            }
            Value::Object(obj) if type_of(obj) == Some(ALTERNATIVE_TYPE) => {
                let branches = obj
                    .get(PARSER_KEY)
                    .and_then(Value::as_array)
                    .filter(|b| !b.is_empty())
                    .ok_or(BuildError::MalformedAlternative)?;
                let mut last = from;
                for branch in branches {
                    last = self.add(from, branch, shared)?;
                }
                Ok(shared.unwrap_or(last))
            }
            Value::Object(obj) => self.add_instance(from, obj, shared),
            _ => Err(BuildError::BadShape),
        }
    }

    /// Add a single parser instance to `from` (the merge rule).
    fn add_instance(
        &mut self,
        from: Node,
        obj: &Map<String, Value>,
        shared: &mut Option<Node>,
    ) -> BuildResult<Node> {
        let fingerprint = fingerprint(obj);

        // An identical edge already on the node is reused instead of
        // duplicated; that is what makes common rule prefixes share their
        // subgraph.
        for &edge in self.dag.node_edges(from) {
            if self.dag[edge].fingerprint == fingerprint {
                let successor = self.dag[edge].successor;
                log::debug!("merged parser instance into {edge} at {from}");
                match *shared {
                    None => *shared = Some(successor),
                    Some(node) if node != successor => {
                        // A branch of an alternative merged into an edge that
                        // already leads elsewhere; prefix sharing wins and
                        // the remaining branches keep the shared node.
                        log::debug!(
                            "alternative successor diverges at {from}: {node} vs {successor}"
                        );
                    }
                    Some(_) => {}
                }
                return Ok(successor);
            }
        }

        let ty = type_of(obj).ok_or(BuildError::MissingType)?.to_string();
        let capture = parse_capture(obj)?;
        let user_priority = parse_priority(obj)?;
        let mut params = obj.clone();
        params.remove(TYPE_KEY);
        params.remove(NAME_KEY);
        params.remove(PRIORITY_KEY);

        let (data, intrinsic) = if let Some(name) = ty.strip_prefix('@') {
            if let Some(key) = params.keys().next() {
                return Err(BuildError::UnexpectedParameter {
                    motif: ty.clone(),
                    key: key.clone(),
                });
            }
            let component = self
                .dag
                .component_by_name(name)
                .ok_or_else(|| BuildError::UnknownComponent(name.to_string()))?;
            (
                MotifData::Component { component },
                Motif::CustomType.intrinsic_priority(),
            )
        } else {
            let motif: Motif = ty
                .parse()
                .map_err(|_| BuildError::UnknownMotif(ty.clone()))?;
            let data = match motif {
                Motif::Repeat => self.build_repeat(params)?,
                _ => MotifData::from_config(motif, &params)?,
            };
            (data, motif.intrinsic_priority())
        };

        let successor = match *shared {
            Some(node) => node,
            None => {
                let node = self.dag.make_node();
                *shared = Some(node);
                node
            }
        };
        self.dag.push_edge(
            from,
            EdgeData {
                data,
                capture,
                priority: combined_priority(user_priority, intrinsic),
                fingerprint,
                successor,
            },
        );
        Ok(successor)
    }

    /// Assemble a `repeat` payload: both the per-item parser and the
    /// separator are anonymous sub-DAGs of their own.
    fn build_repeat(&mut self, mut params: Map<String, Value>) -> BuildResult<MotifData> {
        let missing = |key: &str| BuildError::MissingParameter {
            motif: Motif::Repeat.name().to_string(),
            key: key.to_string(),
        };
        let parser_cfg = params.remove(PARSER_KEY).ok_or_else(|| missing(PARSER_KEY))?;
        let while_cfg = params.remove(WHILE_KEY).ok_or_else(|| missing(WHILE_KEY))?;
        if let Some(key) = params.keys().next() {
            return Err(BuildError::UnexpectedParameter {
                motif: Motif::Repeat.name().to_string(),
                key: key.clone(),
            });
        }
        let parser = self.subdag(&parser_cfg)?;
        let while_ = self.subdag(&while_cfg)?;
        Ok(MotifData::Repeat { parser, while_ })
    }

    /// Build an anonymous subgraph on a fresh root and make its frontier
    /// accepting, the way component bodies and repeat operands are stored.
    fn subdag(&mut self, config: &Value) -> BuildResult<Node> {
        let root = self.dag.make_node();
        let end = self.add(root, config, &mut None)?;
        self.dag.mark_terminal(end, &[]);
        Ok(root)
    }
}

fn type_of(obj: &Map<String, Value>) -> Option<&str> {
    obj.get(TYPE_KEY).and_then(Value::as_str)
}

fn parse_capture(obj: &Map<String, Value>) -> BuildResult<Option<CaptureName>> {
    match obj.get(NAME_KEY) {
        None => Ok(None),
        Some(Value::String(s)) if s == "-" => Ok(None),
        Some(Value::String(s)) if s == "." => Ok(Some(CaptureName::Splice)),
        Some(Value::String(s)) => Ok(Some(CaptureName::Field(s.clone()))),
        Some(_) => Err(BuildError::InvalidName),
    }
}

fn parse_priority(obj: &Map<String, Value>) -> BuildResult<u32> {
    match obj.get(PRIORITY_KEY) {
        None => Ok(MAX_USER_PRIORITY),
        Some(v) => v
            .as_u64()
            .filter(|&p| p <= u64::from(MAX_USER_PRIORITY))
            .map(|p| p as u32)
            .ok_or(BuildError::InvalidPriority),
    }
}

/// Canonical fingerprint of a configuration object. `serde_json` objects
/// serialize with sorted keys, so configurations that differ only in key
/// order fingerprint identically and merge.
fn fingerprint(obj: &Map<String, Value>) -> String {
    Value::Object(obj.clone()).to_string()
}
