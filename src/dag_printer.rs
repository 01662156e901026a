//! The `DagPrinter` utility.

use core::fmt::{Display, Formatter, Result, Write};

use crate::dag::{CaptureName, MotifData, Node, ParseDag};
use crate::entity::EntitySet;
use crate::fx::FxHashMap;

/// A utility for pretty-printing a `ParseDag` as a `dot` digraph.
///
/// Terminal nodes are drawn with double peripheries; edges carry the motif
/// name, the sanitized literal text where there is one, and the capture
/// name. A repeat edge additionally draws dashed sub-edges into its
/// `parser` and `while` subgraphs.
pub struct DagPrinter<'a> {
    dag: &'a ParseDag,
}

impl<'a> DagPrinter<'a> {
    /// Create a new DagPrinter.
    pub fn new(dag: &'a ParseDag) -> Self {
        Self { dag }
    }

    /// Write the graph description to `w`.
    pub fn write(&self, w: &mut dyn Write) -> Result {
        writeln!(w, "digraph \"pdag\" {{")?;
        writeln!(w, "    {{rank=min; {}}}", self.dag.root())?;
        let order = self.reachable();
        self.nodes(w, &order)?;
        self.connections(w, &order)?;
        writeln!(w, "}}")
    }

    /// Every reachable node, in a stable order.
    fn reachable(&self) -> Vec<Node> {
        let mut order = Vec::new();
        let mut visited = EntitySet::new();
        let mut stack: Vec<Node> = self.dag.entry_nodes().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            if visited.contains(node) {
                continue;
            }
            visited.insert(node);
            order.push(node);
            for &edge in self.dag.node_edges(node).iter().rev() {
                let inst = &self.dag[edge];
                if let MotifData::Repeat { parser, while_ } = inst.data {
                    stack.push(while_);
                    stack.push(parser);
                }
                stack.push(inst.successor);
            }
        }
        order
    }

    fn nodes(&self, w: &mut dyn Write, order: &[Node]) -> Result {
        let mut component_roots = FxHashMap::default();
        for (_, comp) in self.dag.components() {
            component_roots.insert(comp.root, comp.name.as_str());
        }
        for &node in order {
            write!(w, "    {node} [shape=circle")?;
            if self.dag[node].terminal {
                write!(w, ", peripheries=2")?;
            }
            if let Some(name) = component_roots.get(&node) {
                write!(w, ", label=\"@{name}\"")?;
            }
            writeln!(w, "]")?;
        }
        Ok(())
    }

    fn connections(&self, w: &mut dyn Write, order: &[Node]) -> Result {
        for &node in order {
            for &edge in self.dag.node_edges(node) {
                let inst = &self.dag[edge];
                writeln!(
                    w,
                    "    {node} -> {} [label=\"{}\"]",
                    inst.successor,
                    self.edge_label(edge)
                )?;
                if let MotifData::Repeat { parser, while_ } = inst.data {
                    writeln!(w, "    {node} -> {parser} [label=\"parser\", style=dashed]")?;
                    writeln!(w, "    {node} -> {while_} [label=\"while\", style=dashed]")?;
                }
            }
        }
        Ok(())
    }

    fn edge_label(&self, edge: crate::dag::Edge) -> String {
        let inst = &self.dag[edge];
        let mut label = match &inst.data {
            MotifData::Literal { text } => format!("literal '{}'", sanitize(text)),
            MotifData::CharTo { to } => format!("char-to '{}'", sanitize(&to.to_string())),
            MotifData::CharSep { seps } => format!("char-sep '{}'", sanitize(seps)),
            MotifData::Component { component } => format!("@{}", self.dag[*component].name),
            data => data.motif().name().to_string(),
        };
        match &inst.capture {
            Some(CaptureName::Splice) => label.push_str(" (.)"),
            Some(CaptureName::Field(name)) => {
                label.push_str(" (");
                label.push_str(name);
                label.push(')');
            }
            None => {}
        }
        label
    }
}

impl<'a> Display for DagPrinter<'a> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        self.write(f)
    }
}

/// Escape text for embedding in a double-quoted `dot` label.
fn sanitize(text: &str) -> String {
    text.chars()
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            '\n' => vec!['\\', 'n'],
            _ => vec![c],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RuleBuilder;
    use serde_json::json;

    #[test]
    fn renders_nodes_edges_and_terminal_styling() {
        let mut dag = ParseDag::new();
        let mut builder = RuleBuilder::new(&mut dag);
        builder
            .define_component("addr", &json!({"type": "ipv4", "name": "ip"}))
            .unwrap();
        builder
            .add_rule(
                &json!([
                    {"type": "literal", "text": "from \"x\" "},
                    {"type": "@addr", "name": "."},
                ]),
                &[],
            )
            .unwrap();
        let dot = DagPrinter::new(&dag).to_string();

        assert!(dot.starts_with("digraph \"pdag\" {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("{rank=min; node0}"));
        assert!(dot.contains("peripheries=2"));
        assert!(dot.contains("label=\"@addr\""));
        assert!(dot.contains(r#"literal 'from \"x\" '"#));
        assert!(dot.contains("@addr (.)"));
    }

    #[test]
    fn repeat_edges_expose_their_subgraphs() {
        let mut dag = ParseDag::new();
        RuleBuilder::new(&mut dag)
            .add_rule(
                &json!({
                    "type": "repeat",
                    "name": "ns",
                    "parser": {"type": "number", "name": "n"},
                    "while": {"type": "literal", "text": ","},
                }),
                &[],
            )
            .unwrap();
        let dot = DagPrinter::new(&dag).to_string();
        assert!(dot.contains("label=\"parser\", style=dashed"));
        assert!(dot.contains("label=\"while\", style=dashed"));
        assert!(dot.contains("repeat (ns)"));
    }
}
