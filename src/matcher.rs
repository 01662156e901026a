//! Recursive-descent matching over the parse DAG.
//!
//! Matching walks a node's edges in stored order (ascending combined
//! priority once the DAG is optimized) and commits to the first path that
//! reaches an accepting node. This is priority-ordered backtracking, not a
//! longest-match search: a lower-priority edge is only tried after every
//! continuation of the higher-priority ones has failed. Captured values are
//! written into the output record as the winning path unwinds.
//!
//! The walk never mutates the graph, so any number of matches may run
//! concurrently against a frozen DAG, each with its own output record.

use crate::dag::{CaptureName, MotifData, Node, ParseDag};
use serde_json::Value;

/// A structured output record: the JSON object a match fills in.
pub type Record = serde_json::Map<String, Value>;

/// A successful match of a subgraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchSuccess {
    /// Byte offset just past the consumed input. Distinct from
    /// [`MatchResult::deepest`]: partial-match callers need to know where
    /// the accepted path stopped, not how far failed attempts got.
    pub end: usize,
    /// The accepting node, whose tags apply to this match.
    pub terminal: Node,
}

/// The outcome of one matcher invocation.
#[derive(Clone, Copy, Debug)]
pub struct MatchResult {
    /// The greatest byte offset any edge attempt reached, successful or
    /// not. Reported for diagnostics on both success and failure.
    pub deepest: usize,
    /// The accepted path, if any.
    pub success: Option<MatchSuccess>,
}

/// Match `input` against the subgraph rooted at `node`, starting at byte
/// `offset`.
///
/// Returns success iff some path from `node` reaches an accepting node
/// after consuming input up to its end, or up to anywhere when
/// `allow_partial` is set. On success the captured values of the winning
/// path have been added to `record`; on failure `record` is untouched.
pub fn match_at(
    dag: &ParseDag,
    node: Node,
    input: &str,
    offset: usize,
    allow_partial: bool,
    record: &mut Record,
) -> MatchResult {
    let mut deepest = offset;
    for &edge in dag.node_edges(node) {
        let inst = &dag[edge];
        let wanted = inst.capture.is_some();
        let (consumed, value) = match inst.data {
            MotifData::Component { component } => {
                let mut sub = Record::new();
                let res = match_at(dag, dag[component].root, input, offset, true, &mut sub);
                deepest = deepest.max(res.deepest);
                match res.success {
                    Some(s) => (s.end - offset, wanted.then(|| Value::Object(sub))),
                    None => continue,
                }
            }
            MotifData::Repeat { parser, while_ } => {
                match match_repeat(dag, parser, while_, input, offset, &mut deepest) {
                    Some((consumed, items)) => (consumed, wanted.then(|| Value::Array(items))),
                    None => continue,
                }
            }
            ref data => match data.run(input, offset, wanted) {
                Some(step) => step,
                None => continue,
            },
        };
        let next = offset + consumed;
        deepest = deepest.max(next);
        log::trace!(
            "{node}: {} consumed {consumed} byte(s) at {offset}",
            inst.data.motif()
        );
        let res = match_at(dag, inst.successor, input, next, allow_partial, record);
        deepest = deepest.max(res.deepest);
        if res.success.is_some() {
            store_capture(record, inst.capture.as_ref(), value);
            return MatchResult {
                deepest,
                success: res.success,
            };
        }
    }
    // No edge led anywhere; accept here if this node can.
    if dag[node].terminal && (offset == input.len() || allow_partial) {
        return MatchResult {
            deepest,
            success: Some(MatchSuccess {
                end: offset,
                terminal: node,
            }),
        };
    }
    MatchResult {
        deepest,
        success: None,
    }
}

/// Drive a `repeat` edge: the `parser` subgraph must match for every item,
/// the `while_` subgraph links consecutive items, and its first failure ends
/// the repetition cleanly. Returns the consumed length and the per-item
/// records.
fn match_repeat(
    dag: &ParseDag,
    parser: Node,
    while_: Node,
    input: &str,
    offset: usize,
    deepest: &mut usize,
) -> Option<(usize, Vec<Value>)> {
    let mut items = Vec::new();
    let mut pos = offset;
    loop {
        let mut item = Record::new();
        let parsed = match_at(dag, parser, input, pos, true, &mut item);
        *deepest = (*deepest).max(parsed.deepest);
        // A separator committed us to another item; failing to parse one
        // fails the whole repeat.
        let accepted = parsed.success?;
        items.push(Value::Object(item));
        pos = accepted.end;

        let mut discarded = Record::new();
        let linked = match_at(dag, while_, input, pos, true, &mut discarded);
        *deepest = (*deepest).max(linked.deepest);
        match linked.success {
            Some(s) if s.end > pos => pos = s.end,
            // No separator, or one that consumed nothing: the list ends.
            _ => break,
        }
    }
    Some((pos - offset, items))
}

/// Write a captured value into the record per the capture-name rules.
fn store_capture(record: &mut Record, capture: Option<&CaptureName>, value: Option<Value>) {
    let Some(capture) = capture else { return };
    let Some(value) = value else { return };
    match capture {
        CaptureName::Splice => match value {
            Value::Object(fields) => record.extend(fields),
            other => {
                record.insert(".".to_string(), other);
            }
        },
        CaptureName::Field(key) => {
            record.insert(key.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RuleBuilder;
    use serde_json::json;

    fn dag_of(rules: &[Value]) -> ParseDag {
        let mut dag = ParseDag::new();
        let mut builder = RuleBuilder::new(&mut dag);
        for rule in rules {
            builder.add_rule(rule, &[]).unwrap();
        }
        dag
    }

    fn matched(dag: &ParseDag, input: &str) -> Option<Record> {
        let mut record = Record::new();
        let res = match_at(dag, dag.root(), input, 0, false, &mut record);
        res.success.map(|_| record)
    }

    #[test]
    fn literal_then_word() {
        let dag = dag_of(&[json!([
            {"type": "literal", "text": "user="},
            {"type": "word", "name": "user"},
        ])]);
        assert_eq!(
            matched(&dag, "user=alice"),
            Some(json!({"user": "alice"}).as_object().unwrap().clone())
        );
        assert_eq!(matched(&dag, "user="), None);
        assert_eq!(matched(&dag, "nope"), None);
    }

    #[test]
    fn input_must_be_exhausted_unless_partial() {
        let dag = dag_of(&[json!({"type": "literal", "text": "ok"})]);
        assert!(matched(&dag, "ok").is_some());
        assert!(matched(&dag, "ok then some").is_none());

        let mut record = Record::new();
        let res = match_at(&dag, dag.root(), "ok then some", 0, true, &mut record);
        assert_eq!(res.success.map(|s| s.end), Some(2));
    }

    #[test]
    fn deepest_tracks_failed_attempts() {
        let dag = dag_of(&[json!([
            {"type": "literal", "text": "foo"},
            {"type": "literal", "text": "bar"},
        ])]);
        let mut record = Record::new();
        let res = match_at(&dag, dag.root(), "foobaz", 0, false, &mut record);
        assert!(res.success.is_none());
        assert_eq!(res.deepest, 3);
        assert!(record.is_empty());
    }

    #[test]
    fn unnamed_captures_add_nothing() {
        let dag = dag_of(&[json!([
            {"type": "word"},
            {"type": "whitespace"},
            {"type": "number", "name": "n"},
        ])]);
        assert_eq!(
            matched(&dag, "answer 42"),
            Some(json!({"n": 42}).as_object().unwrap().clone())
        );
    }

    #[test]
    fn splice_of_a_non_object_lands_under_dot() {
        let dag = dag_of(&[json!({"type": "word", "name": "."})]);
        assert_eq!(
            matched(&dag, "lone"),
            Some(json!({".": "lone"}).as_object().unwrap().clone())
        );
    }

    #[test]
    fn repeat_collects_items_and_stops_at_the_first_non_separator() {
        let dag = dag_of(&[json!([
            {
                "type": "repeat",
                "name": "ports",
                "parser": {"type": "number", "name": "port"},
                "while": {"type": "literal", "text": ","},
            },
            {"type": "rest"},
        ])]);
        assert_eq!(
            matched(&dag, "80,443,8080"),
            Some(
                json!({"ports": [{"port": 80}, {"port": 443}, {"port": 8080}]})
                    .as_object()
                    .unwrap()
                    .clone()
            )
        );
        // A separator with no item behind it fails the repeat entirely.
        assert_eq!(matched(&dag, "80,x"), None);
    }
}
