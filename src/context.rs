//! Normalization context and main entry point.
//!
//! The `Context` owns a compiled rulebase and walks it through its
//! lifecycle: created empty, populated through [`Context::builder`], frozen
//! by [`Context::optimize`], then queried with [`Context::normalize`] for as
//! long as it lives. Dropping the context releases the whole graph.
//!
//! A frozen context is immutable, so normalization may run from any number
//! of threads concurrently, each call with its own output record.

use crate::builder::RuleBuilder;
use crate::dag::ParseDag;
use crate::dag_printer::DagPrinter;
use crate::matcher::{self, Record};
use crate::stats::DagStats;
use serde_json::Value;

/// Reserved record key for the tags of the accepting rule.
pub const TAGS_FIELD: &str = "event.tags";

/// Reserved record key holding the whole input line when no rule matched.
pub const ORIGINALMSG_FIELD: &str = "originalmsg";

/// Reserved record key holding the input tail past the deepest offset any
/// rule reached, when no rule matched.
pub const UNPARSED_FIELD: &str = "unparsed-data";

/// Enriches freshly normalized records based on the accepting rule's tags.
///
/// Annotation is purely additive: implementations add fields, they never
/// remove or rewrite what matching produced.
pub trait Annotator {
    /// Augment `record`, which was produced by a rule carrying `tags`.
    fn annotate(&self, record: &mut Record, tags: &[String]);
}

/// Whether a line normalized into structured data or fell through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Some rule accepted the whole line.
    Structured,
    /// No rule accepted; the record reports the original line and its
    /// unparsed tail.
    Unparsed,
}

/// The result of normalizing one line. A record is produced either way;
/// `outcome` tells the two shapes apart.
#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    /// The output record.
    pub record: Record,
    /// Structured or unparsed.
    pub outcome: Outcome,
}

impl Normalized {
    /// Did some rule accept the line?
    pub fn is_structured(&self) -> bool {
        self.outcome == Outcome::Structured
    }
}

/// Persistent data structures of a compiled rulebase.
pub struct Context {
    /// The compiled parse DAG.
    pub dag: ParseDag,
    annotator: Option<Box<dyn Annotator + Send + Sync>>,
}

impl Context {
    /// Create a context with an empty rulebase.
    pub fn new() -> Self {
        Self {
            dag: ParseDag::new(),
            annotator: None,
        }
    }

    /// A builder for adding rules and components to this context.
    pub fn builder(&mut self) -> RuleBuilder<'_> {
        RuleBuilder::new(&mut self.dag)
    }

    /// Freeze the rulebase: sort edges into priority order and compact
    /// literal chains. Call once, after the last rule is added.
    pub fn optimize(&mut self) {
        crate::optimize::optimize(&mut self.dag);
    }

    /// Install the annotator invoked on tagged matches.
    pub fn set_annotator(&mut self, annotator: Box<dyn Annotator + Send + Sync>) {
        self.annotator = Some(annotator);
    }

    /// Normalize one log line.
    ///
    /// On success the record holds the captured fields; if the accepting
    /// rule carries tags, they land under [`TAGS_FIELD`] and the annotator
    /// (if any) runs once. On failure the record holds the input under
    /// [`ORIGINALMSG_FIELD`] and its unconsumed tail under
    /// [`UNPARSED_FIELD`].
    pub fn normalize(&self, line: &str) -> Normalized {
        let mut record = Record::new();
        let result = matcher::match_at(&self.dag, self.dag.root(), line, 0, false, &mut record);
        match result.success {
            Some(success) => {
                let tags = &self.dag[success.terminal].tags;
                if !tags.is_empty() {
                    record.insert(
                        TAGS_FIELD.to_string(),
                        Value::Array(tags.iter().map(|t| Value::from(t.as_str())).collect()),
                    );
                    if let Some(annotator) = &self.annotator {
                        annotator.annotate(&mut record, tags);
                    }
                }
                Normalized {
                    record,
                    outcome: Outcome::Structured,
                }
            }
            None => {
                log::debug!("no rule matched; deepest offset {}", result.deepest);
                record.insert(ORIGINALMSG_FIELD.to_string(), Value::from(line));
                record.insert(UNPARSED_FIELD.to_string(), Value::from(&line[result.deepest..]));
                Normalized {
                    record,
                    outcome: Outcome::Unparsed,
                }
            }
        }
    }

    /// Statistics over the compiled graph.
    pub fn stats(&self) -> DagStats {
        DagStats::compute(&self.dag)
    }

    /// A `dot` rendering of the compiled graph.
    pub fn printer(&self) -> DagPrinter<'_> {
        DagPrinter::new(&self.dag)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn normalize_produces_a_record_either_way() {
        let mut ctx = Context::new();
        ctx.builder()
            .add_rule(
                &json!([
                    {"type": "literal", "text": "user="},
                    {"type": "word", "name": "user"},
                ]),
                &[],
            )
            .unwrap();
        ctx.optimize();

        let hit = ctx.normalize("user=alice");
        assert!(hit.is_structured());
        assert_eq!(hit.record["user"], "alice");

        let miss = ctx.normalize("user!");
        assert_eq!(miss.outcome, Outcome::Unparsed);
        assert_eq!(miss.record[ORIGINALMSG_FIELD], "user!");
        assert_eq!(miss.record[UNPARSED_FIELD], "user!");
    }

    struct Counting(AtomicUsize);

    impl Annotator for Counting {
        fn annotate(&self, record: &mut Record, tags: &[String]) {
            self.0.fetch_add(1, Ordering::Relaxed);
            record.insert("annotated".to_string(), Value::from(tags.len() as u64));
        }
    }

    #[test]
    fn tags_reach_the_record_and_the_annotator_runs_once() {
        let mut ctx = Context::new();
        ctx.builder()
            .add_rule(&json!({"type": "rest"}), &["login".to_string()])
            .unwrap();
        ctx.set_annotator(Box::new(Counting(AtomicUsize::new(0))));
        ctx.optimize();

        let out = ctx.normalize("anything at all");
        assert!(out.is_structured());
        assert_eq!(out.record[TAGS_FIELD], json!(["login"]));
        assert_eq!(out.record["annotated"], 1);
    }

    #[test]
    fn untagged_matches_skip_the_annotator() {
        let mut ctx = Context::new();
        ctx.builder().add_rule(&json!({"type": "rest"}), &[]).unwrap();
        ctx.set_annotator(Box::new(Counting(AtomicUsize::new(0))));
        ctx.optimize();
        let out = ctx.normalize("plain");
        assert!(out.is_structured());
        assert!(!out.record.contains_key(TAGS_FIELD));
        assert!(!out.record.contains_key("annotated"));
    }
}
