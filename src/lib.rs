//! Log normalization via a compiled parse DAG.
//!
//! A rulebase of parser configurations is compiled into a directed acyclic
//! graph, the parse DAG, whose edges are configured matcher primitives
//! ("motifs"). Rules sharing a prefix share the corresponding subgraph, and
//! named components let rules reuse whole subgraphs by reference. Matching
//! a log line is a priority-ordered recursive descent over the graph that
//! fills a structured record with the captured fields, or reports how far
//! the line got before no rule applied.
//!
//! The typical pipeline:
//!
//! 1. create a [`Context`];
//! 2. feed the rulebase through [`Context::builder`]; configurations are
//!    `serde_json` values, their source syntax lives with the host;
//! 3. freeze the graph with [`Context::optimize`];
//! 4. call [`Context::normalize`] per log line, from as many threads as
//!    desired.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

pub use cranelift_entity as entity;

pub mod builder;
pub mod context;
pub mod dag;
pub mod dag_printer;
pub mod matcher;
pub mod optimize;
pub mod stats;

mod fx;
mod result;

pub use crate::builder::RuleBuilder;
pub use crate::context::{
    Annotator, Context, Normalized, ORIGINALMSG_FIELD, Outcome, TAGS_FIELD, UNPARSED_FIELD,
};
pub use crate::dag_printer::DagPrinter;
pub use crate::matcher::{MatchResult, MatchSuccess, Record, match_at};
pub use crate::result::{BuildError, BuildResult};
pub use crate::stats::DagStats;

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
