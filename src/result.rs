//! Result and error types for rule loading.

use thiserror::Error;

/// A failure while compiling a parser configuration into the DAG.
///
/// Rule loading recovers per rule: the offending configuration is rejected
/// and the caller decides whether to continue with the remaining rules or
/// abort the load. Nothing here is a matching-time condition; a motif that
/// fails to consume input simply drives backtracking.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The configuration object has no string `type` key.
    #[error("parser configuration is missing a string `type` key")]
    MissingType,

    /// `type` names no built-in motif.
    #[error("unknown motif `{0}`")]
    UnknownMotif(String),

    /// A `@name` reference to a component that was never defined.
    #[error("reference to unknown component `@{0}`")]
    UnknownComponent(String),

    /// A component with this name already exists.
    #[error("component `{0}` is already defined")]
    DuplicateComponent(String),

    /// An `alternative` configuration without a non-empty `parser` array.
    #[error("`alternative` requires a non-empty `parser` array")]
    MalformedAlternative,

    /// A configuration that is neither an object nor a non-empty array.
    #[error("parser configuration must be an object or a non-empty array")]
    BadShape,

    /// `name` is present but not a string.
    #[error("`name` must be a string")]
    InvalidName,

    /// `priority` is present but not an integer in the accepted range.
    #[error("`priority` must be an integer between 0 and {max}", max = crate::dag::MAX_USER_PRIORITY)]
    InvalidPriority,

    /// A parameter the motif requires was absent.
    #[error("motif `{motif}` requires parameter `{key}`")]
    MissingParameter {
        /// Registry name of the motif being configured.
        motif: String,
        /// The absent parameter.
        key: String,
    },

    /// A motif parameter had the wrong shape or value.
    #[error("bad `{key}` parameter for motif `{motif}`: {message}")]
    InvalidParameter {
        /// Registry name of the motif being configured.
        motif: String,
        /// The offending parameter.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// A parameter the motif does not understand.
    #[error("motif `{motif}` does not take parameter `{key}`")]
    UnexpectedParameter {
        /// Registry name of the motif being configured, or the `@component`
        /// reference for custom types.
        motif: String,
        /// The unrecognized parameter.
        key: String,
    },
}

/// A convenient alias for rule-loading results.
pub type BuildResult<T> = Result<T, BuildError>;
