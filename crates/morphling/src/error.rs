//! Error types for Morphling rendering

use thiserror::Error;

use crate::dom::NodeId;

/// Main error type for render and rerender passes.
///
/// A pass that returns one of these is aborted where it failed. The tree is
/// left in whatever state it reached; there is no rollback.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A helper returned an error
    #[error("helper `{name}` failed: {message}")]
    Helper {
        /// Registered helper name
        name: String,
        /// Message returned by the helper
        message: String,
    },

    /// A helper was referenced that is not registered
    #[error("unknown helper `{0}`")]
    UnknownHelper(String),

    /// A component was referenced that is not registered
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    /// A block opcode points at a nested template that does not exist
    #[error("block {index} is not defined in this template")]
    UndefinedBlock {
        /// Index into the template's block table
        index: usize,
    },

    /// The opcode stream is structurally invalid
    #[error("malformed program: {0}")]
    MalformedProgram(String),

    /// Nested blocks or components went deeper than the configured limit
    #[error("render depth {depth} exceeds the limit of {max}")]
    DepthExceeded {
        /// Depth that was reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// The DOM adapter rejected an operation
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Errors raised by a [`DomHelper`](crate::dom::DomHelper) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The handle does not name a node of this document
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// The reference node is not a child of the given parent
    #[error("node {node} is not a child of {parent}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Offending node
        node: NodeId,
    },

    /// An element-only operation was applied to another kind of node
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// A text operation was applied to an element
    #[error("node {0} has no text data")]
    NotCharacterData(NodeId),

    /// Inserting the node would create a cycle
    #[error("cannot insert node {0} into itself or one of its descendants")]
    HierarchyRequest(NodeId),

    /// Trusted HTML could not be parsed
    #[error("malformed html: {0}")]
    Html(String),
}

/// Errors raised while loading a [`RenderConfig`](crate::RenderConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for the schema
    #[error("invalid render configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range
    #[error("invalid render configuration: {0}")]
    Invalid(String),
}

/// Result type alias for Morphling operations
pub type Result<T> = std::result::Result<T, RenderError>;
