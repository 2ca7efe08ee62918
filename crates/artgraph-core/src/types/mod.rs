//! # Core Type Definitions
//!
//! This module contains the property-graph vocabulary shared by every layer:
//! - Element identifiers (`VertexId`, `EdgeId`, `Element`)
//! - Labels (`VertexLabel`, `EdgeLabel`)
//! - Property values (`PropertyValue`)
//! - Stored records (`Vertex`, `Edge`)
//! - Error types (`OgmError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ELEMENT IDENTIFIERS
// =============================================================================

/// Storage-assigned identifier of a vertex.
///
/// Adapters never choose vertex identifiers; they only read them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u64);

/// Storage-assigned identifier of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.0)
    }
}

/// A graph element emitted by a cascade: either a vertex or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    Vertex(VertexId),
    Edge(EdgeId),
}

// =============================================================================
// LABELS
// =============================================================================

/// Label of a vertex. The fixed catalog lives in [`crate::schema`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexLabel(Cow<'static, str>);

impl VertexLabel {
    /// Create a label from a static string (usable in `const` context).
    #[must_use]
    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    /// Create a label from an owned string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    /// Get the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label of a directed edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeLabel(Cow<'static, str>);

impl EdgeLabel {
    /// Create a label from a static string (usable in `const` context).
    #[must_use]
    pub const fn from_static(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    /// Create a label from an owned string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(Cow::Owned(s.into()))
    }

    /// Get the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of an adjacency lookup, relative to the vertex at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges whose `from` is the vertex.
    Out,
    /// Edges whose `to` is the vertex.
    In,
}

// =============================================================================
// PROPERTY VALUES
// =============================================================================

/// A scalar property value.
///
/// Totally ordered so that `(label, key, value)` can key a property index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl PropertyValue {
    /// Borrow the value as a string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

// =============================================================================
// STORED RECORDS
// =============================================================================

/// A vertex with its label and single-cardinality properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub label: VertexLabel,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Vertex {
    /// Create a vertex with no properties.
    #[must_use]
    pub fn new(id: VertexId, label: VertexLabel) -> Self {
        Self {
            id,
            label,
            properties: BTreeMap::new(),
        }
    }

    /// Get a property by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A directed, labeled edge `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub label: EdgeLabel,
    pub from: VertexId,
    pub to: VertexId,
}

impl Edge {
    /// The endpoint opposite to `vertex` for the given lookup direction.
    #[must_use]
    pub fn other(&self, direction: Direction) -> VertexId {
        match direction {
            Direction::Out => self.to,
            Direction::In => self.from,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the mapping layer.
///
/// - Schema-integrity errors: the stored graph violates the schema (fatal to the read)
/// - Contract violations: a caller handed in an entity missing a key field
/// - Storage errors: delegated from the backend, never retried here
#[derive(Debug, Error)]
pub enum OgmError {
    /// A vertex lacks a property or edge the schema guarantees.
    #[error("Schema integrity violated at {vertex:?}: {reason}")]
    SchemaIntegrity {
        vertex: Option<VertexId>,
        reason: String,
    },

    /// The caller supplied an entity that breaks the adapter contract.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// An edge would break an edge rule of the schema registry.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// The requested vertex was not found in the graph.
    #[error("Vertex not found: {0}")]
    VertexNotFound(VertexId),

    /// The requested edge was not found in the graph.
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// A write step was reached while executing a read-only traversal.
    #[error("Write step in read-only traversal")]
    ReadOnlyTraversal,

    /// A step received a value it cannot operate on.
    #[error("Invalid traversal: {0}")]
    InvalidTraversal(String),

    /// Nested sub-traversals exceeded the depth bound.
    #[error("Traversal nesting exceeds {0} levels")]
    TraversalTooDeep(usize),

    /// A storage-engine error (I/O, transaction, table access).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OgmError {
    /// Shorthand for a schema-integrity failure on a known vertex.
    pub fn integrity(vertex: VertexId, reason: impl Into<String>) -> Self {
        Self::SchemaIntegrity {
            vertex: Some(vertex),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
