//! # artgraph-core
//!
//! Object-graph mapping for an artifact repository.
//!
//! This crate translates artifact-repository entities into operations on a
//! property graph and back. Every entity adapter provides three traversals:
//!
//! - `fold`: hydrate a graph neighborhood into a typed entity in one traversal
//! - `unfold`: persist an entity idempotently (merge-by-key, no duplicates)
//! - `cascade`: collect the dependent-vertex closure for deletion
//!
//! Reads silently follow the remote-artifact indirection edge to the
//! canonical artifact; writes preserve it.
//!
//! ## Architectural Constraints
//!
//! - Adapters only build traversal expressions; the `Executor` runs them
//! - Storage is behind the object-safe `GraphStore` trait (in-memory or redb)
//! - A composed traversal runs inside one `Session` transaction
//! - NO async, NO network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod adapter;
pub mod domain;
pub mod formats;
pub mod graph;
pub mod primitives;
pub mod repository;
pub mod schema;
pub mod session;
pub mod storage;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Direction, Edge, EdgeId, EdgeLabel, Element, OgmError, PropertyValue, Vertex, VertexId,
    VertexLabel,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use graph::{Graph, GraphStore, SerializableGraph};
pub use session::{Session, StorageBackend};
pub use storage::RedbGraph;
pub use traversal::{Executor, MergeKey, PropertyPatch, Stage, Traversal, Value};

// =============================================================================
// RE-EXPORTS: Mapping Layer
// =============================================================================

pub use adapter::{
    ArtifactAdapter, ArtifactIdGroupAdapter, EntityAdapter, LabelRegistry, UnfoldTraversal,
};
pub use domain::{Artifact, ArtifactIdGroup};
pub use repository::{DeleteReport, GroupRepository};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{SnapshotHeader, graph_from_bytes, graph_to_bytes};
