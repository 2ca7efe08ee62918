//! # Session Module
//!
//! Transaction scope over one storage backend.
//!
//! ## Storage Backends
//!
//! Session supports two storage backends:
//! - `InMemory`: Uses in-memory `Graph` (fast, volatile unless explicitly saved)
//! - `Persistent`: Uses `RedbGraph` for disk-backed ACID storage
//!
//! Either way, `transaction` runs a closure as one all-or-nothing unit of
//! work: a composed traversal commits every phase or none.

use crate::formats::{graph_from_bytes, graph_to_bytes};
use crate::graph::{Graph, GraphStore, SerializableGraph};
use crate::schema::{self, edges, properties, vertices};
use crate::storage::RedbGraph;
use crate::{Direction, OgmError, VertexId};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory graph (fast, volatile).
    InMemory(Graph),
    /// Disk-backed graph using redb (ACID, persistent).
    Persistent(RedbGraph),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(Graph::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbGraph (database handle) cannot be safely cloned.

/// Owner of one storage backend and the transactions run against it.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with an existing in-memory graph.
    #[must_use]
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            backend: StorageBackend::InMemory(graph),
        }
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, OgmError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbGraph::open(path)?),
        })
    }

    /// Load an in-memory session from a snapshot file.
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, OgmError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| OgmError::Storage(e.to_string()))?;
        let graph = graph_from_bytes(&bytes)?;
        debug!(path = %path.as_ref().display(), "loaded snapshot");
        Ok(Self::with_graph(graph))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Get an optional reference to the in-memory graph.
    ///
    /// Returns `Some(&Graph)` for in-memory backends, `None` for persistent backends.
    #[must_use]
    pub fn graph_opt(&self) -> Option<&Graph> {
        match &self.backend {
            StorageBackend::InMemory(g) => Some(g),
            StorageBackend::Persistent(_) => None,
        }
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    // =========================================================================
    // UNITS OF WORK
    // =========================================================================

    /// Run `f` against a consistent read-only view.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&dyn GraphStore) -> Result<T, OgmError>,
    ) -> Result<T, OgmError> {
        match &self.backend {
            StorageBackend::InMemory(graph) => f(graph),
            StorageBackend::Persistent(redb) => redb.read(f),
        }
    }

    /// Run `f` as one transaction: every write commits, or none does.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut dyn GraphStore) -> Result<T, OgmError>,
    ) -> Result<T, OgmError> {
        match &mut self.backend {
            StorageBackend::InMemory(graph) => graph.transaction(f),
            StorageBackend::Persistent(redb) => redb.transaction(f),
        }
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Get the vertex count.
    pub fn vertex_count(&self) -> Result<usize, OgmError> {
        self.read(|g| g.vertex_count())
    }

    /// Get the edge count.
    pub fn edge_count(&self) -> Result<usize, OgmError> {
        self.read(|g| g.edge_count())
    }

    // =========================================================================
    // REMOTE PROXIES
    // =========================================================================

    /// Create a remote proxy for the canonical artifact `canonical`.
    ///
    /// The proxy carries only a fresh uuid and one indirection edge; every
    /// other property is read through the canonical vertex.
    pub fn create_remote_proxy(&mut self, canonical: VertexId) -> Result<VertexId, OgmError> {
        let proxy = self.transaction(|g| {
            let target = g
                .vertex(canonical)?
                .ok_or(OgmError::VertexNotFound(canonical))?;
            schema::validate_edge(
                &edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT,
                &vertices::REMOTE_ARTIFACT,
                &target.label,
                0,
            )?;

            let proxy = g.add_vertex(&vertices::REMOTE_ARTIFACT)?;
            g.set_property(proxy, properties::UUID, Uuid::new_v4().to_string().into())?;
            g.add_edge(&edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT, proxy, canonical)?;
            Ok(proxy)
        })?;
        info!(%proxy, %canonical, "created remote proxy");
        Ok(proxy)
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Build an in-memory copy of the whole graph, ids preserved.
    pub fn export_graph_snapshot(&self) -> Result<Graph, OgmError> {
        if let StorageBackend::InMemory(graph) = &self.backend {
            return Ok(graph.clone());
        }

        self.read(|g| {
            let mut snapshot = SerializableGraph {
                vertices: Vec::new(),
                edges: Vec::new(),
                next_vertex_id: 0,
                next_edge_id: 0,
            };
            for id in g.vertex_ids()? {
                let vertex = g.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;
                snapshot.edges.extend(g.edges(id, Direction::Out, None)?);
                snapshot.vertices.push(vertex);
            }
            snapshot.edges.sort_by_key(|e| e.id);
            snapshot.next_vertex_id = snapshot.vertices.last().map_or(0, |v| v.id.0 + 1);
            snapshot.next_edge_id = snapshot.edges.last().map_or(0, |e| e.id.0 + 1);
            Ok(Graph::from(snapshot))
        })
    }

    /// Write the whole graph to a snapshot file.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), OgmError> {
        let bytes = graph_to_bytes(&self.export_graph_snapshot()?)?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| OgmError::Storage(e.to_string()))?;
        debug!(path = %path.as_ref().display(), "saved snapshot");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn canonical(session: &mut Session) -> VertexId {
        session
            .transaction(|g| g.add_vertex(&vertices::ARTIFACT))
            .expect("canonical")
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let mut session = Session::new();
        let result: Result<(), _> = session.transaction(|g| {
            g.add_vertex(&vertices::ARTIFACT)?;
            Err(OgmError::ContractViolation("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(session.vertex_count().expect("count"), 0);
    }

    #[test]
    fn remote_proxy_points_at_canonical() {
        let mut session = Session::new();
        let c = canonical(&mut session);
        let proxy = session.create_remote_proxy(c).expect("proxy");

        let targets = session
            .read(|g| g.edges(proxy, Direction::Out, Some(&edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT)))
            .expect("edges");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].to, c);
    }

    #[test]
    fn proxy_of_a_proxy_is_rejected() {
        let mut session = Session::new();
        let c = canonical(&mut session);
        let proxy = session.create_remote_proxy(c).expect("proxy");

        let result = session.create_remote_proxy(proxy);
        assert!(matches!(result, Err(OgmError::SchemaViolation(_))));
        assert_eq!(session.vertex_count().expect("count"), 2);
    }

    #[test]
    fn proxy_of_missing_vertex_fails() {
        let mut session = Session::new();
        assert!(matches!(
            session.create_remote_proxy(VertexId(5)),
            Err(OgmError::VertexNotFound(_))
        ));
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("graph.agrf");

        let mut session = Session::new();
        let c = canonical(&mut session);
        session.create_remote_proxy(c).expect("proxy");
        session.save_snapshot(&path).expect("save");

        let loaded = Session::load_snapshot(&path).expect("load");
        assert_eq!(loaded.vertex_count().expect("count"), 2);
        assert_eq!(loaded.edge_count().expect("count"), 1);
    }

    #[test]
    fn persistent_backend_exports_snapshot() {
        let dir = tempdir().expect("tempdir");
        let mut session = Session::with_redb(dir.path().join("graph.redb")).expect("open");
        assert!(session.is_persistent());
        assert!(session.graph_opt().is_none());

        let c = canonical(&mut session);
        let proxy = session.create_remote_proxy(c).expect("proxy");

        let graph = session.export_graph_snapshot().expect("export");
        assert_eq!(graph.vertex_count().expect("count"), 2);
        assert!(graph.contains_vertex(proxy).expect("contains"));
        assert_eq!(graph.edge_count().expect("count"), 1);
    }
}
