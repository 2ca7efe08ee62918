//! # redb-backed Graph Storage
//!
//! A disk-backed property graph using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! ## Transactions
//!
//! Every write unit of work runs inside one redb write transaction. The
//! `GraphStore` implementation lives on `RedbTransaction`, so a whole
//! composed traversal (members, group, edges) commits or aborts together.
//! Reads run on `RedbSnapshot`, a redb read transaction, and never take the
//! writer lock.

use crate::graph::GraphStore;
use crate::{
    Direction, Edge, EdgeId, EdgeLabel, OgmError, PropertyValue, Vertex, VertexId, VertexLabel,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use std::fmt::Display;
use std::path::Path;

/// Table for vertices: VertexId(u64) -> serialized Vertex bytes
const VERTICES: TableDefinition<u64, &[u8]> = TableDefinition::new("vertices");

/// Table for edges: EdgeId(u64) -> serialized Edge bytes
const EDGES: TableDefinition<u64, &[u8]> = TableDefinition::new("edges");

/// Outgoing adjacency: (from_id, edge_id) -> to_id
const OUT_ADJACENCY: TableDefinition<(u64, u64), u64> = TableDefinition::new("out_adjacency");

/// Incoming adjacency: (to_id, edge_id) -> from_id
const IN_ADJACENCY: TableDefinition<(u64, u64), u64> = TableDefinition::new("in_adjacency");

/// Property index: serialized (label, key, value) -> serialized Vec<u64> of vertex ids
const PROPERTY_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("property_index");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_VERTEX_ID: &str = "next_vertex_id";
const NEXT_EDGE_ID: &str = "next_edge_id";

fn storage_err(e: impl Display) -> OgmError {
    OgmError::Storage(e.to_string())
}

fn serialization_err(e: impl Display) -> OgmError {
    OgmError::Serialization(e.to_string())
}

/// A disk-backed property graph using redb.
pub struct RedbGraph {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbGraph").finish_non_exhaustive()
    }
}

impl RedbGraph {
    /// Open or create a graph database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OgmError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            write_txn.open_table(VERTICES).map_err(storage_err)?;
            write_txn.open_table(EDGES).map_err(storage_err)?;
            write_txn.open_table(OUT_ADJACENCY).map_err(storage_err)?;
            write_txn.open_table(IN_ADJACENCY).map_err(storage_err)?;
            write_txn.open_table(PROPERTY_INDEX).map_err(storage_err)?;
            write_txn.open_table(METADATA).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits if `f` returns `Ok`, aborts otherwise.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn GraphStore) -> Result<T, OgmError>,
    ) -> Result<T, OgmError> {
        let mut tx = RedbTransaction {
            txn: self.db.begin_write().map_err(storage_err)?,
        };
        match f(&mut tx) {
            Ok(out) => {
                tx.txn.commit().map_err(storage_err)?;
                Ok(out)
            }
            Err(e) => {
                if let Err(abort) = tx.txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort redb transaction");
                }
                Err(e)
            }
        }
    }

    /// Run a read-only `f` against a consistent view of the database.
    ///
    /// Backed by a redb read transaction: concurrent with the writer.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&dyn GraphStore) -> Result<T, OgmError>,
    ) -> Result<T, OgmError> {
        let snapshot = RedbSnapshot {
            txn: self.db.begin_read().map_err(storage_err)?,
        };
        f(&snapshot)
    }
}

// =============================================================================
// TABLE READS (shared by read and write transactions)
// =============================================================================

fn index_key(label: &VertexLabel, key: &str, value: &PropertyValue) -> Result<Vec<u8>, OgmError> {
    postcard::to_allocvec(&(label.as_str(), key, value)).map_err(serialization_err)
}

fn read_vertex(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: VertexId,
) -> Result<Option<Vertex>, OgmError> {
    match table.get(id.0).map_err(storage_err)? {
        Some(data) => Ok(Some(
            postcard::from_bytes(data.value()).map_err(serialization_err)?,
        )),
        None => Ok(None),
    }
}

fn read_edge(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: EdgeId,
) -> Result<Option<Edge>, OgmError> {
    match table.get(id.0).map_err(storage_err)? {
        Some(data) => Ok(Some(
            postcard::from_bytes(data.value()).map_err(serialization_err)?,
        )),
        None => Ok(None),
    }
}

fn read_indexed(
    table: &impl ReadableTable<&'static [u8], &'static [u8]>,
    index_key: &[u8],
) -> Result<Vec<u64>, OgmError> {
    match table.get(index_key).map_err(storage_err)? {
        Some(data) => postcard::from_bytes(data.value()).map_err(serialization_err),
        None => Ok(Vec::new()),
    }
}

/// Edge ids adjacent to `vertex`, ascending.
fn read_adjacent(
    table: &impl ReadableTable<(u64, u64), u64>,
    vertex: VertexId,
) -> Result<Vec<u64>, OgmError> {
    let mut ids = Vec::new();
    for entry in table
        .range((vertex.0, 0u64)..=(vertex.0, u64::MAX))
        .map_err(storage_err)?
    {
        let (key, _) = entry.map_err(storage_err)?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

fn read_edges(
    adjacency: &impl ReadableTable<(u64, u64), u64>,
    edges: &impl ReadableTable<u64, &'static [u8]>,
    vertex: VertexId,
    label: Option<&EdgeLabel>,
) -> Result<Vec<Edge>, OgmError> {
    let mut out = Vec::new();
    for id in read_adjacent(adjacency, vertex)? {
        if let Some(edge) = read_edge(edges, EdgeId(id))? {
            if label.is_none_or(|l| &edge.label == l) {
                out.push(edge);
            }
        }
    }
    Ok(out)
}

fn read_vertex_ids(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<VertexId>, OgmError> {
    let mut ids = Vec::new();
    for entry in table.iter().map_err(storage_err)? {
        let (key, _) = entry.map_err(storage_err)?;
        ids.push(VertexId(key.value()));
    }
    Ok(ids)
}

fn adjacency_table(direction: Direction) -> TableDefinition<'static, (u64, u64), u64> {
    match direction {
        Direction::Out => OUT_ADJACENCY,
        Direction::In => IN_ADJACENCY,
    }
}

// =============================================================================
// TRANSACTION-SCOPED STORE
// =============================================================================

/// A `GraphStore` view over one open redb write transaction.
pub struct RedbTransaction {
    txn: WriteTransaction,
}

impl RedbTransaction {
    fn next_id(&self, key: &str) -> Result<u64, OgmError> {
        let mut meta = self.txn.open_table(METADATA).map_err(storage_err)?;
        let current = meta
            .get(key)
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        meta.insert(key, current.saturating_add(1))
            .map_err(storage_err)?;
        Ok(current)
    }

    fn write_vertex(&self, vertex: &Vertex) -> Result<(), OgmError> {
        let bytes = postcard::to_allocvec(vertex).map_err(serialization_err)?;
        let mut table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        table
            .insert(vertex.id.0, bytes.as_slice())
            .map_err(storage_err)?;
        Ok(())
    }

    fn indexed(&self, index_key: &[u8]) -> Result<Vec<u64>, OgmError> {
        let table = self.txn.open_table(PROPERTY_INDEX).map_err(storage_err)?;
        read_indexed(&table, index_key)
    }

    fn write_index(&self, index_key: &[u8], ids: &[u64]) -> Result<(), OgmError> {
        let mut table = self.txn.open_table(PROPERTY_INDEX).map_err(storage_err)?;
        if ids.is_empty() {
            table.remove(index_key).map_err(storage_err)?;
        } else {
            let bytes = postcard::to_allocvec(ids).map_err(serialization_err)?;
            table
                .insert(index_key, bytes.as_slice())
                .map_err(storage_err)?;
        }
        Ok(())
    }

    fn index_insert(
        &self,
        label: &VertexLabel,
        key: &str,
        value: &PropertyValue,
        id: VertexId,
    ) -> Result<(), OgmError> {
        let index_key = index_key(label, key, value)?;
        let mut ids = self.indexed(&index_key)?;
        if let Err(pos) = ids.binary_search(&id.0) {
            ids.insert(pos, id.0);
        }
        self.write_index(&index_key, &ids)
    }

    fn index_remove(
        &self,
        label: &VertexLabel,
        key: &str,
        value: &PropertyValue,
        id: VertexId,
    ) -> Result<(), OgmError> {
        let index_key = index_key(label, key, value)?;
        let mut ids = self.indexed(&index_key)?;
        ids.retain(|&v| v != id.0);
        self.write_index(&index_key, &ids)
    }

    fn adjacent_edge_ids(&self, vertex: VertexId, direction: Direction) -> Result<Vec<u64>, OgmError> {
        let table = self
            .txn
            .open_table(adjacency_table(direction))
            .map_err(storage_err)?;
        read_adjacent(&table, vertex)
    }
}

// =============================================================================
// GRAPHSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl GraphStore for RedbTransaction {
    fn add_vertex(&mut self, label: &VertexLabel) -> Result<VertexId, OgmError> {
        let id = VertexId(self.next_id(NEXT_VERTEX_ID)?);
        self.write_vertex(&Vertex::new(id, label.clone()))?;
        Ok(id)
    }

    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, OgmError> {
        let table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        read_vertex(&table, id)
    }

    fn set_property(
        &mut self,
        id: VertexId,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), OgmError> {
        let mut vertex = self.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;
        if let Some(previous) = vertex.properties.insert(key.to_string(), value.clone()) {
            self.index_remove(&vertex.label, key, &previous, id)?;
        }
        self.index_insert(&vertex.label, key, &value, id)?;
        self.write_vertex(&vertex)
    }

    fn remove_vertex(&mut self, id: VertexId) -> Result<(), OgmError> {
        let vertex = self.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;

        for (key, value) in &vertex.properties {
            self.index_remove(&vertex.label, key, value, id)?;
        }

        let mut incident = self.adjacent_edge_ids(id, Direction::Out)?;
        incident.extend(self.adjacent_edge_ids(id, Direction::In)?);
        incident.sort_unstable();
        incident.dedup();
        for edge_id in incident {
            self.remove_edge(EdgeId(edge_id))?;
        }

        let mut table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        table.remove(id.0).map_err(storage_err)?;
        Ok(())
    }

    fn add_edge(
        &mut self,
        label: &EdgeLabel,
        from: VertexId,
        to: VertexId,
    ) -> Result<EdgeId, OgmError> {
        if !self.contains_vertex(from)? {
            return Err(OgmError::VertexNotFound(from));
        }
        if !self.contains_vertex(to)? {
            return Err(OgmError::VertexNotFound(to));
        }

        let id = EdgeId(self.next_id(NEXT_EDGE_ID)?);
        let edge = Edge {
            id,
            label: label.clone(),
            from,
            to,
        };
        let bytes = postcard::to_allocvec(&edge).map_err(serialization_err)?;
        {
            let mut table = self.txn.open_table(EDGES).map_err(storage_err)?;
            table.insert(id.0, bytes.as_slice()).map_err(storage_err)?;
        }
        {
            let mut table = self.txn.open_table(OUT_ADJACENCY).map_err(storage_err)?;
            table.insert((from.0, id.0), to.0).map_err(storage_err)?;
        }
        {
            let mut table = self.txn.open_table(IN_ADJACENCY).map_err(storage_err)?;
            table.insert((to.0, id.0), from.0).map_err(storage_err)?;
        }
        Ok(id)
    }

    fn edge(&self, id: EdgeId) -> Result<Option<Edge>, OgmError> {
        let table = self.txn.open_table(EDGES).map_err(storage_err)?;
        read_edge(&table, id)
    }

    fn remove_edge(&mut self, id: EdgeId) -> Result<(), OgmError> {
        let edge = self.edge(id)?.ok_or(OgmError::EdgeNotFound(id))?;
        {
            let mut table = self.txn.open_table(EDGES).map_err(storage_err)?;
            table.remove(id.0).map_err(storage_err)?;
        }
        {
            let mut table = self.txn.open_table(OUT_ADJACENCY).map_err(storage_err)?;
            table.remove((edge.from.0, id.0)).map_err(storage_err)?;
        }
        {
            let mut table = self.txn.open_table(IN_ADJACENCY).map_err(storage_err)?;
            table.remove((edge.to.0, id.0)).map_err(storage_err)?;
        }
        Ok(())
    }

    fn edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        label: Option<&EdgeLabel>,
    ) -> Result<Vec<Edge>, OgmError> {
        let adjacency = self
            .txn
            .open_table(adjacency_table(direction))
            .map_err(storage_err)?;
        let edges = self.txn.open_table(EDGES).map_err(storage_err)?;
        read_edges(&adjacency, &edges, vertex, label)
    }

    fn find_vertices(
        &self,
        label: &VertexLabel,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<VertexId>, OgmError> {
        let index_key = index_key(label, key, value)?;
        Ok(self.indexed(&index_key)?.into_iter().map(VertexId).collect())
    }

    fn vertex_ids(&self) -> Result<Vec<VertexId>, OgmError> {
        let table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        read_vertex_ids(&table)
    }

    fn vertex_count(&self) -> Result<usize, OgmError> {
        let table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        Ok(table.len().map_err(storage_err)? as usize)
    }

    fn edge_count(&self) -> Result<usize, OgmError> {
        let table = self.txn.open_table(EDGES).map_err(storage_err)?;
        Ok(table.len().map_err(storage_err)? as usize)
    }
}

// =============================================================================
// READ-ONLY SNAPSHOT
// =============================================================================

/// A `GraphStore` view over one redb read transaction.
///
/// Write methods fail with `ReadOnlyTraversal`.
pub struct RedbSnapshot {
    txn: ReadTransaction,
}

impl GraphStore for RedbSnapshot {
    fn add_vertex(&mut self, _label: &VertexLabel) -> Result<VertexId, OgmError> {
        Err(OgmError::ReadOnlyTraversal)
    }

    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, OgmError> {
        let table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        read_vertex(&table, id)
    }

    fn set_property(
        &mut self,
        _id: VertexId,
        _key: &str,
        _value: PropertyValue,
    ) -> Result<(), OgmError> {
        Err(OgmError::ReadOnlyTraversal)
    }

    fn remove_vertex(&mut self, _id: VertexId) -> Result<(), OgmError> {
        Err(OgmError::ReadOnlyTraversal)
    }

    fn add_edge(
        &mut self,
        _label: &EdgeLabel,
        _from: VertexId,
        _to: VertexId,
    ) -> Result<EdgeId, OgmError> {
        Err(OgmError::ReadOnlyTraversal)
    }

    fn edge(&self, id: EdgeId) -> Result<Option<Edge>, OgmError> {
        let table = self.txn.open_table(EDGES).map_err(storage_err)?;
        read_edge(&table, id)
    }

    fn remove_edge(&mut self, _id: EdgeId) -> Result<(), OgmError> {
        Err(OgmError::ReadOnlyTraversal)
    }

    fn edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        label: Option<&EdgeLabel>,
    ) -> Result<Vec<Edge>, OgmError> {
        let adjacency = self
            .txn
            .open_table(adjacency_table(direction))
            .map_err(storage_err)?;
        let edges = self.txn.open_table(EDGES).map_err(storage_err)?;
        read_edges(&adjacency, &edges, vertex, label)
    }

    fn find_vertices(
        &self,
        label: &VertexLabel,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<VertexId>, OgmError> {
        let table = self.txn.open_table(PROPERTY_INDEX).map_err(storage_err)?;
        let ids = read_indexed(&table, &index_key(label, key, value)?)?;
        Ok(ids.into_iter().map(VertexId).collect())
    }

    fn vertex_ids(&self) -> Result<Vec<VertexId>, OgmError> {
        let table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        read_vertex_ids(&table)
    }

    fn vertex_count(&self) -> Result<usize, OgmError> {
        let table = self.txn.open_table(VERTICES).map_err(storage_err)?;
        Ok(table.len().map_err(storage_err)? as usize)
    }

    fn edge_count(&self) -> Result<usize, OgmError> {
        let table = self.txn.open_table(EDGES).map_err(storage_err)?;
        Ok(table.len().map_err(storage_err)? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
