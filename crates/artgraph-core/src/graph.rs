//! # Graph Engine
//!
//! The property-graph storage seam for the mapping layer.
//!
//! This module defines the `GraphStore` trait and its in-memory
//! implementation. All data structures use `BTreeMap` for deterministic
//! ordering.

use crate::{
    Direction, Edge, EdgeId, EdgeLabel, OgmError, PropertyValue, Vertex, VertexId, VertexLabel,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the property-graph primitives.
///
/// It is object-safe: traversals and adapters only ever see
/// `&dyn GraphStore` or `&mut dyn GraphStore`, so in-memory and persistent
/// backends are interchangeable.
///
/// Properties have single-value cardinality: setting a key replaces its value.
pub trait GraphStore {
    /// Create a vertex with the given label. The store assigns the id.
    fn add_vertex(&mut self, label: &VertexLabel) -> Result<VertexId, OgmError>;

    /// Get a vertex with its properties.
    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, OgmError>;

    /// Set (or replace) a property on a vertex.
    fn set_property(
        &mut self,
        id: VertexId,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), OgmError>;

    /// Remove a vertex and every edge incident to it.
    fn remove_vertex(&mut self, id: VertexId) -> Result<(), OgmError>;

    /// Create a directed edge `from -> to`. Both endpoints must exist.
    fn add_edge(
        &mut self,
        label: &EdgeLabel,
        from: VertexId,
        to: VertexId,
    ) -> Result<EdgeId, OgmError>;

    /// Get an edge.
    fn edge(&self, id: EdgeId) -> Result<Option<Edge>, OgmError>;

    /// Remove an edge.
    fn remove_edge(&mut self, id: EdgeId) -> Result<(), OgmError>;

    /// Get the edges incident to a vertex in one direction, optionally
    /// restricted to one label. Ordered by edge id.
    fn edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        label: Option<&EdgeLabel>,
    ) -> Result<Vec<Edge>, OgmError>;

    /// Find vertices with the given label whose property `key` equals `value`.
    fn find_vertices(
        &self,
        label: &VertexLabel,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<VertexId>, OgmError>;

    /// Get all vertex ids in ascending order.
    fn vertex_ids(&self) -> Result<Vec<VertexId>, OgmError>;

    /// Get the total number of vertices.
    fn vertex_count(&self) -> Result<usize, OgmError>;

    /// Get the total number of edges.
    fn edge_count(&self) -> Result<usize, OgmError>;

    /// Get a single property of a vertex.
    fn property(&self, id: VertexId, key: &str) -> Result<Option<PropertyValue>, OgmError> {
        let vertex = self.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;
        Ok(vertex.properties.get(key).cloned())
    }

    /// Check if a vertex exists.
    fn contains_vertex(&self, id: VertexId) -> Result<bool, OgmError> {
        Ok(self.vertex(id)?.is_some())
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// Key of the in-memory property index.
type IndexKey = (VertexLabel, String, PropertyValue);

/// The in-memory property graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Vertex storage: VertexId -> Vertex
    vertices: BTreeMap<VertexId, Vertex>,

    /// Edge storage: EdgeId -> Edge
    edges: BTreeMap<EdgeId, Edge>,

    /// Outgoing adjacency: from -> edge ids
    out_adjacency: BTreeMap<VertexId, BTreeSet<EdgeId>>,

    /// Incoming adjacency: to -> edge ids
    in_adjacency: BTreeMap<VertexId, BTreeSet<EdgeId>>,

    /// Property index: (label, key, value) -> vertices
    property_index: BTreeMap<IndexKey, BTreeSet<VertexId>>,

    next_vertex_id: u64,
    next_edge_id: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as one all-or-nothing unit of work.
    ///
    /// `f` mutates a working copy; the copy replaces `self` only if `f`
    /// returns `Ok`. On error the graph is left untouched.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut dyn GraphStore) -> Result<T, OgmError>,
    ) -> Result<T, OgmError> {
        let mut working = self.clone();
        let out = f(&mut working)?;
        *self = working;
        Ok(out)
    }

    /// Get all vertices in deterministic order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    /// Get all edges in deterministic order.
    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Import a vertex with its original id (used when loading snapshots).
    fn import_vertex(&mut self, vertex: Vertex) {
        if vertex.id.0 >= self.next_vertex_id {
            self.next_vertex_id = vertex.id.0.saturating_add(1);
        }
        for (key, value) in &vertex.properties {
            self.property_index
                .entry((vertex.label.clone(), key.clone(), value.clone()))
                .or_default()
                .insert(vertex.id);
        }
        self.vertices.insert(vertex.id, vertex);
    }

    /// Import an edge with its original id. Dangling edges are skipped.
    fn import_edge(&mut self, edge: Edge) {
        if !self.vertices.contains_key(&edge.from) || !self.vertices.contains_key(&edge.to) {
            return;
        }
        if edge.id.0 >= self.next_edge_id {
            self.next_edge_id = edge.id.0.saturating_add(1);
        }
        self.out_adjacency.entry(edge.from).or_default().insert(edge.id);
        self.in_adjacency.entry(edge.to).or_default().insert(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn unindex(&mut self, label: &VertexLabel, key: &str, value: &PropertyValue, id: VertexId) {
        let index_key = (label.clone(), key.to_string(), value.clone());
        if let Some(ids) = self.property_index.get_mut(&index_key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.property_index.remove(&index_key);
            }
        }
    }
}

impl GraphStore for Graph {
    fn add_vertex(&mut self, label: &VertexLabel) -> Result<VertexId, OgmError> {
        let id = VertexId(self.next_vertex_id);
        self.next_vertex_id = self.next_vertex_id.saturating_add(1);
        self.vertices.insert(id, Vertex::new(id, label.clone()));
        Ok(id)
    }

    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>, OgmError> {
        Ok(self.vertices.get(&id).cloned())
    }

    fn set_property(
        &mut self,
        id: VertexId,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), OgmError> {
        let vertex = self.vertices.get_mut(&id).ok_or(OgmError::VertexNotFound(id))?;
        let label = vertex.label.clone();
        let previous = vertex.properties.insert(key.to_string(), value.clone());

        if let Some(previous) = previous {
            self.unindex(&label, key, &previous, id);
        }
        self.property_index
            .entry((label, key.to_string(), value))
            .or_default()
            .insert(id);
        Ok(())
    }

    fn remove_vertex(&mut self, id: VertexId) -> Result<(), OgmError> {
        let vertex = self.vertices.remove(&id).ok_or(OgmError::VertexNotFound(id))?;

        for (key, value) in &vertex.properties {
            self.unindex(&vertex.label, key, value, id);
        }

        let incident: BTreeSet<EdgeId> = self
            .out_adjacency
            .remove(&id)
            .into_iter()
            .chain(self.in_adjacency.remove(&id))
            .flatten()
            .collect();
        for edge_id in incident {
            // Self-loops appear in both sets; the second removal is a no-op.
            if self.edges.contains_key(&edge_id) {
                self.remove_edge(edge_id)?;
            }
        }
        Ok(())
    }

    fn add_edge(
        &mut self,
        label: &EdgeLabel,
        from: VertexId,
        to: VertexId,
    ) -> Result<EdgeId, OgmError> {
        if !self.vertices.contains_key(&from) {
            return Err(OgmError::VertexNotFound(from));
        }
        if !self.vertices.contains_key(&to) {
            return Err(OgmError::VertexNotFound(to));
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id = self.next_edge_id.saturating_add(1);
        self.import_edge(Edge {
            id,
            label: label.clone(),
            from,
            to,
        });
        Ok(id)
    }

    fn edge(&self, id: EdgeId) -> Result<Option<Edge>, OgmError> {
        Ok(self.edges.get(&id).cloned())
    }

    fn remove_edge(&mut self, id: EdgeId) -> Result<(), OgmError> {
        let edge = self.edges.remove(&id).ok_or(OgmError::EdgeNotFound(id))?;
        if let Some(ids) = self.out_adjacency.get_mut(&edge.from) {
            ids.remove(&id);
        }
        if let Some(ids) = self.in_adjacency.get_mut(&edge.to) {
            ids.remove(&id);
        }
        Ok(())
    }

    fn edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        label: Option<&EdgeLabel>,
    ) -> Result<Vec<Edge>, OgmError> {
        let adjacency = match direction {
            Direction::Out => &self.out_adjacency,
            Direction::In => &self.in_adjacency,
        };
        Ok(adjacency
            .get(&vertex)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(|edge| label.is_none_or(|l| &edge.label == l))
            .cloned()
            .collect())
    }

    fn find_vertices(
        &self,
        label: &VertexLabel,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<VertexId>, OgmError> {
        Ok(self
            .property_index
            .get(&(label.clone(), key.to_string(), value.clone()))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    fn vertex_ids(&self) -> Result<Vec<VertexId>, OgmError> {
        Ok(self.vertices.keys().copied().collect())
    }

    fn vertex_count(&self) -> Result<usize, OgmError> {
        Ok(self.vertices.len())
    }

    fn edge_count(&self) -> Result<usize, OgmError> {
        Ok(self.edges.len())
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableGraph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub next_vertex_id: u64,
    pub next_edge_id: u64,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            vertices: graph.vertices.values().cloned().collect(),
            edges: graph.edges.values().cloned().collect(),
            next_vertex_id: graph.next_vertex_id,
            next_edge_id: graph.next_edge_id,
        }
    }
}

impl From<SerializableGraph> for Graph {
    fn from(sg: SerializableGraph) -> Self {
        let mut graph = Graph::new();
        for vertex in sg.vertices {
            graph.import_vertex(vertex);
        }
        for edge in sg.edges {
            graph.import_edge(edge);
        }
        graph.next_vertex_id = graph.next_vertex_id.max(sg.next_vertex_id);
        graph.next_edge_id = graph.next_edge_id.max(sg.next_edge_id);
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{edges, vertices};

    fn owns() -> EdgeLabel {
        edges::ARTIFACT_GROUP_HAS_ARTIFACTS
    }

    #[test]
    fn add_and_lookup_vertex() {
        let mut graph = Graph::new();
        let id = graph.add_vertex(&vertices::ARTIFACT).expect("add");

        let vertex = graph.vertex(id).expect("lookup").expect("present");
        assert_eq!(vertex.label, vertices::ARTIFACT);
        assert!(vertex.properties.is_empty());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = Graph::new();
        let first = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        graph.remove_vertex(first).expect("remove");
        let second = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        assert_ne!(first, second);
    }

    #[test]
    fn set_property_replaces_single_value() {
        let mut graph = Graph::new();
        let id = graph.add_vertex(&vertices::ARTIFACT).expect("add");

        graph.set_property(id, "path", "a.jar".into()).expect("set");
        graph.set_property(id, "path", "b.jar".into()).expect("set");

        assert_eq!(
            graph.property(id, "path").expect("get"),
            Some(PropertyValue::from("b.jar"))
        );
        assert!(
            graph
                .find_vertices(&vertices::ARTIFACT, "path", &"a.jar".into())
                .expect("find")
                .is_empty()
        );
        assert_eq!(
            graph
                .find_vertices(&vertices::ARTIFACT, "path", &"b.jar".into())
                .expect("find"),
            vec![id]
        );
    }

    #[test]
    fn find_vertices_respects_label() {
        let mut graph = Graph::new();
        let artifact = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        let group = graph.add_vertex(&vertices::ARTIFACT_ID_GROUP).expect("add");
        graph.set_property(artifact, "uuid", "u-1".into()).expect("set");
        graph.set_property(group, "uuid", "u-1".into()).expect("set");

        let found = graph
            .find_vertices(&vertices::ARTIFACT, "uuid", &"u-1".into())
            .expect("find");
        assert_eq!(found, vec![artifact]);
    }

    #[test]
    fn set_property_on_missing_vertex_fails() {
        let mut graph = Graph::new();
        let result = graph.set_property(VertexId(999), "uuid", "x".into());
        assert!(matches!(result, Err(OgmError::VertexNotFound(_))));
    }

    #[test]
    fn add_edge_requires_both_endpoints() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(&vertices::ARTIFACT_ID_GROUP).expect("add");

        let result = graph.add_edge(&owns(), a, VertexId(999));
        assert!(matches!(result, Err(OgmError::VertexNotFound(VertexId(999)))));
        assert_eq!(graph.edge_count().expect("count"), 0);
    }

    #[test]
    fn parallel_edges_are_distinct() {
        let mut graph = Graph::new();
        let g = graph.add_vertex(&vertices::ARTIFACT_ID_GROUP).expect("add");
        let a = graph.add_vertex(&vertices::ARTIFACT).expect("add");

        let e1 = graph.add_edge(&owns(), g, a).expect("edge");
        let e2 = graph.add_edge(&owns(), g, a).expect("edge");

        assert_ne!(e1, e2);
        assert_eq!(graph.edges(g, Direction::Out, None).expect("edges").len(), 2);
    }

    #[test]
    fn edges_filter_by_direction_and_label() {
        let mut graph = Graph::new();
        let g = graph.add_vertex(&vertices::ARTIFACT_ID_GROUP).expect("add");
        let a = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        let p = graph.add_vertex(&vertices::REMOTE_ARTIFACT).expect("add");
        graph.add_edge(&owns(), g, a).expect("edge");
        graph
            .add_edge(&edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT, p, a)
            .expect("edge");

        assert_eq!(graph.edges(a, Direction::In, None).expect("edges").len(), 2);
        let inherited = graph
            .edges(a, Direction::In, Some(&edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT))
            .expect("edges");
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited[0].from, p);
        assert!(graph.edges(a, Direction::Out, None).expect("edges").is_empty());
    }

    #[test]
    fn remove_vertex_drops_incident_edges_and_index() {
        let mut graph = Graph::new();
        let g = graph.add_vertex(&vertices::ARTIFACT_ID_GROUP).expect("add");
        let a = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        graph.set_property(a, "uuid", "u-a".into()).expect("set");
        graph.add_edge(&owns(), g, a).expect("edge");

        graph.remove_vertex(a).expect("remove");

        assert_eq!(graph.edge_count().expect("count"), 0);
        assert!(graph.edges(g, Direction::Out, None).expect("edges").is_empty());
        assert!(
            graph
                .find_vertices(&vertices::ARTIFACT, "uuid", &"u-a".into())
                .expect("find")
                .is_empty()
        );
    }

    #[test]
    fn failed_transaction_leaves_graph_untouched() {
        let mut graph = Graph::new();
        let result: Result<(), OgmError> = graph.transaction(|store| {
            store.add_vertex(&vertices::ARTIFACT)?;
            Err(OgmError::ContractViolation("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(graph.vertex_count().expect("count"), 0);
    }

    #[test]
    fn committed_transaction_is_visible() {
        let mut graph = Graph::new();
        let id = graph
            .transaction(|store| store.add_vertex(&vertices::ARTIFACT))
            .expect("commit");
        assert!(graph.contains_vertex(id).expect("contains"));
    }

    #[test]
    fn serializable_graph_roundtrip_keeps_ids_and_index() {
        let mut graph = Graph::new();
        let g = graph.add_vertex(&vertices::ARTIFACT_ID_GROUP).expect("add");
        let a = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        graph.set_property(a, "uuid", "u-a".into()).expect("set");
        let e = graph.add_edge(&owns(), g, a).expect("edge");

        let mut restored = Graph::from(SerializableGraph::from(&graph));

        assert_eq!(restored.edge(e).expect("edge").map(|edge| edge.to), Some(a));
        assert_eq!(
            restored
                .find_vertices(&vertices::ARTIFACT, "uuid", &"u-a".into())
                .expect("find"),
            vec![a]
        );
        let next = restored.add_vertex(&vertices::ARTIFACT).expect("add");
        assert!(next > a);
    }
}
