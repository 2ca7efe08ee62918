//! # Traversal Executor
//!
//! Interprets a [`Traversal`] against a [`GraphStore`], step by step.
//!
//! Each step maps the current list of traversers to a new list. Nested
//! sub-traversals run once per input traverser, with the input as their only
//! start value. Staged values live for the lifetime of one `Executor`, so all
//! phases of a composed traversal share them.

use super::{MergeKey, PropertyPatch, Stage, Step, Traversal, Value};
use crate::graph::GraphStore;
use crate::primitives::MAX_TRAVERSAL_DEPTH;
use crate::schema;
use crate::{Direction, EdgeId, EdgeLabel, OgmError, VertexId, VertexLabel};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

enum Store<'g> {
    Read(&'g dyn GraphStore),
    Write(&'g mut dyn GraphStore),
}

/// Runs traversals against one store.
pub struct Executor<'g> {
    store: Store<'g>,
    stages: BTreeMap<Stage, Vec<Value>>,
}

impl<'g> Executor<'g> {
    /// An executor that refuses every write step.
    pub fn read(store: &'g dyn GraphStore) -> Self {
        Self {
            store: Store::Read(store),
            stages: BTreeMap::new(),
        }
    }

    /// An executor allowed to mutate the store.
    pub fn write(store: &'g mut dyn GraphStore) -> Self {
        Self {
            store: Store::Write(store),
            stages: BTreeMap::new(),
        }
    }

    /// Run `traversal` with `start` as the initial traversers.
    ///
    /// A read executor rejects a traversal containing any write step before
    /// running a single step.
    pub fn execute(
        &mut self,
        traversal: &Traversal,
        start: Vec<Value>,
    ) -> Result<Vec<Value>, OgmError> {
        if matches!(self.store, Store::Read(_)) && !traversal.is_read_only() {
            return Err(OgmError::ReadOnlyTraversal);
        }
        self.run(traversal, start, 0)
    }

    /// Values staged under `stage` so far.
    #[must_use]
    pub fn staged(&self, stage: Stage) -> &[Value] {
        self.stages.get(&stage).map_or(&[], Vec::as_slice)
    }

    fn graph(&self) -> &dyn GraphStore {
        match &self.store {
            Store::Read(g) => *g,
            Store::Write(g) => &**g,
        }
    }

    fn graph_mut(&mut self) -> Result<&mut dyn GraphStore, OgmError> {
        match &mut self.store {
            Store::Write(g) => Ok(&mut **g),
            Store::Read(_) => Err(OgmError::ReadOnlyTraversal),
        }
    }

    fn run(
        &mut self,
        traversal: &Traversal,
        input: Vec<Value>,
        depth: usize,
    ) -> Result<Vec<Value>, OgmError> {
        if depth > MAX_TRAVERSAL_DEPTH {
            return Err(OgmError::TraversalTooDeep(MAX_TRAVERSAL_DEPTH));
        }
        let mut current = input;
        for step in traversal.steps() {
            trace!(step = step.name(), depth, traversers = current.len(), "step");
            current = self.apply(step, current, depth + 1)?;
        }
        Ok(current)
    }

    fn apply(
        &mut self,
        step: &Step,
        input: Vec<Value>,
        nested: usize,
    ) -> Result<Vec<Value>, OgmError> {
        match step {
            Step::Id => input
                .into_iter()
                .map(|value| match value {
                    Value::Vertex(id) => Ok(Value::Id(id.0)),
                    Value::Edge(id) => Ok(Value::Id(id.0)),
                    other => Err(unexpected("id", &other)),
                })
                .collect(),

            Step::Property(key) => {
                let mut out = Vec::with_capacity(input.len());
                for value in &input {
                    let id = vertex_of("property", value)?;
                    let vertex = self
                        .graph()
                        .vertex(id)?
                        .ok_or(OgmError::VertexNotFound(id))?;
                    if let Some(found) = vertex.properties.get(key) {
                        out.push(Value::Property(found.clone()));
                    }
                }
                Ok(out)
            }

            Step::Adjacent(direction, label) => {
                let mut out = Vec::new();
                for value in &input {
                    let id = vertex_of(step.name(), value)?;
                    for edge in self.graph().edges(id, *direction, Some(label))? {
                        out.push(Value::Vertex(edge.other(*direction)));
                    }
                }
                Ok(out)
            }

            Step::Optional(t) => {
                let mut out = Vec::with_capacity(input.len());
                for value in input {
                    let result = self.run(t, vec![value.clone()], nested)?;
                    if result.is_empty() {
                        out.push(value);
                    } else {
                        out.extend(result);
                    }
                }
                Ok(out)
            }

            Step::Project(fields) => {
                let mut out = Vec::with_capacity(input.len());
                for value in input {
                    let mut map = BTreeMap::new();
                    for (field, t) in fields {
                        let first = self
                            .run(t, vec![value.clone()], nested)?
                            .into_iter()
                            .next()
                            .unwrap_or(Value::Null);
                        map.insert(field.clone(), first);
                    }
                    out.push(Value::Map(map));
                }
                Ok(out)
            }

            Step::Map(t) => {
                let mut out = Vec::with_capacity(input.len());
                for value in input {
                    if let Some(first) = self.run(t, vec![value], nested)?.into_iter().next() {
                        out.push(first);
                    }
                }
                Ok(out)
            }

            Step::FlatMap(t) => {
                let mut out = Vec::new();
                for value in input {
                    out.extend(self.run(t, vec![value], nested)?);
                }
                Ok(out)
            }

            Step::SideEffect(t) => {
                for value in &input {
                    self.run(t, vec![value.clone()], nested)?;
                }
                Ok(input)
            }

            Step::Fold => Ok(vec![Value::List(input)]),

            Step::Unfold => {
                let mut out = Vec::with_capacity(input.len());
                for value in input {
                    match value {
                        Value::List(items) => out.extend(items),
                        other => out.push(other),
                    }
                }
                Ok(out)
            }

            Step::Dedup => {
                let mut seen = BTreeSet::new();
                Ok(input
                    .into_iter()
                    .filter(|value| seen.insert(value.clone()))
                    .collect())
            }

            Step::Stage(stage) => {
                self.stages
                    .entry(*stage)
                    .or_default()
                    .extend(input.iter().cloned());
                Ok(input)
            }

            Step::Select(stage) => {
                if input.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![Value::List(self.staged(*stage).to_vec())])
            }

            Step::Merge { label, key, update } => {
                let mut out = Vec::with_capacity(input.len());
                for _ in &input {
                    let id = self.merge_vertex(label, key)?;
                    self.run(update, vec![Value::Vertex(id)], nested)?;
                    out.push(Value::Vertex(id));
                }
                Ok(out)
            }

            Step::Patch(patch) => {
                patch.validate()?;
                for value in &input {
                    let id = vertex_of("patch", value)?;
                    self.apply_patch(id, patch)?;
                }
                Ok(input)
            }

            Step::DropEdges(direction, label) => {
                for value in &input {
                    let id = vertex_of("drop_edges", value)?;
                    let stale = self.graph().edges(id, *direction, Some(label))?;
                    let graph = self.graph_mut()?;
                    for edge in stale {
                        graph.remove_edge(edge.id)?;
                    }
                }
                Ok(input)
            }

            Step::AddEdgeFrom { label, from } => {
                let sources = self
                    .staged(*from)
                    .iter()
                    .map(|value| vertex_of("add_edge_from", value))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut out = Vec::with_capacity(input.len() * sources.len());
                for value in &input {
                    let to = vertex_of("add_edge_from", value)?;
                    for &source in &sources {
                        out.push(Value::Edge(self.link(label, source, to)?));
                    }
                }
                Ok(out)
            }
        }
    }

    /// Resolve a merge key to a vertex, creating it when nothing matches.
    fn merge_vertex(&mut self, label: &VertexLabel, key: &MergeKey) -> Result<VertexId, OgmError> {
        if !schema::is_vertex_label(label) {
            return Err(OgmError::SchemaViolation(format!(
                "unknown vertex label {label}"
            )));
        }

        match key {
            MergeKey::Id(id) => {
                let vertex = self
                    .graph()
                    .vertex(*id)?
                    .ok_or(OgmError::VertexNotFound(*id))?;
                if &vertex.label != label {
                    return Err(OgmError::integrity(
                        *id,
                        format!("expected label {label}, found {}", vertex.label),
                    ));
                }
                Ok(*id)
            }
            MergeKey::Properties(props) => {
                let Some(((first_key, first_value), rest)) = props.split_first() else {
                    return Err(OgmError::ContractViolation(format!(
                        "empty merge key for {label}"
                    )));
                };

                let graph = self.graph();
                let mut matches = Vec::new();
                for id in graph.find_vertices(label, first_key, first_value)? {
                    let vertex = graph.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;
                    if rest
                        .iter()
                        .all(|(k, v)| vertex.properties.get(k) == Some(v))
                    {
                        matches.push(id);
                    }
                }

                match matches.as_slice() {
                    [] => {
                        let graph = self.graph_mut()?;
                        let id = graph.add_vertex(label)?;
                        for (k, v) in props {
                            graph.set_property(id, k, v.clone())?;
                        }
                        trace!(%id, %label, "merge created vertex");
                        Ok(id)
                    }
                    [id] => Ok(*id),
                    many => Err(OgmError::SchemaIntegrity {
                        vertex: many.first().copied(),
                        reason: format!("{} {label} vertices share one merge key", many.len()),
                    }),
                }
            }
        }
    }

    fn apply_patch(&mut self, id: VertexId, patch: &PropertyPatch) -> Result<(), OgmError> {
        let graph = self.graph_mut()?;
        for (key, value) in patch.present() {
            graph.set_property(id, key, value.clone())?;
        }
        for (key, value) in patch.initial() {
            if graph.property(id, key)?.is_none() {
                graph.set_property(id, key, value.clone())?;
            }
        }
        Ok(())
    }

    /// Create one schema-validated edge `from -[label]-> to`.
    fn link(&mut self, label: &EdgeLabel, from: VertexId, to: VertexId) -> Result<EdgeId, OgmError> {
        let graph = self.graph();
        let source = graph.vertex(from)?.ok_or(OgmError::VertexNotFound(from))?;
        let target = graph.vertex(to)?.ok_or(OgmError::VertexNotFound(to))?;
        let existing = graph.edges(from, Direction::Out, Some(label))?.len();
        schema::validate_edge(label, &source.label, &target.label, existing)?;

        self.graph_mut()?.add_edge(label, from, to)
    }
}

fn vertex_of(step: &str, value: &Value) -> Result<VertexId, OgmError> {
    value.as_vertex().ok_or_else(|| unexpected(step, value))
}

fn unexpected(step: &str, value: &Value) -> OgmError {
    OgmError::InvalidTraversal(format!("{step} cannot take {value:?}"))
}

// =============================================================================
// TESTS
// =============================================================================
