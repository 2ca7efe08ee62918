//! # Group Repository
//!
//! The caller side of the group adapter: it opens the transactions, runs the
//! composed traversals and turns cascade output into deletions.
//!
//! A batched cascade over several groups can reach one canonical artifact
//! through several proxies. The closure is collected into a set before
//! anything is deleted, so every element is removed exactly once.

use crate::adapter::{ArtifactAdapter, ArtifactIdGroupAdapter, EntityAdapter, LabelRegistry};
use crate::domain::{Artifact, ArtifactIdGroup};
use crate::graph::GraphStore;
use crate::primitives::MAX_CASCADE_BATCH;
use crate::schema::{self, edges, properties, vertices};
use crate::session::Session;
use crate::traversal::{Executor, Value};
use crate::{Direction, EdgeId, Element, OgmError, PropertyValue, VertexId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Outcome of a cascade delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Groups named by the caller.
    pub groups: usize,
    /// Vertices removed, groups included.
    pub vertices: usize,
    /// Edges removed, explicitly or with their vertices.
    pub edges: usize,
}

/// Load, save and cascade-delete artifact groups.
#[derive(Debug, Clone)]
pub struct GroupRepository<A = ArtifactAdapter> {
    adapter: ArtifactIdGroupAdapter<A>,
}

impl GroupRepository<ArtifactAdapter> {
    /// A repository over the standard artifact adapter.
    pub fn new() -> Result<Self, OgmError> {
        Self::with_member(ArtifactAdapter)
    }
}

impl<A> GroupRepository<A>
where
    A: EntityAdapter<Entity = Artifact>,
{
    /// A repository composing `member` into the group adapter.
    ///
    /// Fails if the two adapters claim overlapping labels.
    pub fn with_member(member: A) -> Result<Self, OgmError> {
        let mut registry = LabelRegistry::new();
        registry.register("artifact", &member)?;
        let adapter = ArtifactIdGroupAdapter::new(member);
        registry.register("artifact-id-group", &adapter)?;
        Ok(Self { adapter })
    }

    pub fn adapter(&self) -> &ArtifactIdGroupAdapter<A> {
        &self.adapter
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Persist `group` and its members in one transaction.
    pub fn save(&self, session: &mut Session, group: &ArtifactIdGroup) -> Result<VertexId, OgmError> {
        let plan = self.adapter.unfold(group)?.save();
        let id = session.transaction(|g| {
            let out = Executor::write(g).execute(&plan, vec![Value::Null])?;
            match out.as_slice() {
                [Value::Vertex(id)] => Ok(*id),
                other => Err(OgmError::InvalidTraversal(format!(
                    "group unfold produced {other:?}"
                ))),
            }
        })?;
        info!(
            group = %id,
            name = group.name(),
            members = group.artifacts().len(),
            "saved artifact group"
        );
        Ok(id)
    }

    /// Attach an existing remote proxy to a group.
    pub fn adopt(
        &self,
        session: &mut Session,
        group: VertexId,
        proxy: VertexId,
    ) -> Result<(), OgmError> {
        session.transaction(|g| {
            let owner = g.vertex(group)?.ok_or(OgmError::VertexNotFound(group))?;
            let member = g.vertex(proxy)?.ok_or(OgmError::VertexNotFound(proxy))?;
            let existing = g
                .edges(group, Direction::Out, Some(&edges::ARTIFACT_GROUP_HAS_ARTIFACTS))?
                .len();
            schema::validate_edge(
                &edges::ARTIFACT_GROUP_HAS_ARTIFACTS,
                &owner.label,
                &member.label,
                existing,
            )?;
            g.add_edge(&edges::ARTIFACT_GROUP_HAS_ARTIFACTS, group, proxy)?;
            Ok(())
        })?;
        info!(%group, %proxy, "adopted remote proxy");
        Ok(())
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Load the group stored at `id`.
    ///
    /// `None` if the vertex is missing or is not a group vertex.
    pub fn find_by_id(
        &self,
        session: &Session,
        id: VertexId,
    ) -> Result<Option<ArtifactIdGroup>, OgmError> {
        session.read(|g| {
            let Some(vertex) = g.vertex(id)? else {
                return Ok(None);
            };
            if !self.adapter.labels().contains(&vertex.label) {
                return Ok(None);
            }
            self.fold_one(g, id).map(Some)
        })
    }

    /// Load a group by its natural key.
    pub fn find(
        &self,
        session: &Session,
        storage_id: &str,
        repository_id: &str,
        name: &str,
    ) -> Result<Option<ArtifactIdGroup>, OgmError> {
        session.read(|g| {
            let mut matches = Vec::new();
            let storage = PropertyValue::from(storage_id);
            for id in g.find_vertices(&vertices::ARTIFACT_ID_GROUP, properties::STORAGE_ID, &storage)? {
                let vertex = g.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;
                if vertex.property(properties::REPOSITORY_ID).and_then(PropertyValue::as_str)
                    == Some(repository_id)
                    && vertex.property(properties::NAME).and_then(PropertyValue::as_str) == Some(name)
                {
                    matches.push(id);
                }
            }

            match matches.as_slice() {
                [] => Ok(None),
                [id] => self.fold_one(g, *id).map(Some),
                [first, ..] => Err(OgmError::integrity(
                    *first,
                    format!("{} groups share {storage_id}/{repository_id}/{name}", matches.len()),
                )),
            }
        })
    }

    fn fold_one(&self, g: &dyn GraphStore, id: VertexId) -> Result<ArtifactIdGroup, OgmError> {
        let out = Executor::read(g).execute(&self.adapter.fold(), vec![Value::Vertex(id)])?;
        let value = out
            .into_iter()
            .next()
            .ok_or_else(|| OgmError::integrity(id, "fold produced no value"))?;
        self.adapter.map(value)
    }

    // =========================================================================
    // CASCADE & DELETE
    // =========================================================================

    /// Deletion closure of every group in `groups`, each element once.
    pub fn cascade(
        &self,
        session: &Session,
        groups: &[VertexId],
    ) -> Result<BTreeSet<Element>, OgmError> {
        session.read(|g| self.closure(g, groups))
    }

    /// Cascade-delete `groups` in one transaction.
    pub fn delete(&self, session: &mut Session, groups: &[VertexId]) -> Result<DeleteReport, OgmError> {
        let report = session.transaction(|g| {
            let closure = self.closure(&*g, groups)?;
            let mut report = DeleteReport {
                groups: groups.len(),
                ..DeleteReport::default()
            };

            // Edges first: a vertex removal takes its incident edges along.
            for element in &closure {
                if let Element::Edge(id) = element {
                    if g.edge(*id)?.is_some() {
                        g.remove_edge(*id)?;
                        report.edges += 1;
                    }
                }
            }
            for element in &closure {
                if let Element::Vertex(id) = element {
                    report.edges += incident_edges(&*g, *id)?.len();
                    g.remove_vertex(*id)?;
                    report.vertices += 1;
                }
            }
            Ok(report)
        })?;
        info!(
            groups = report.groups,
            vertices = report.vertices,
            edges = report.edges,
            "cascade delete committed"
        );
        Ok(report)
    }

    fn closure(&self, g: &dyn GraphStore, groups: &[VertexId]) -> Result<BTreeSet<Element>, OgmError> {
        if groups.len() > MAX_CASCADE_BATCH {
            return Err(OgmError::ContractViolation(format!(
                "cascade batch of {} exceeds {MAX_CASCADE_BATCH}",
                groups.len()
            )));
        }

        let labels = self.adapter.labels();
        for &id in groups {
            let vertex = g.vertex(id)?.ok_or(OgmError::VertexNotFound(id))?;
            if !labels.contains(&vertex.label) {
                return Err(OgmError::ContractViolation(format!(
                    "{id} is a {}, not an artifact group",
                    vertex.label
                )));
            }
        }

        let start = groups.iter().copied().map(Value::Vertex).collect();
        let out = Executor::read(g).execute(&self.adapter.cascade(), start)?;

        let mut closure = BTreeSet::new();
        let mut repeated = 0usize;
        for value in out {
            let element = match value {
                Value::Vertex(id) => Element::Vertex(id),
                Value::Edge(id) => Element::Edge(id),
                other => {
                    return Err(OgmError::InvalidTraversal(format!(
                        "cascade produced {other:?}"
                    )));
                }
            };
            if !closure.insert(element) {
                repeated += 1;
            }
        }
        if repeated > 0 {
            warn!(
                repeated,
                groups = groups.len(),
                "cascade reached shared vertices more than once"
            );
        }
        Ok(closure)
    }
}

fn incident_edges(g: &dyn GraphStore, id: VertexId) -> Result<BTreeSet<EdgeId>, OgmError> {
    let mut incident: BTreeSet<EdgeId> = g
        .edges(id, Direction::Out, None)?
        .into_iter()
        .map(|e| e.id)
        .collect();
    incident.extend(g.edges(id, Direction::In, None)?.into_iter().map(|e| e.id));
    Ok(incident)
}

// =============================================================================
// TESTS
// =============================================================================
