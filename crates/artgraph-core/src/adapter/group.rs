//! Group adapter for [`ArtifactIdGroup`] vertices.
//!
//! ```text
//! (ArtifactIdGroup) -[ArtifactGroupHasArtifacts]-> (member)
//!                                                      |
//!                                 optional -[RemoteArtifactInheritArtifact]-> (canonical)
//! ```
//!
//! Members are read, written and cascaded through the injected member
//! adapter; the group adapter only owns the ownership edges.

use super::projection::ID_FIELD;
use super::{EntityAdapter, Projection, UnfoldTraversal, require_key_field};
use crate::domain::{Artifact, ArtifactIdGroup};
use crate::schema::{edges, properties, vertices};
use crate::traversal::{MergeKey, PropertyPatch, Stage, Traversal, Value};
use crate::{Direction, OgmError, VertexLabel};
use std::collections::BTreeSet;
use tracing::debug;

/// Projected field holding the folded members.
const ARTIFACTS_FIELD: &str = "artifacts";

/// Adapter for artifact groups, composing a member adapter.
#[derive(Debug, Clone)]
pub struct ArtifactIdGroupAdapter<A> {
    member: A,
}

impl<A> ArtifactIdGroupAdapter<A>
where
    A: EntityAdapter<Entity = Artifact>,
{
    pub fn new(member: A) -> Self {
        Self { member }
    }

    /// The composed member adapter.
    pub fn member(&self) -> &A {
        &self.member
    }

    /// Ownership edge, then the indirection edge when the member is a proxy.
    fn resolved_members() -> Traversal {
        Traversal::new()
            .out(edges::ARTIFACT_GROUP_HAS_ARTIFACTS)
            .optional(Traversal::new().out(edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT))
    }
}

impl<A> EntityAdapter for ArtifactIdGroupAdapter<A>
where
    A: EntityAdapter<Entity = Artifact>,
{
    type Entity = ArtifactIdGroup;

    fn labels(&self) -> BTreeSet<VertexLabel> {
        BTreeSet::from([vertices::ARTIFACT_ID_GROUP])
    }

    fn fold(&self) -> Traversal {
        Traversal::new()
            .project()
            .by(ID_FIELD, Traversal::new().id())
            .by(properties::UUID, Traversal::new().property(properties::UUID))
            .by(
                properties::STORAGE_ID,
                Traversal::new().property(properties::STORAGE_ID),
            )
            .by(
                properties::REPOSITORY_ID,
                Traversal::new().property(properties::REPOSITORY_ID),
            )
            .by(properties::NAME, Traversal::new().property(properties::NAME))
            .by(
                ARTIFACTS_FIELD,
                Self::resolved_members().map(self.member.fold()).fold(),
            )
            .build()
    }

    fn map(&self, value: Value) -> Result<ArtifactIdGroup, OgmError> {
        let mut p = Projection::new(value)?;
        let mut group = ArtifactIdGroup::restore(
            Some(p.id()?),
            p.required_uuid(properties::UUID)?,
            p.required_str(properties::STORAGE_ID)?,
            p.required_str(properties::REPOSITORY_ID)?,
            p.required_str(properties::NAME)?,
        );
        for member in p.list(ARTIFACTS_FIELD)? {
            group.add_artifact(self.member.map(member)?);
        }
        Ok(group)
    }

    fn unfold(&self, group: &ArtifactIdGroup) -> Result<UnfoldTraversal, OgmError> {
        require_key_field("group", properties::STORAGE_ID, group.storage_id())?;
        require_key_field("group", properties::REPOSITORY_ID, group.repository_id())?;
        require_key_field("group", properties::NAME, group.name())?;

        // Members first: every staged vertex exists before any edge is added.
        let members = Stage::new();
        let mut dependencies = Traversal::new();
        for artifact in group.artifacts() {
            let save = self
                .member
                .unfold(artifact)?
                .with_key(MergeKey::property(
                    properties::UUID,
                    artifact.uuid().to_string(),
                ))
                .save();
            dependencies = dependencies.side_effect(
                save.optional(Traversal::new().out(edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT))
                    .stage(members),
            );
        }

        let key = match group.id {
            Some(id) => MergeKey::Id(id),
            None => MergeKey::property(properties::STORAGE_ID, group.storage_id())
                .and(properties::REPOSITORY_ID, group.repository_id())
                .and(properties::NAME, group.name()),
        };

        let update = Traversal::new()
            .drop_edges(Direction::Out, edges::ARTIFACT_GROUP_HAS_ARTIFACTS)
            .patch(
                PropertyPatch::new()
                    .set_if_absent(properties::UUID, group.uuid().to_string())
                    .set(properties::STORAGE_ID, group.storage_id())
                    .set(properties::REPOSITORY_ID, group.repository_id())
                    .set(properties::NAME, group.name()),
            );

        let owner = Stage::new();
        let link = Traversal::new()
            .stage(owner)
            .select(members)
            .unfold()
            .add_edge_from(edges::ARTIFACT_GROUP_HAS_ARTIFACTS, owner);

        debug!(
            group = %group.uuid(),
            members = group.artifacts().len(),
            "planned group unfold"
        );

        Ok(UnfoldTraversal::new(vertices::ARTIFACT_ID_GROUP, key)
            .with_dependencies(dependencies)
            .with_update(update)
            .with_link(link))
    }

    fn cascade(&self) -> Traversal {
        let closure = Stage::new();
        Traversal::new()
            .stage(closure)
            .optional(
                Self::resolved_members()
                    .flat_map(self.member.cascade())
                    .stage(closure),
            )
            .select(closure)
            .unfold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ArtifactAdapter;
    use crate::graph::{Graph, GraphStore};
    use crate::traversal::Executor;
    use crate::VertexId;

    fn adapter() -> ArtifactIdGroupAdapter<ArtifactAdapter> {
        ArtifactIdGroupAdapter::new(ArtifactAdapter)
    }

    fn save(graph: &mut Graph, group: &ArtifactIdGroup) -> VertexId {
        let plan = adapter().unfold(group).expect("unfold").save();
        let out = Executor::write(graph)
            .execute(&plan, vec![Value::Null])
            .expect("save");
        out.first().and_then(Value::as_vertex).expect("group vertex")
    }

    fn load(graph: &Graph, id: VertexId) -> ArtifactIdGroup {
        let out = Executor::read(graph)
            .execute(&adapter().fold(), vec![Value::Vertex(id)])
            .expect("fold");
        adapter()
            .map(out.into_iter().next().expect("one value"))
            .expect("map")
    }

    fn owned(graph: &Graph, group: VertexId) -> usize {
        graph
            .edges(group, Direction::Out, Some(&edges::ARTIFACT_GROUP_HAS_ARTIFACTS))
            .expect("edges")
            .len()
    }

    #[test]
    fn fold_and_cascade_are_read_only() {
        assert!(adapter().fold().is_read_only());
        assert!(adapter().cascade().is_read_only());
    }

    #[test]
    fn blank_name_is_a_contract_violation() {
        let group = ArtifactIdGroup::new("s", "r", "");
        assert!(matches!(
            adapter().unfold(&group),
            Err(OgmError::ContractViolation(_))
        ));
    }

    #[test]
    fn empty_group_has_no_ownership_edges() {
        let mut graph = Graph::new();
        let group = ArtifactIdGroup::new("s", "r", "empty");
        let id = save(&mut graph, &group);

        assert_eq!(graph.vertex_count().expect("count"), 1);
        assert_eq!(owned(&graph, id), 0);
        let loaded = load(&graph, id);
        assert_eq!(loaded.name(), "empty");
        assert!(loaded.artifacts().is_empty());
    }

    #[test]
    fn stored_group_merges_by_id() {
        let mut graph = Graph::new();
        let mut group = ArtifactIdGroup::new("s", "r", "lib");
        group.add_artifact(Artifact::new("s", "r", "lib-1.jar"));
        let id = save(&mut graph, &group);

        let mut loaded = load(&graph, id);
        loaded.add_artifact(Artifact::new("s", "r", "lib-2.jar"));
        assert_eq!(save(&mut graph, &loaded), id);

        assert_eq!(owned(&graph, id), 2);
        assert_eq!(graph.vertex_count().expect("count"), 3);
    }

    #[test]
    fn unknown_group_id_is_not_recreated() {
        let mut graph = Graph::new();
        let mut group = ArtifactIdGroup::new("s", "r", "lib");
        group.id = Some(VertexId(99));
        let plan = adapter().unfold(&group).expect("unfold").save();
        let result = Executor::write(&mut graph).execute(&plan, vec![Value::Null]);
        assert!(matches!(result, Err(OgmError::VertexNotFound(VertexId(99)))));
    }

    #[test]
    fn proxy_member_reads_canonical_data() {
        let mut graph = Graph::new();
        let canonical = Artifact::new("s", "r", "lib-1.0.jar").with_size(77);
        let plan = ArtifactAdapter.unfold(&canonical).expect("unfold").save();
        let c = Executor::write(&mut graph)
            .execute(&plan, vec![Value::Null])
            .expect("canonical")[0]
            .as_vertex()
            .expect("vertex");

        let id = save(&mut graph, &ArtifactIdGroup::new("s", "remote", "lib"));
        let proxy = graph.add_vertex(&vertices::REMOTE_ARTIFACT).expect("proxy");
        graph
            .add_edge(&edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT, proxy, c)
            .expect("inherit");
        graph
            .add_edge(&edges::ARTIFACT_GROUP_HAS_ARTIFACTS, id, proxy)
            .expect("own");

        let loaded = load(&graph, id);
        assert_eq!(loaded.artifacts().len(), 1);
        assert_eq!(loaded.artifacts()[0].uuid(), canonical.uuid());
        assert_eq!(loaded.artifacts()[0].size_bytes, Some(77));
        assert_eq!(loaded.artifacts()[0].id, Some(c));
    }
}
