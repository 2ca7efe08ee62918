//! Member adapter for [`Artifact`] vertices.

use super::projection::ID_FIELD;
use super::{EntityAdapter, Projection, UnfoldTraversal, require_key_field};
use crate::domain::Artifact;
use crate::schema::{properties, vertices};
use crate::traversal::{MergeKey, PropertyPatch, Traversal, Value};
use crate::{OgmError, VertexLabel};
use std::collections::BTreeSet;

/// Adapter for canonical artifacts, keyed by uuid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactAdapter;

impl EntityAdapter for ArtifactAdapter {
    type Entity = Artifact;

    fn labels(&self) -> BTreeSet<VertexLabel> {
        BTreeSet::from([vertices::ARTIFACT])
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
            .by(properties::PATH, Traversal::new().property(properties::PATH))
            .by(properties::SIZE, Traversal::new().property(properties::SIZE))
            .by(
                properties::CHECKSUM,
                Traversal::new().property(properties::CHECKSUM),
            )
            .build()
    }

    fn map(&self, value: Value) -> Result<Artifact, OgmError> {
        let p = Projection::new(value)?;
        let mut artifact = Artifact::restore(
            Some(p.id()?),
            p.required_uuid(properties::UUID)?,
            p.required_str(properties::STORAGE_ID)?,
            p.required_str(properties::REPOSITORY_ID)?,
            p.required_str(properties::PATH)?,
        );
        artifact.size_bytes = p.optional_int(properties::SIZE)?;
        artifact.checksum = p.optional_str(properties::CHECKSUM)?;
        Ok(artifact)
    }

    fn unfold(&self, artifact: &Artifact) -> Result<UnfoldTraversal, OgmError> {
        require_key_field("artifact", properties::STORAGE_ID, &artifact.storage_id)?;
        require_key_field("artifact", properties::REPOSITORY_ID, &artifact.repository_id)?;
        require_key_field("artifact", properties::PATH, &artifact.path)?;

        let patch = PropertyPatch::new()
            .set(properties::STORAGE_ID, artifact.storage_id.as_str())
            .set(properties::REPOSITORY_ID, artifact.repository_id.as_str())
            .set(properties::PATH, artifact.path.as_str())
            .set_opt(properties::SIZE, artifact.size_bytes)
            .set_opt(properties::CHECKSUM, artifact.checksum.clone());

        Ok(UnfoldTraversal::new(
            vertices::ARTIFACT,
            MergeKey::property(properties::UUID, artifact.uuid().to_string()),
        )
        .with_update(Traversal::new().patch(patch)))
    }

    /// An artifact owns nothing; proxies pointing at it are not part of its
    /// closure.
    fn cascade(&self) -> Traversal {
        Traversal::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, GraphStore};
    use crate::traversal::Executor;

    fn save(graph: &mut Graph, artifact: &Artifact) -> crate::VertexId {
        let plan = ArtifactAdapter.unfold(artifact).expect("unfold").save();
        Executor::write(graph)
            .execute(&plan, vec![Value::Null])
            .expect("save")[0]
            .as_vertex()
            .expect("vertex")
    }

    fn load(graph: &Graph, id: crate::VertexId) -> Artifact {
        let out = Executor::read(graph)
            .execute(&ArtifactAdapter.fold(), vec![Value::Vertex(id)])
            .expect("fold");
        ArtifactAdapter
            .map(out.into_iter().next().expect("one value"))
            .expect("map")
    }

    #[test]
    fn fold_is_read_only() {
        assert!(ArtifactAdapter.fold().is_read_only());
        assert!(ArtifactAdapter.cascade().is_read_only());
    }

    #[test]
    fn save_then_load() {
        let mut graph = Graph::new();
        let artifact = Artifact::new("s", "r", "lib-1.0.jar")
            .with_size(2048)
            .with_checksum("sha1:abc");

        let id = save(&mut graph, &artifact);
        let loaded = load(&graph, id);

        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.uuid(), artifact.uuid());
        assert_eq!(loaded.path, "lib-1.0.jar");
        assert_eq!(loaded.size_bytes, Some(2048));
        assert_eq!(loaded.checksum.as_deref(), Some("sha1:abc"));
    }

    #[test]
    fn absent_optionals_do_not_clear_stored_values() {
        let mut graph = Graph::new();
        let artifact = Artifact::new("s", "r", "lib.jar").with_size(5);
        let id = save(&mut graph, &artifact);

        let mut resaved = artifact.clone();
        resaved.size_bytes = None;
        assert_eq!(save(&mut graph, &resaved), id);

        assert_eq!(load(&graph, id).size_bytes, Some(5));
        assert_eq!(graph.vertex_count().expect("count"), 1);
    }

    #[test]
    fn missing_path_is_a_contract_violation() {
        let artifact = Artifact::new("s", "r", "");
        assert!(matches!(
            ArtifactAdapter.unfold(&artifact),
            Err(OgmError::ContractViolation(_))
        ));
    }

    #[test]
    fn vertex_without_storage_id_fails_to_map() {
        let mut graph = Graph::new();
        let id = graph.add_vertex(&vertices::ARTIFACT).expect("add");
        graph
            .set_property(id, properties::UUID, uuid::Uuid::new_v4().to_string().into())
            .expect("uuid");

        let out = Executor::read(&graph)
            .execute(&ArtifactAdapter.fold(), vec![Value::Vertex(id)])
            .expect("fold");
        let result = ArtifactAdapter.map(out.into_iter().next().expect("value"));
        assert!(matches!(result, Err(OgmError::SchemaIntegrity { .. })));
    }
}
