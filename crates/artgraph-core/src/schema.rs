//! # Graph Schema Registry
//!
//! The fixed catalog of vertex labels, edge labels and property keys, plus
//! the edge rules (direction, endpoint labels, out-degree) every write obeys.
//!
//! ```text
//! (ArtifactIdGroup) -[ArtifactGroupHasArtifacts]-> (Artifact | RemoteArtifact)
//! (RemoteArtifact)  -[RemoteArtifactInheritArtifact]-> (Artifact)
//! ```

use crate::{EdgeLabel, OgmError, VertexLabel};

/// Vertex labels.
pub mod vertices {
    use crate::VertexLabel;

    /// A named collection of artifact variants within one repository.
    pub const ARTIFACT_ID_GROUP: VertexLabel = VertexLabel::from_static("ArtifactIdGroup");
    /// A canonical, locally stored artifact.
    pub const ARTIFACT: VertexLabel = VertexLabel::from_static("Artifact");
    /// A proxy for an artifact whose data lives at a canonical `Artifact`.
    pub const REMOTE_ARTIFACT: VertexLabel = VertexLabel::from_static("RemoteArtifact");
}

/// Edge labels.
pub mod edges {
    use crate::EdgeLabel;

    /// Ownership: group -> member.
    pub const ARTIFACT_GROUP_HAS_ARTIFACTS: EdgeLabel =
        EdgeLabel::from_static("ArtifactGroupHasArtifacts");
    /// Indirection: proxy member -> canonical member.
    pub const REMOTE_ARTIFACT_INHERIT_ARTIFACT: EdgeLabel =
        EdgeLabel::from_static("RemoteArtifactInheritArtifact");
}

/// Property keys.
pub mod properties {
    pub const UUID: &str = "uuid";
    pub const STORAGE_ID: &str = "storageId";
    pub const REPOSITORY_ID: &str = "repositoryId";
    pub const NAME: &str = "name";
    pub const PATH: &str = "path";
    pub const SIZE: &str = "size";
    pub const CHECKSUM: &str = "checksum";
}

/// How many edges of one label a single vertex may have outgoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Direction and endpoint rule for one edge label.
#[derive(Debug, Clone)]
pub struct EdgeRule {
    pub label: EdgeLabel,
    pub from: VertexLabel,
    pub to: &'static [VertexLabel],
    pub out_degree: Cardinality,
}

/// All vertex labels known to the schema.
pub const VERTEX_LABELS: &[VertexLabel] = &[
    vertices::ARTIFACT_ID_GROUP,
    vertices::ARTIFACT,
    vertices::REMOTE_ARTIFACT,
];

/// All edge rules known to the schema.
pub const EDGE_RULES: &[EdgeRule] = &[
    EdgeRule {
        label: edges::ARTIFACT_GROUP_HAS_ARTIFACTS,
        from: vertices::ARTIFACT_ID_GROUP,
        to: &[vertices::ARTIFACT, vertices::REMOTE_ARTIFACT],
        out_degree: Cardinality::Many,
    },
    EdgeRule {
        label: edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT,
        from: vertices::REMOTE_ARTIFACT,
        to: &[vertices::ARTIFACT],
        out_degree: Cardinality::One,
    },
];

/// Check whether a vertex label belongs to the catalog.
#[must_use]
pub fn is_vertex_label(label: &VertexLabel) -> bool {
    VERTEX_LABELS.contains(label)
}

/// Look up the rule for an edge label.
#[must_use]
pub fn edge_rule(label: &EdgeLabel) -> Option<&'static EdgeRule> {
    EDGE_RULES.iter().find(|rule| &rule.label == label)
}

/// Validate a prospective edge `from_label -[label]-> to_label`.
///
/// `existing_out_degree` is the number of `label` edges already leaving the
/// source vertex.
pub fn validate_edge(
    label: &EdgeLabel,
    from_label: &VertexLabel,
    to_label: &VertexLabel,
    existing_out_degree: usize,
) -> Result<(), OgmError> {
    let rule = edge_rule(label)
        .ok_or_else(|| OgmError::SchemaViolation(format!("unknown edge label {label}")))?;

    if &rule.from != from_label {
        return Err(OgmError::SchemaViolation(format!(
            "{label} must leave {}, not {from_label}",
            rule.from
        )));
    }
    if !rule.to.contains(to_label) {
        return Err(OgmError::SchemaViolation(format!(
            "{label} cannot point at {to_label}"
        )));
    }
    if rule.out_degree == Cardinality::One && existing_out_degree > 0 {
        return Err(OgmError::SchemaViolation(format!(
            "{from_label} already has an outgoing {label}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_accepts_canonical_and_proxy_members() {
        let label = edges::ARTIFACT_GROUP_HAS_ARTIFACTS;
        assert!(validate_edge(&label, &vertices::ARTIFACT_ID_GROUP, &vertices::ARTIFACT, 3).is_ok());
        assert!(
            validate_edge(
                &label,
                &vertices::ARTIFACT_ID_GROUP,
                &vertices::REMOTE_ARTIFACT,
                0
            )
            .is_ok()
        );
    }

    #[test]
    fn ownership_direction_is_enforced() {
        let result = validate_edge(
            &edges::ARTIFACT_GROUP_HAS_ARTIFACTS,
            &vertices::ARTIFACT,
            &vertices::ARTIFACT_ID_GROUP,
            0,
        );
        assert!(matches!(result, Err(OgmError::SchemaViolation(_))));
    }

    #[test]
    fn indirection_is_single_valued() {
        let label = edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT;
        assert!(validate_edge(&label, &vertices::REMOTE_ARTIFACT, &vertices::ARTIFACT, 0).is_ok());
        assert!(validate_edge(&label, &vertices::REMOTE_ARTIFACT, &vertices::ARTIFACT, 1).is_err());
    }

    #[test]
    fn indirection_cannot_chain_proxies() {
        let result = validate_edge(
            &edges::REMOTE_ARTIFACT_INHERIT_ARTIFACT,
            &vertices::REMOTE_ARTIFACT,
            &vertices::REMOTE_ARTIFACT,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_edge_label_rejected() {
        let result = validate_edge(
            &EdgeLabel::new("Unknown"),
            &vertices::ARTIFACT,
            &vertices::ARTIFACT,
            0,
        );
        assert!(matches!(result, Err(OgmError::SchemaViolation(_))));
    }

    #[test]
    fn catalog_labels_are_known() {
        assert!(is_vertex_label(&vertices::ARTIFACT));
        assert!(!is_vertex_label(&VertexLabel::new("Tag")));
        assert!(edge_rule(&edges::ARTIFACT_GROUP_HAS_ARTIFACTS).is_some());
    }
}
