//! # Domain Entities
//!
//! The artifact-repository entities the adapters translate to and from the
//! graph. They carry no graph logic: an entity only knows its own fields and
//! its in-memory membership rules.

use crate::VertexId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ARTIFACT
// =============================================================================

/// One stored artifact variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Graph identity, known once stored.
    pub id: Option<VertexId>,
    uuid: Uuid,
    pub storage_id: String,
    pub repository_id: String,
    /// Artifact coordinates inside the repository.
    pub path: String,
    pub size_bytes: Option<i64>,
    pub checksum: Option<String>,
}

impl Artifact {
    /// A new, unstored artifact with a fresh external identity.
    #[must_use]
    pub fn new(
        storage_id: impl Into<String>,
        repository_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::restore(None, Uuid::new_v4(), storage_id, repository_id, path)
    }

    /// Rebuild an artifact read back from the graph.
    #[must_use]
    pub fn restore(
        id: Option<VertexId>,
        uuid: Uuid,
        storage_id: impl Into<String>,
        repository_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id,
            uuid,
            storage_id: storage_id.into(),
            repository_id: repository_id.into(),
            path: path.into(),
            size_bytes: None,
            checksum: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size_bytes: i64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// External identity; fixed at construction.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

// =============================================================================
// ARTIFACT ID GROUP
// =============================================================================

/// A named collection of artifact variants within one repository.
///
/// Identified in the graph by `(storage_id, repository_id, name)`. Members
/// form a set keyed by artifact uuid; iteration follows insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactIdGroup {
    /// Graph identity, known once stored.
    pub id: Option<VertexId>,
    uuid: Uuid,
    storage_id: String,
    repository_id: String,
    name: String,
    artifacts: Vec<Artifact>,
}

impl ArtifactIdGroup {
    /// A new, unstored, empty group.
    #[must_use]
    pub fn new(
        storage_id: impl Into<String>,
        repository_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::restore(None, Uuid::new_v4(), storage_id, repository_id, name)
    }

    /// Rebuild an empty group read back from the graph.
    #[must_use]
    pub fn restore(
        id: Option<VertexId>,
        uuid: Uuid,
        storage_id: impl Into<String>,
        repository_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            uuid,
            storage_id: storage_id.into(),
            repository_id: repository_id.into(),
            name: name.into(),
            artifacts: Vec::new(),
        }
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[must_use]
    pub fn storage_id(&self) -> &str {
        &self.storage_id
    }

    #[must_use]
    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in insertion order.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Add a member. A member with the same uuid is replaced in place.
    pub fn add_artifact(&mut self, artifact: Artifact) {
        match self.artifacts.iter_mut().find(|a| a.uuid == artifact.uuid) {
            Some(slot) => *slot = artifact,
            None => self.artifacts.push(artifact),
        }
    }

    /// Remove the member with `uuid`, if present.
    pub fn remove_artifact(&mut self, uuid: Uuid) -> Option<Artifact> {
        let index = self.artifacts.iter().position(|a| a.uuid == uuid)?;
        Some(self.artifacts.remove(index))
    }

    /// Find a member by uuid.
    #[must_use]
    pub fn artifact(&self, uuid: Uuid) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.uuid == uuid)
    }
}
