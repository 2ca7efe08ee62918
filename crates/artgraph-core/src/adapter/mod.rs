//! # Entity Adapters
//!
//! An adapter translates one entity type to and from its graph
//! neighborhood through three traversals:
//!
//! - `fold`: read a vertex and its neighborhood into one projected value,
//!   turned into the entity by `map`;
//! - `unfold`: write the entity idempotently (merge-by-key, never duplicate);
//! - `cascade`: collect the vertex plus every vertex it owns, for a caller to
//!   delete once the closure is complete.
//!
//! Adapters compose: a parent adapter embeds its child's traversals inside
//! its own, so one composed expression runs in one transaction.

mod artifact;
mod group;
mod projection;

pub use artifact::ArtifactAdapter;
pub use group::ArtifactIdGroupAdapter;
pub use projection::Projection;

use crate::schema;
use crate::traversal::{MergeKey, Traversal, Value};
use crate::{OgmError, VertexLabel};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ADAPTER CONTRACT
// =============================================================================

/// Translation contract between one entity type and the graph.
pub trait EntityAdapter {
    type Entity;

    /// Vertex labels this adapter claims. Non-empty; disjoint from every
    /// other registered adapter.
    fn labels(&self) -> BTreeSet<VertexLabel>;

    /// Read-only traversal from an entity vertex to its projected value.
    fn fold(&self) -> Traversal;

    /// Build the entity from one value produced by [`fold`](Self::fold).
    fn map(&self, value: Value) -> Result<Self::Entity, OgmError>;

    /// Write plan for `entity`.
    fn unfold(&self, entity: &Self::Entity) -> Result<UnfoldTraversal, OgmError>;

    /// Traversal from an entity vertex to its deletion closure. Never deletes.
    fn cascade(&self) -> Traversal;
}

/// Write plan produced by [`EntityAdapter::unfold`].
///
/// `dependencies` runs first and must leave every vertex the entity links to
/// in place. The entity vertex is then merged on `key`, `update` runs on it,
/// and `link` runs with it as the only traverser.
#[derive(Debug, Clone)]
pub struct UnfoldTraversal {
    label: VertexLabel,
    key: MergeKey,
    dependencies: Traversal,
    update: Traversal,
    link: Traversal,
}

impl UnfoldTraversal {
    #[must_use]
    pub fn new(label: VertexLabel, key: MergeKey) -> Self {
        Self {
            label,
            key,
            dependencies: Traversal::new(),
            update: Traversal::new(),
            link: Traversal::new(),
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Traversal) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn with_update(mut self, update: Traversal) -> Self {
        self.update = update;
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: Traversal) -> Self {
        self.link = link;
        self
    }

    /// Replace the merge key.
    #[must_use]
    pub fn with_key(mut self, key: MergeKey) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn label(&self) -> &VertexLabel {
        &self.label
    }

    #[must_use]
    pub fn key(&self) -> &MergeKey {
        &self.key
    }

    /// Compose the plan into one traversal emitting the entity vertex.
    ///
    /// Start it with a single traverser (any value); the merge ignores it.
    #[must_use]
    pub fn save(self) -> Traversal {
        let mut t = Traversal::new();
        if !self.dependencies.is_empty() {
            t = t.side_effect(self.dependencies);
        }
        t = t.merge(self.label, self.key, self.update);
        if !self.link.is_empty() {
            t = t.side_effect(self.link);
        }
        t
    }
}

/// Reject an empty value for a field the merge key depends on.
pub(crate) fn require_key_field(entity: &str, field: &str, value: &str) -> Result<(), OgmError> {
    if value.trim().is_empty() {
        return Err(OgmError::ContractViolation(format!(
            "{entity} has an empty {field}"
        )));
    }
    Ok(())
}

// =============================================================================
// LABEL REGISTRY
// =============================================================================

/// Startup check that adapters claim disjoint, known labels.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    claimed: BTreeMap<VertexLabel, String>,
}

impl LabelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the labels of `adapter` under `name`.
    pub fn register<A: EntityAdapter>(&mut self, name: &str, adapter: &A) -> Result<(), OgmError> {
        let labels = adapter.labels();
        if labels.is_empty() {
            return Err(OgmError::ContractViolation(format!(
                "adapter {name} claims no labels"
            )));
        }
        for label in &labels {
            if !schema::is_vertex_label(label) {
                return Err(OgmError::SchemaViolation(format!(
                    "adapter {name} claims unknown label {label}"
                )));
            }
            if let Some(owner) = self.claimed.get(label) {
                return Err(OgmError::ContractViolation(format!(
                    "label {label} claimed by both {owner} and {name}"
                )));
            }
        }
        for label in labels {
            self.claimed.insert(label, name.to_string());
        }
        Ok(())
    }

    /// Name of the adapter that claimed `label`.
    #[must_use]
    pub fn owner(&self, label: &VertexLabel) -> Option<&str> {
        self.claimed.get(label).map(String::as_str)
    }
}

// =============================================================================
// TESTS
// =============================================================================
