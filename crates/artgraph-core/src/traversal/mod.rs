//! # Traversal Expressions
//!
//! A small, composable expression language describing "read this shape" and
//! "write this shape" against a property graph, independent of any query
//! syntax. Expressions are plain data; [`Executor`] runs them against a
//! [`GraphStore`](crate::GraphStore).
//!
//! ```text
//! out(ArtifactGroupHasArtifacts) -> optional(out(RemoteArtifactInheritArtifact)) -> fold
//! ```
//!
//! Values staged by one phase of a composed traversal and consumed by a later
//! phase travel through explicit [`Stage`] handles, never through names.

mod executor;

pub use executor::Executor;

use crate::primitives::{MAX_PROPERTY_KEY_LENGTH, MAX_STRING_VALUE_LENGTH};
use crate::{Direction, EdgeId, EdgeLabel, OgmError, PropertyValue, VertexId, VertexLabel};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// VALUES
// =============================================================================

/// A value flowing between traversal steps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Null,
    Id(u64),
    Vertex(VertexId),
    Edge(EdgeId),
    Property(PropertyValue),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The vertex this value refers to, if any.
    #[must_use]
    pub fn as_vertex(&self) -> Option<VertexId> {
        match self {
            Self::Vertex(v) => Some(*v),
            _ => None,
        }
    }

    /// Check for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// =============================================================================
// STAGING HANDLES
// =============================================================================

static NEXT_STAGE: AtomicU64 = AtomicU64::new(0);

/// An explicit handle to values accumulated during one traversal execution.
///
/// Every `Stage::new()` is distinct, so nested adapter compositions never
/// collide on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stage(u64);

impl Stage {
    /// Allocate a fresh handle.
    #[allow(clippy::new_without_default)]
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_STAGE.fetch_add(1, Ordering::Relaxed))
    }
}

// =============================================================================
// WRITE PAYLOADS
// =============================================================================

/// Set-if-present property writes.
///
/// An entry with `None` leaves the stored property unchanged; it never
/// clears it or replaces it with a default. Entries added with
/// `set_if_absent` are written only when the vertex lacks the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPatch {
    entries: BTreeMap<String, Option<PropertyValue>>,
    initial: BTreeMap<String, PropertyValue>,
}

impl PropertyPatch {
    /// Create an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.entries.insert(key.to_string(), Some(value.into()));
        self
    }

    /// Set `key` only if `value` is present.
    #[must_use]
    pub fn set_opt<V: Into<PropertyValue>>(mut self, key: &str, value: Option<V>) -> Self {
        self.entries.insert(key.to_string(), value.map(Into::into));
        self
    }

    /// Set `key` to `value` unless the vertex already has `key`.
    #[must_use]
    pub fn set_if_absent(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.initial.insert(key.to_string(), value.into());
        self
    }

    /// Entries that will actually be written.
    pub fn present(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    /// Entries written only where the key is missing.
    pub fn initial(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.initial.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check whether the patch writes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.present().next().is_none() && self.initial.is_empty()
    }

    /// Reject keys and values beyond the input limits.
    pub fn validate(&self) -> Result<(), OgmError> {
        for (key, value) in self.present().chain(self.initial()) {
            if key.is_empty() || key.len() > MAX_PROPERTY_KEY_LENGTH {
                return Err(OgmError::ContractViolation(format!(
                    "property key length {} outside 1..={MAX_PROPERTY_KEY_LENGTH}",
                    key.len()
                )));
            }
            if let PropertyValue::Str(s) = value {
                if s.len() > MAX_STRING_VALUE_LENGTH {
                    return Err(OgmError::ContractViolation(format!(
                        "value of {key} exceeds {MAX_STRING_VALUE_LENGTH} bytes"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// How a merge step locates an existing vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeKey {
    /// The vertex is already stored under this id.
    Id(VertexId),
    /// Match on every listed property; create with them if nothing matches.
    Properties(Vec<(String, PropertyValue)>),
}

impl MergeKey {
    /// A single-property key.
    #[must_use]
    pub fn property(key: &str, value: impl Into<PropertyValue>) -> Self {
        Self::Properties(vec![(key.to_string(), value.into())])
    }

    /// Extend a property key with one more property.
    #[must_use]
    pub fn and(self, key: &str, value: impl Into<PropertyValue>) -> Self {
        match self {
            Self::Properties(mut props) => {
                props.push((key.to_string(), value.into()));
                Self::Properties(props)
            }
            id @ Self::Id(_) => id,
        }
    }
}

// =============================================================================
// STEPS
// =============================================================================

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Element -> its id.
    Id,
    /// Vertex -> value of a property (nothing if absent).
    Property(String),
    /// Vertex -> adjacent vertices along edges of a label.
    Adjacent(Direction, EdgeLabel),
    /// Sub-traversal output if non-empty, otherwise the input itself.
    Optional(Traversal),
    /// Value -> map of field -> first result of the field's traversal.
    Project(Vec<(String, Traversal)>),
    /// Value -> first result of the sub-traversal (dropped if none).
    Map(Traversal),
    /// Value -> every result of the sub-traversal.
    FlatMap(Traversal),
    /// Run the sub-traversal, pass the input through.
    SideEffect(Traversal),
    /// All traversers -> one list.
    Fold,
    /// List -> its items.
    Unfold,
    /// Drop values already seen, keeping first occurrences.
    Dedup,
    /// Append each value to a handle, pass it through.
    Stage(Stage),
    /// Replace the stream with one list of the handle's values.
    Select(Stage),
    /// Find-or-create a vertex, apply `update` to it, emit it.
    Merge {
        label: VertexLabel,
        key: MergeKey,
        update: Traversal,
    },
    /// Set-if-present property writes on the current vertex.
    Patch(PropertyPatch),
    /// Remove the current vertex's edges of a label in one direction.
    DropEdges(Direction, EdgeLabel),
    /// Create an edge from every staged vertex to the current vertex.
    AddEdgeFrom { label: EdgeLabel, from: Stage },
}

impl Step {
    /// Step name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Property(_) => "property",
            Self::Adjacent(Direction::Out, _) => "out",
            Self::Adjacent(Direction::In, _) => "in",
            Self::Optional(_) => "optional",
            Self::Project(_) => "project",
            Self::Map(_) => "map",
            Self::FlatMap(_) => "flat_map",
            Self::SideEffect(_) => "side_effect",
            Self::Fold => "fold",
            Self::Unfold => "unfold",
            Self::Dedup => "dedup",
            Self::Stage(_) => "stage",
            Self::Select(_) => "select",
            Self::Merge { .. } => "merge",
            Self::Patch(_) => "patch",
            Self::DropEdges(..) => "drop_edges",
            Self::AddEdgeFrom { .. } => "add_edge_from",
        }
    }

    /// Check whether the step mutates the graph.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Merge { .. } | Self::Patch(_) | Self::DropEdges(..) | Self::AddEdgeFrom { .. }
        )
    }
}

// =============================================================================
// TRAVERSAL
// =============================================================================

/// An ordered list of steps, built by chaining.
///
/// An empty traversal is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traversal {
    steps: Vec<Step>,
}

impl Traversal {
    /// The identity traversal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the steps.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Check whether the traversal is the identity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check that no step, at any nesting level, writes to the graph.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.steps.iter().all(|step| {
            !step.is_write()
                && match step {
                    Step::Optional(t)
                    | Step::Map(t)
                    | Step::FlatMap(t)
                    | Step::SideEffect(t) => t.is_read_only(),
                    Step::Project(fields) => fields.iter().all(|(_, t)| t.is_read_only()),
                    _ => true,
                }
        })
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append every step of `other`.
    #[must_use]
    pub fn then(mut self, other: Traversal) -> Self {
        self.steps.extend(other.steps);
        self
    }

    #[must_use]
    pub fn id(self) -> Self {
        self.push(Step::Id)
    }

    #[must_use]
    pub fn property(self, key: &str) -> Self {
        self.push(Step::Property(key.to_string()))
    }

    #[must_use]
    pub fn out(self, label: EdgeLabel) -> Self {
        self.push(Step::Adjacent(Direction::Out, label))
    }

    #[must_use]
    pub fn in_(self, label: EdgeLabel) -> Self {
        self.push(Step::Adjacent(Direction::In, label))
    }

    #[must_use]
    pub fn optional(self, t: Traversal) -> Self {
        self.push(Step::Optional(t))
    }

    /// Start a projection; add fields with [`Projector::by`].
    #[must_use]
    pub fn project(self) -> Projector {
        Projector {
            base: self,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn map(self, t: Traversal) -> Self {
        self.push(Step::Map(t))
    }

    #[must_use]
    pub fn flat_map(self, t: Traversal) -> Self {
        self.push(Step::FlatMap(t))
    }

    #[must_use]
    pub fn side_effect(self, t: Traversal) -> Self {
        self.push(Step::SideEffect(t))
    }

    #[must_use]
    pub fn fold(self) -> Self {
        self.push(Step::Fold)
    }

    #[must_use]
    pub fn unfold(self) -> Self {
        self.push(Step::Unfold)
    }

    #[must_use]
    pub fn dedup(self) -> Self {
        self.push(Step::Dedup)
    }

    #[must_use]
    pub fn stage(self, stage: Stage) -> Self {
        self.push(Step::Stage(stage))
    }

    #[must_use]
    pub fn select(self, stage: Stage) -> Self {
        self.push(Step::Select(stage))
    }

    #[must_use]
    pub fn merge(self, label: VertexLabel, key: MergeKey, update: Traversal) -> Self {
        self.push(Step::Merge { label, key, update })
    }

    #[must_use]
    pub fn patch(self, patch: PropertyPatch) -> Self {
        self.push(Step::Patch(patch))
    }

    #[must_use]
    pub fn drop_edges(self, direction: Direction, label: EdgeLabel) -> Self {
        self.push(Step::DropEdges(direction, label))
    }

    #[must_use]
    pub fn add_edge_from(self, label: EdgeLabel, from: Stage) -> Self {
        self.push(Step::AddEdgeFrom { label, from })
    }
}

/// Builder for a `project` step.
#[derive(Debug, Clone)]
pub struct Projector {
    base: Traversal,
    fields: Vec<(String, Traversal)>,
}

impl Projector {
    /// Add a field computed by `t`.
    #[must_use]
    pub fn by(mut self, field: &str, t: Traversal) -> Self {
        self.fields.push((field.to_string(), t));
        self
    }

    /// Finish the projection.
    #[must_use]
    pub fn build(self) -> Traversal {
        self.base.push(Step::Project(self.fields))
    }
}

// =============================================================================
// TESTS
// =============================================================================
