//! Typed access to a value produced by a `project` step.
//!
//! Every accessor turns missing or mistyped data into a schema-integrity
//! error naming the vertex, so `map` implementations stay linear.

use crate::traversal::Value;
use crate::{OgmError, PropertyValue, VertexId};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field holding the projected vertex id.
pub const ID_FIELD: &str = "id";

/// A projected map with typed accessors.
#[derive(Debug)]
pub struct Projection {
    vertex: Option<VertexId>,
    fields: BTreeMap<String, Value>,
}

impl Projection {
    /// Wrap a projected map. Anything else is an integrity failure.
    pub fn new(value: Value) -> Result<Self, OgmError> {
        let Value::Map(fields) = value else {
            return Err(OgmError::SchemaIntegrity {
                vertex: None,
                reason: format!("expected a projected map, found {value:?}"),
            });
        };
        let vertex = match fields.get(ID_FIELD) {
            Some(Value::Id(id)) => Some(VertexId(*id)),
            _ => None,
        };
        Ok(Self { vertex, fields })
    }

    fn missing(&self, field: &str) -> OgmError {
        OgmError::SchemaIntegrity {
            vertex: self.vertex,
            reason: format!("missing required property {field}"),
        }
    }

    fn mistyped(&self, field: &str, value: &Value) -> OgmError {
        OgmError::SchemaIntegrity {
            vertex: self.vertex,
            reason: format!("property {field} has unexpected value {value:?}"),
        }
    }

    fn property(&self, field: &str) -> Result<Option<&PropertyValue>, OgmError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Property(p)) => Ok(Some(p)),
            Some(other) => Err(self.mistyped(field, other)),
        }
    }

    /// The projected vertex id.
    pub fn id(&self) -> Result<VertexId, OgmError> {
        self.vertex.ok_or_else(|| self.missing(ID_FIELD))
    }

    pub fn optional_str(&self, field: &str) -> Result<Option<String>, OgmError> {
        match self.property(field)? {
            None => Ok(None),
            Some(PropertyValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mistyped(field, &Value::Property(other.clone()))),
        }
    }

    pub fn required_str(&self, field: &str) -> Result<String, OgmError> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    pub fn optional_int(&self, field: &str) -> Result<Option<i64>, OgmError> {
        match self.property(field)? {
            None => Ok(None),
            Some(PropertyValue::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(self.mistyped(field, &Value::Property(other.clone()))),
        }
    }

    /// A required string property holding a UUID.
    pub fn required_uuid(&self, field: &str) -> Result<Uuid, OgmError> {
        let raw = self.required_str(field)?;
        Uuid::parse_str(&raw).map_err(|e| OgmError::SchemaIntegrity {
            vertex: self.vertex,
            reason: format!("property {field} is not a uuid: {e}"),
        })
    }

    /// A folded list field. A missing field reads as empty.
    pub fn list(&mut self, field: &str) -> Result<Vec<Value>, OgmError> {
        match self.fields.remove(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::List(items)) => Ok(items),
            Some(other) => Err(self.mistyped(field, &other)),
        }
    }
}
