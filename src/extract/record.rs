//! Record assembly with per-item failure isolation

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use super::field::{extract_field, ExtractedField, FieldPlan};
use crate::document::Node;
use crate::error::{ExtractError, ExtractResult};
use crate::selector::{Resolver, SelectorSpec};

/// Field chains making up one record kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub fields: Vec<SelectorSpec>,
}

impl RecordSchema {
    pub fn new(fields: Vec<SelectorSpec>) -> Self {
        Self { fields }
    }
}

#[derive(Debug, Clone)]
pub struct RecordPlan {
    pub fields: Vec<FieldPlan>,
}

impl RecordPlan {
    pub fn compile(schema: &RecordSchema) -> ExtractResult<Self> {
        if schema.fields.is_empty() {
            return Err(ExtractError::Config {
                message: "record schema has no fields".to_string(),
            });
        }

        let mut fields: Vec<FieldPlan> = Vec::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            if fields.iter().any(|f| f.name == spec.name) {
                return Err(ExtractError::invalid_spec(&spec.name, "duplicate field name"));
            }
            fields.push(FieldPlan::compile(spec)?);
        }

        Ok(Self { fields })
    }
}

/// One extracted item
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fields: Vec<ExtractedField>,
    pub valid: bool,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&ExtractedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    /// Nested records dropped while building this record's fields
    pub fn dropped(&self) -> usize {
        self.fields.iter().map(|f| f.dropped).sum()
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

/// Build one record from its item node.
///
/// A required field that cannot be resolved marks the record invalid; it
/// never escapes as an error, so sibling items are unaffected.
pub fn assemble(resolver: &Resolver, item: Node<'_>, plan: &RecordPlan, index: usize) -> Record {
    let mut fields = Vec::with_capacity(plan.fields.len());

    for field in &plan.fields {
        match extract_field(resolver, item, field, Some(index)) {
            Ok(extracted) => fields.push(extracted),
            Err(e) => {
                warn!(
                    "Dropping item {}: field '{}' unresolved after {} candidates ({})",
                    index,
                    field.name,
                    field.candidates.len(),
                    e
                );
                return Record {
                    fields,
                    valid: false,
                };
            }
        }
    }

    Record {
        fields,
        valid: true,
    }
}
