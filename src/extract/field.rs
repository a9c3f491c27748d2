//! Field extraction: resolve a chain, coerce the match, fall back to a default

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info_span;

use super::batch::collect_records;
use super::record::{Record, RecordPlan, RecordSchema};
use crate::document::{Node, TextMode};
use crate::error::{ExtractError, ExtractResult};
use crate::normalize::{Normalizer, NOT_AVAILABLE};
use crate::selector::{CompiledCandidate, Resolver, SelectorSpec};

/// Typed reading of a resolved node set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Coercion {
    /// Text of the first node
    Text { mode: TextMode },
    /// Attribute (or structured member) of the first node
    Attribute { name: String },
    /// Capture group of a pattern over the first node's text or attribute.
    /// Integer and decimal captures become numbers.
    Pattern {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
    },
    /// Text of every matched node
    ListOfText,
    /// Structured value as-is; markup nodes become their text
    Raw,
    /// Nested records assembled under the first node
    Records {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<SelectorSpec>>,
        record: RecordSchema,
    },
}

fn default_group() -> usize {
    1
}

impl Default for Coercion {
    fn default() -> Self {
        Self::Text {
            mode: TextMode::Strip,
        }
    }
}

impl Coercion {
    pub fn text() -> Self {
        Self::default()
    }

    pub fn joined(separator: &str) -> Self {
        Self::Text {
            mode: TextMode::join(separator),
        }
    }

    pub fn attribute(name: &str) -> Self {
        Self::Attribute {
            name: name.to_string(),
        }
    }

    pub fn pattern(pattern: &str) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            group: 1,
            attribute: None,
        }
    }

    pub fn pattern_in(attribute: &str, pattern: &str) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            group: 1,
            attribute: Some(attribute.to_string()),
        }
    }
}

/// Value used when a field is unresolved or its coercion yields nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldDefault {
    /// `"N/A"`
    #[default]
    NotAvailable,
    /// `null`
    Null,
    /// `[]`
    EmptyList,
}

impl FieldDefault {
    pub fn value(self) -> Value {
        match self {
            Self::NotAvailable => Value::String(NOT_AVAILABLE.to_string()),
            Self::Null => Value::Null,
            Self::EmptyList => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CompiledCoercion {
    Text(TextMode),
    Attribute(String),
    Pattern {
        regex: Regex,
        group: usize,
        attribute: Option<String>,
    },
    ListOfText,
    Raw,
    Records {
        items: Option<Box<FieldPlan>>,
        record: RecordPlan,
    },
}

impl CompiledCoercion {
    pub fn compile(field: &str, coercion: &Coercion) -> ExtractResult<Self> {
        Ok(match coercion {
            Coercion::Text { mode } => Self::Text(mode.clone()),
            Coercion::Attribute { name } => Self::Attribute(name.clone()),
            Coercion::Pattern {
                pattern,
                group,
                attribute,
            } => Self::Pattern {
                regex: Regex::new(pattern)
                    .map_err(|e| ExtractError::invalid_spec(field, e.to_string()))?,
                group: *group,
                attribute: attribute.clone(),
            },
            Coercion::ListOfText => Self::ListOfText,
            Coercion::Raw => Self::Raw,
            Coercion::Records { items, record } => Self::Records {
                items: items
                    .as_deref()
                    .map(|spec| FieldPlan::compile(spec).map(Box::new))
                    .transpose()?,
                record: RecordPlan::compile(record)?,
            },
        })
    }
}

/// A selector spec compiled for repeated use
#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub name: String,
    pub candidates: Vec<CompiledCandidate>,
    pub required: bool,
    pub coercion: CompiledCoercion,
    pub default: FieldDefault,
    pub normalize: Vec<Normalizer>,
}

impl FieldPlan {
    pub fn compile(spec: &SelectorSpec) -> ExtractResult<Self> {
        if spec.candidates.is_empty() {
            return Err(ExtractError::invalid_spec(
                &spec.name,
                "a selector spec needs at least one candidate",
            ));
        }

        let candidates = spec
            .candidates
            .iter()
            .map(|c| CompiledCandidate::compile(&spec.name, c))
            .collect::<ExtractResult<Vec<_>>>()?;

        Ok(Self {
            name: spec.name.clone(),
            candidates,
            required: spec.required,
            coercion: CompiledCoercion::compile(&spec.name, &spec.coercion)?,
            default: spec.default,
            normalize: spec.normalize.clone(),
        })
    }
}

/// Outcome of one field extraction; `value` is never absent
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub name: String,
    pub value: Value,
    /// Index of the winning candidate, `None` when the default was used
    pub matched: Option<usize>,
    /// Nested records dropped while building this field
    pub dropped: usize,
}

/// Extract one field from a scope node.
///
/// Only a required, unresolved field is an error; everything else degrades to
/// the field default.
pub fn extract_field(
    resolver: &Resolver,
    scope: Node<'_>,
    plan: &FieldPlan,
    item_index: Option<usize>,
) -> ExtractResult<ExtractedField> {
    let resolution = resolver.resolve(
        scope,
        &plan.name,
        &plan.candidates,
        plan.required,
        item_index,
    )?;

    let Some(resolution) = resolution else {
        return Ok(ExtractedField {
            name: plan.name.clone(),
            value: plan.default.value(),
            matched: None,
            dropped: 0,
        });
    };

    let coercion = plan.candidates[resolution.index]
        .coercion
        .as_ref()
        .unwrap_or(&plan.coercion);

    let (value, dropped) = match coerce(resolver, coercion, &plan.name, &resolution.nodes) {
        Some((value, dropped)) => (
            plan.normalize
                .iter()
                .fold(value, |acc, normalizer| normalizer.apply(acc)),
            dropped,
        ),
        None => (plan.default.value(), 0),
    };

    Ok(ExtractedField {
        name: plan.name.clone(),
        value,
        matched: Some(resolution.index),
        dropped,
    })
}

/// Coerce the resolved nodes, returning the value and the number of nested
/// records dropped on the way
fn coerce(
    resolver: &Resolver,
    coercion: &CompiledCoercion,
    field: &str,
    nodes: &[Node<'_>],
) -> Option<(Value, usize)> {
    let first = nodes.first()?;

    let value = match coercion {
        CompiledCoercion::Text(mode) => first.text(mode).map(Value::String)?,
        CompiledCoercion::Attribute(name) => first
            .attribute(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Value::String)?,
        CompiledCoercion::Pattern {
            regex,
            group,
            attribute,
        } => {
            let source = match attribute {
                Some(name) => first.attribute(name)?,
                None => first.text(&TextMode::Strip)?,
            };
            let captured = regex.captures(&source)?.get(*group)?.as_str();
            pattern_value(captured)
        }
        CompiledCoercion::ListOfText => {
            let texts: Vec<Value> = nodes
                .iter()
                .filter_map(|n| n.text(&TextMode::Strip))
                .map(Value::String)
                .collect();
            if texts.is_empty() {
                return None;
            }
            Value::Array(texts)
        }
        CompiledCoercion::Raw => first.to_value(),
        CompiledCoercion::Records { items, record } => {
            let _nested = info_span!("nested", field).entered();
            let (records, dropped) = collect_records(resolver, *first, items.as_deref(), record);
            let nested: usize = records.iter().map(Record::dropped).sum();
            let value = Value::Array(records.iter().map(|r| r.to_value()).collect());
            return Some((value, dropped + nested));
        }
    };

    Some((value, 0))
}

fn pattern_value(captured: &str) -> Value {
    let plain: String = captured.chars().filter(|c| *c != ',').collect();
    if let Ok(n) = plain.parse::<i64>() {
        return Value::from(n);
    }
    if plain.contains('.') {
        if let Ok(f) = plain.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(captured.to_string())
}
