//! Batch aggregation over an item container

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use super::field::FieldPlan;
use super::record::{assemble, Record, RecordPlan, RecordSchema};
use crate::document::Node;
use crate::error::{ExtractError, ExtractResult};
use crate::selector::{Resolver, SelectorSpec};

/// Where the items of a batch live and how each is read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    /// Always resolved as required
    pub container: SelectorSpec,
    /// Item nodes under the container; absent means the container is the one item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<SelectorSpec>,
    pub record: RecordSchema,
}

#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub container: FieldPlan,
    pub items: Option<FieldPlan>,
    pub record: RecordPlan,
}

impl BatchPlan {
    pub fn compile(spec: &BatchSpec) -> ExtractResult<Self> {
        let mut container = FieldPlan::compile(&spec.container)?;
        container.required = true;

        let items = match &spec.items {
            Some(items) => {
                let mut plan = FieldPlan::compile(items)?;
                plan.required = false;
                Some(plan)
            }
            None => None,
        };

        Ok(Self {
            container,
            items,
            record: RecordPlan::compile(&spec.record)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Ok,
    Partial,
    Failed,
}

/// Valid records in document order
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub records: Vec<Record>,
    pub count: usize,
    /// Invalid items at any depth
    pub dropped: usize,
    pub status: BatchStatus,
}

/// Status of a pipeline outcome; errors are `Failed`
pub fn status_of(result: &ExtractResult<Batch>) -> BatchStatus {
    match result {
        Ok(batch) => batch.status,
        Err(_) => BatchStatus::Failed,
    }
}

/// Locate the container, assemble every item and keep the valid ones.
///
/// An unresolved container is a `DocumentStructure` error and no batch is
/// produced. Invalid items, nested ones included, only downgrade the status
/// to `Partial`.
pub fn aggregate(resolver: &Resolver, root: Node<'_>, plan: &BatchPlan) -> ExtractResult<Batch> {
    let container = plan.container.candidates.as_slice();
    let structure_error = || ExtractError::DocumentStructure {
        container: plan.container.name.clone(),
        tried: container.len(),
    };

    let resolution = match resolver.resolve(root, &plan.container.name, container, true, None) {
        Ok(Some(resolution)) => resolution,
        Ok(None) | Err(ExtractError::MissingRequiredField { .. }) => return Err(structure_error()),
        Err(e) => return Err(e),
    };
    let container_node = resolution.nodes.first().copied().ok_or_else(structure_error)?;

    let (records, skipped) = collect_records(resolver, container_node, plan.items.as_ref(), &plan.record);
    let dropped = skipped + records.iter().map(Record::dropped).sum::<usize>();
    let status = if dropped == 0 {
        BatchStatus::Ok
    } else {
        BatchStatus::Partial
    };

    info!(
        "Extracted {} record(s) from '{}' ({} dropped)",
        records.len(),
        plan.container.name,
        dropped
    );

    Ok(Batch {
        count: records.len(),
        records,
        dropped,
        status,
    })
}

/// Assemble the items under a container, returning valid records and the
/// number of dropped ones. Unresolved items yield an empty list.
pub(crate) fn collect_records(
    resolver: &Resolver,
    container: Node<'_>,
    items: Option<&FieldPlan>,
    record: &RecordPlan,
) -> (Vec<Record>, usize) {
    let nodes = match items {
        Some(items) => {
            match resolver.resolve(container, &items.name, &items.candidates, false, None) {
                Ok(Some(resolution)) => resolution.nodes,
                _ => Vec::new(),
            }
        }
        None => vec![container],
    };
    debug!("Assembling {} item node(s)", nodes.len());

    let mut records = Vec::with_capacity(nodes.len());
    let mut dropped = 0;
    for (index, node) in nodes.into_iter().enumerate() {
        let _item = info_span!("item", index).entered();
        let record = assemble(resolver, node, record, index);
        if record.valid {
            records.push(record);
        } else {
            dropped += 1;
        }
    }

    (records, dropped)
}
