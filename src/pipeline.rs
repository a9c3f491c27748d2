//! One synchronous extraction run per request
//!
//! parse → locate container → assemble items → envelope.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::PipelineConfig;
use crate::document::{parse_document, RawDocument};
use crate::error::{ExtractError, ExtractResult};
use crate::extract::{aggregate, Batch, BatchPlan, Record};
use crate::selector::Resolver;

/// Entity kind a document is read as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    TitleList,
    VenueListing,
    ItemDetail,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleList => "title-list",
            Self::VenueListing => "venue-listing",
            Self::ItemDetail => "item-detail",
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title-list" | "watchlist" => Ok(Self::TitleList),
            "venue-listing" | "showtimes" => Ok(Self::VenueListing),
            "item-detail" | "title" => Ok(Self::ItemDetail),
            other => Err(ExtractError::Config {
                message: format!("unknown record kind '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response handed to the routing shell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success { count: usize, items: Vec<Record> },
    Failure { error: String },
}

impl Envelope {
    pub fn from_result(result: ExtractResult<Batch>) -> Self {
        match result {
            Ok(batch) => Self::Success {
                count: batch.count,
                items: batch.records,
            },
            Err(e) => Self::Failure {
                error: e.envelope_message().to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Compiled extraction pipeline, reusable across requests
#[derive(Debug, Clone)]
pub struct Pipeline {
    anchor_id: String,
    title_list: BatchPlan,
    venue_listing: BatchPlan,
    item_detail: BatchPlan,
}

impl Pipeline {
    /// Compile every chain of the config up front so a bad chain fails at startup
    pub fn new(config: &PipelineConfig) -> ExtractResult<Self> {
        Ok(Self {
            anchor_id: config.anchor_id.clone(),
            title_list: BatchPlan::compile(&config.title_list)?,
            venue_listing: BatchPlan::compile(&config.venue_listing)?,
            item_detail: BatchPlan::compile(&config.item_detail)?,
        })
    }

    pub fn plan(&self, kind: RecordKind) -> &BatchPlan {
        match kind {
            RecordKind::TitleList => &self.title_list,
            RecordKind::VenueListing => &self.venue_listing,
            RecordKind::ItemDetail => &self.item_detail,
        }
    }

    pub fn run(&self, raw: RawDocument, kind: RecordKind) -> ExtractResult<Batch> {
        let tree = parse_document(raw, &self.anchor_id)?;
        let resolver = Resolver::new();
        let batch = aggregate(&resolver, tree.root(), self.plan(kind));
        debug!(
            "{} run evaluated {} candidate(s)",
            kind,
            resolver.evaluations()
        );
        batch
    }

    /// Run on whatever the fetch collaborator produced and build the envelope
    pub fn respond(&self, fetched: ExtractResult<RawDocument>, kind: RecordKind) -> Envelope {
        let result = fetched.and_then(|raw| self.run(raw, kind));
        if let Err(e) = &result {
            error!("{} extraction failed: {}", kind, e);
        }
        Envelope::from_result(result)
    }
}
