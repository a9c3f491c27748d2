//! Pipeline configuration
//!
//! Every selector chain is data, so a deployment can patch a chain for a new
//! upstream layout by shipping a JSON file instead of a new build.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::DEFAULT_ANCHOR_ID;
use crate::error::{ExtractError, ExtractResult};
use crate::extract::BatchSpec;
use crate::schemas;

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// `id` of the script element holding the embedded data block
    pub anchor_id: String,

    pub fetch: FetchConfig,

    pub title_list: BatchSpec,
    pub venue_listing: BatchSpec,
    pub item_detail: BatchSpec,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anchor_id: DEFAULT_ANCHOR_ID.to_string(),
            fetch: FetchConfig::default(),
            title_list: schemas::title_list(),
            venue_listing: schemas::venue_listing(),
            item_detail: schemas::item_detail(),
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON config; omitted sections keep their built-in values
    pub fn from_json_str(json: &str) -> ExtractResult<Self> {
        serde_json::from_str(json).map_err(|e| ExtractError::Config {
            message: format!("invalid pipeline config: {}", e),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> ExtractResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ExtractError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }
}

/// Settings for the HTTP fetch collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)"
                .to_string(),
            timeout_secs: 30,
        }
    }
}
