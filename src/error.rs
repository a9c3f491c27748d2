//! Error types for the extraction pipeline
//!
//! Only document- and container-level failures cross the pipeline boundary.
//! Field and item failures are absorbed by the extractor and assembler.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Upstream fetch failed: {reason}")]
    TransportFailure { reason: String },

    #[error("Embedding anchor '{anchor}' not found in document")]
    AnchorNotFound { anchor: String },

    #[error("Document parsing failed: {message}")]
    Parse { message: String },

    #[error("Item container '{container}' not found after {tried} candidates")]
    DocumentStructure { container: String, tried: usize },

    #[error("Required field '{field}' missing{}", item_suffix(.item_index))]
    MissingRequiredField {
        field: String,
        item_index: Option<usize>,
    },

    #[error("Invalid selector spec '{field}': {reason}")]
    InvalidSpec { field: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn item_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" on item {}", i),
        None => String::new(),
    }
}

impl ExtractError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::TransportFailure {
            reason: reason.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_spec(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing_field(field: &str, item_index: Option<usize>) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
            item_index,
        }
    }

    /// Whether this error aborts the whole request
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::TransportFailure { .. } => true,
            Self::AnchorNotFound { .. } => true,
            Self::Parse { .. } => true,
            Self::DocumentStructure { .. } => true,
            Self::MissingRequiredField { .. } => false,
            Self::InvalidSpec { .. } => true,
            Self::Config { .. } => true,
        }
    }

    /// Message placed in the failure envelope
    pub fn envelope_message(&self) -> &'static str {
        match self {
            Self::DocumentStructure { .. }
            | Self::MissingRequiredField { .. }
            | Self::InvalidSpec { .. }
            | Self::Config { .. } => "Unexpected document structure",
            Self::TransportFailure { .. } | Self::AnchorNotFound { .. } | Self::Parse { .. } => {
                "Failed to retrieve document"
            }
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
