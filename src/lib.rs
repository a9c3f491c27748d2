//! Schema-drift tolerant extraction of film listings
//!
//! Turns fetched pages into records through declarative selector chains:
//! - Title lists (watchlists, charts)
//! - Cinema showtime listings with nested showings
//! - Single title detail pages
//!
//! Each page may be read as a markup tree or through the embedded data block,
//! and every field falls back from the newest known layout to older ones.

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ffi;
pub mod normalize;
pub mod pipeline;
pub mod schemas;
pub mod selector;

pub use config::{FetchConfig, PipelineConfig};
pub use document::{parse_document, Node, ParsedTree, RawDocument, ShapeHint, TextMode};
pub use error::{ExtractError, ExtractResult};
pub use extract::{Batch, BatchSpec, BatchStatus, Coercion, FieldDefault, Record, RecordSchema};
pub use fetch::fetch_document;
pub use ffi::*;
pub use normalize::Normalizer;
pub use pipeline::{Envelope, Pipeline, RecordKind};
pub use selector::{Candidate, Resolver, SelectorSpec, Strategy};
