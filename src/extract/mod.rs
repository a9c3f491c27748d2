//! Extraction stages
//!
//! Batch aggregation drives record assembly, which drives field extraction.

pub mod batch;
pub mod field;
pub mod record;

pub use batch::{aggregate, status_of, Batch, BatchPlan, BatchSpec, BatchStatus};
pub use field::{extract_field, Coercion, ExtractedField, FieldDefault, FieldPlan};
pub use record::{assemble, Record, RecordPlan, RecordSchema};
