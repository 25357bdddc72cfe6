//! Hub import subsystem
//!
//! Pulls rows from an external dataset split and bulk-upserts them as records.
//! Row `id` values become record external ids, so re-importing the same split
//! updates records instead of duplicating them.

mod dataset;
mod errors;
mod source;

pub use dataset::{row_to_record, HubDataset, ImportSummary, BATCH_SIZE};
pub use errors::{HubError, HubResult};
pub use source::{HubSource, JsonlHubSource, Row};
