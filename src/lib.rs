//! annota - record validation and dataset import for annotation datasets
//!
//! - `records`: accept/reject decisions for record create, update and upsert requests
//! - `hub`: batched import of external dataset rows through the bulk upsert path
//! - `cli`: command-line front end over both

pub mod cli;
pub mod hub;
pub mod logging;
pub mod records;
