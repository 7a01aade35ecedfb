//! Price Sync - price record archive ingestion and export
//!
//! Accepts zip or tar archives holding a CSV of price records, loads the
//! valid and previously unseen records into SQLite, and exports filtered
//! slices of the store back out as a zipped CSV.

pub mod archive;
pub mod database;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod tabular;
pub mod web;

pub use archive::ArchiveKind;
pub use database::{
    init_schema, insert_batch, open_in_memory_store, open_store, select_by_filter, store_totals,
};
pub use error::{Error, Result};
pub use models::{FilterCriteria, IngestOutcome, InsertStats, PriceRecord, StoreTotals};
pub use pipeline::{export, ingest};
