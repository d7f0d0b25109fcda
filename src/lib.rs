//! Paginated organization harvester.
//!
//! Pages are pulled one at a time from a [`PageSource`], every record gets a
//! region and an optional contact, and the results are folded into a
//! [`RecordStore`]. The [`Harvester`] owns the page cursor and the batch
//! ceiling; [`export`] turns the store into a sorted CSV.

mod error;
mod macros;
mod parse;
mod request;

pub mod aggregate;
pub mod config;
pub mod enrich;
pub mod export;
pub mod logging;
pub mod process;
pub mod record;
pub mod region;
pub mod snapshot;
pub mod source;

pub use aggregate::{merge, RecordStore, RegionTally};
pub use config::HarvestConfig;
pub use enrich::{ContactLookup, DomainContact, NoContact};
pub use error::{Error, Result};
pub use export::{export, export_to_dir};
pub use process::{Halt, Harvester, IngestionState, Progress, Status};
pub use record::{RawRecord, Record};
pub use request::HttpPageSource;
pub use snapshot::{
    Checkpoint, FileStore, MemoryStore, PersistenceBridge, Restored, SnapshotStore,
};
pub use source::{Page, PageSource, SyntheticSource};

/// First page the cursor points at.
pub const START_PAGE: usize = 1;
/// Records processed per batch before the harvester pauses.
pub const BATCH_LIMIT: usize = 1000;
/// Delay between two page fetches, in milliseconds.
pub const PACING_INTERVAL_MS: u64 = 1000;
/// Region assigned when an address can't be resolved.
pub const UNKNOWN_REGION: &str = "Unknown";
/// Snapshot key under which the record store is persisted.
pub const RECORDS_KEY: &str = "harvest.records";
/// Snapshot key under which the page cursor is persisted.
pub const CHECKPOINT_KEY: &str = "harvest.checkpoint";
