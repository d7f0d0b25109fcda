//! The ingestion controller.
//!
//! [`Harvester::start`] drives one page per iteration: check the boundary,
//! fetch, enrich, merge, snapshot, wait out the pacing interval, repeat. Every
//! stop condition is checked at the iteration boundary, so [`Harvester::pause`]
//! and [`Harvester::reset`] called from another task take effect once the page
//! in flight has been handled.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use serde::Serialize;

use crate::aggregate::{RecordStore, RegionTally};
use crate::config::HarvestConfig;
use crate::enrich::{contact_or_absent, ContactLookup};
use crate::record::{RawRecord, Record};
use crate::snapshot::{Checkpoint, PersistenceBridge, Restored, SnapshotStore};
use crate::source::{Page, PageSource};
use crate::{info_time, Error, Result, START_PAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Idle,
    Running,
    Paused,
    Complete,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Paused => "paused",
            Status::Complete => "complete",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Where the harvester stands.
///
/// `processed_count` never exceeds the batch limit, and `Complete` always comes
/// with `has_more == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionState {
    /// Next page to fetch.
    pub cursor: usize,
    pub processed_count: usize,
    pub status: Status,
    pub has_more: bool,
}

impl IngestionState {
    /// State of a new process picking up from a saved checkpoint. The batch
    /// counter starts over.
    fn resumed(checkpoint: Checkpoint) -> Self {
        let status = if checkpoint.has_more {
            Status::Idle
        } else {
            Status::Complete
        };
        Self {
            cursor: checkpoint.cursor.max(START_PAGE),
            processed_count: 0,
            status,
            has_more: checkpoint.has_more,
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cursor: self.cursor,
            has_more: self.has_more,
        }
    }
}

impl Default for IngestionState {
    fn default() -> Self {
        Self {
            cursor: START_PAGE,
            processed_count: 0,
            status: Status::Idle,
            has_more: true,
        }
    }
}

/// Why a run of the fetch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The batch quota was reached. More pages may remain.
    BatchFull,
    /// The source has no more pages.
    Exhausted,
    /// Paused by a caller.
    Paused,
    /// A page fetch failed. `start` resumes from the failed page.
    Failed,
    /// The harvester was reset while the loop was running.
    Reset,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Halt::BatchFull => "batch limit reached, more pages may remain",
            Halt::Exhausted => "source exhausted",
            Halt::Paused => "paused",
            Halt::Failed => "page fetch failed",
            Halt::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of the harvester.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub state: IngestionState,
    pub records: usize,
    pub tally: RegionTally,
}

struct Shared {
    state: IngestionState,
    store: RecordStore,
    /// Bumped on every reset. Work started under an older generation is dropped.
    generation: u64,
    /// A fetch loop is alive, possibly paused or reset with a page still in
    /// flight.
    looping: bool,
}

struct Inner {
    config: HarvestConfig,
    source: Arc<dyn PageSource>,
    lookup: Arc<dyn ContactLookup>,
    bridge: PersistenceBridge,
    shared: Mutex<Shared>,
    // Orders snapshot writes against reset.
    persist: tokio::sync::Mutex<()>,
}

/// Handle to the ingestion controller. Clones share the same state.
#[derive(Clone)]
pub struct Harvester {
    inner: Arc<Inner>,
}

impl Harvester {
    /// Builds a harvester and seeds its record store and cursor from the last
    /// snapshot.
    pub async fn new(
        config: HarvestConfig,
        source: Arc<dyn PageSource>,
        lookup: Arc<dyn ContactLookup>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let bridge = PersistenceBridge::new(snapshots);
        let Restored { store, checkpoint } = bridge.restore().await;
        let state = checkpoint.map(IngestionState::resumed).unwrap_or_default();

        Self {
            inner: Arc::new(Inner {
                config,
                source,
                lookup,
                bridge,
                shared: Mutex::new(Shared {
                    state,
                    store,
                    generation: 0,
                    looping: false,
                }),
                persist: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.inner.config
    }

    pub fn state(&self) -> IngestionState {
        self.lock().state.clone()
    }

    pub fn progress(&self) -> Progress {
        let shared = self.lock();
        Progress {
            state: shared.state.clone(),
            records: shared.store.len(),
            tally: shared.store.tally().clone(),
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().store.records().to_vec()
    }

    /// Exports the current record store. See [`crate::export::export`].
    pub fn export(&self) -> Result<Vec<u8>> {
        crate::export::export(self.lock().store.records())
    }

    /// Runs the fetch loop until it halts and returns the reason.
    ///
    /// Allowed from `Idle`, `Paused` and `Failed`. Resuming after a full batch
    /// opens a new batch. Refused while another loop is running and once the
    /// source has been exhausted.
    pub async fn start(&self) -> Result<Halt> {
        let (generation, cursor) = {
            let mut shared = self.lock();
            let looping = shared.looping;
            let state = &mut shared.state;

            if state.status == Status::Running || looping {
                tracing::warn!("start ignored, the harvester is already running");
                return Err(Error::AlreadyRunning);
            }
            if !state.has_more && state.cursor > START_PAGE {
                tracing::info!(cursor = state.cursor, "start ignored, the source is exhausted");
                return Err(Error::NotRestartable {
                    cursor: state.cursor,
                });
            }
            if state.status == Status::Complete {
                tracing::info!("start ignored, the harvester is complete");
                return Err(Error::InvalidStatus(state.status));
            }

            if state.processed_count >= self.inner.config.batch_limit {
                tracing::info!(cursor = state.cursor, "starting a new batch");
                state.processed_count = 0;
            }
            state.status = Status::Running;
            shared.looping = true;
            (shared.generation, shared.state.cursor)
        };

        let start_time = Local::now();
        info_time!("Started harvesting at page {}", cursor);
        let halt = {
            let _slot = LoopSlot {
                harvester: self,
                generation,
            };
            self.run(generation).await
        };
        info_time!(start_time, "Stopped harvesting: {}", halt);

        Ok(halt)
    }

    /// Pauses a running harvester. The page in flight is still merged.
    /// Returns whether the harvester was running.
    pub fn pause(&self) -> bool {
        let mut shared = self.lock();
        if shared.state.status != Status::Running {
            tracing::debug!(status = %shared.state.status, "pause ignored, not running");
            return false;
        }
        shared.state.status = Status::Paused;
        tracing::info!(cursor = shared.state.cursor, "pausing after the current page");
        true
    }

    /// Drops every record, the tally and the snapshot, and rewinds to page 1.
    /// A loop still waiting on a page keeps its slot until that page comes
    /// back and is discarded, so `start` is refused until then.
    pub async fn reset(&self) {
        let _persist = self.inner.persist.lock().await;
        {
            let mut shared = self.lock();
            shared.state = IngestionState::default();
            shared.store.clear();
            shared.generation += 1;
        }
        self.inner.bridge.clear().await;
        tracing::info!("harvester reset");
    }

    async fn run(&self, generation: u64) -> Halt {
        loop {
            let page_no = match self.boundary(generation) {
                Ok(page_no) => page_no,
                Err(halt) => return halt,
            };

            let fetched = self.inner.source.fetch_page(page_no).await;
            let halt = match fetched {
                Ok(page) => self.commit(generation, page_no, page).await,
                Err(e) => Some(self.fail(generation, page_no, e)),
            };
            if let Some(halt) = halt {
                return halt;
            }

            tokio::time::sleep(self.inner.config.pacing_interval).await;
        }
    }

    /// Checks the stop conditions and returns the page to fetch next.
    fn boundary(&self, generation: u64) -> std::result::Result<usize, Halt> {
        let mut shared = self.lock();
        if shared.generation != generation {
            return Err(Halt::Reset);
        }
        match check_halt(&mut shared.state, self.inner.config.batch_limit) {
            Some(halt) => Err(halt),
            None => Ok(shared.state.cursor),
        }
    }

    async fn commit(&self, generation: u64, page_no: usize, page: Page) -> Option<Halt> {
        if page.is_empty() {
            {
                let mut shared = self.lock();
                if shared.generation != generation {
                    return Some(Halt::Reset);
                }
                shared.state.has_more = false;
                shared.state.status = Status::Complete;
                tracing::info!(page = page_no, "empty page, source exhausted");
            }
            self.persist(generation).await;
            return Some(Halt::Exhausted);
        }

        let continuation = page.continuation;
        let records = self.enrich(page.records).await;

        let halt = {
            let mut shared = self.lock();
            if shared.generation != generation {
                tracing::debug!(page = page_no, "dropping page fetched before a reset");
                return Some(Halt::Reset);
            }

            let merged = records.len();
            shared.store.merge(records);

            let limit = self.inner.config.batch_limit;
            let state = &mut shared.state;
            state.cursor += 1;
            state.processed_count = (state.processed_count + merged).min(limit);
            state.has_more = continuation;
            tracing::info!(
                page = page_no,
                records = merged,
                processed = state.processed_count,
                has_more = state.has_more,
                "merged page"
            );

            check_halt(state, limit)
        };

        self.persist(generation).await;
        halt
    }

    fn fail(&self, generation: u64, page_no: usize, e: Error) -> Halt {
        let mut shared = self.lock();
        if shared.generation != generation {
            return Halt::Reset;
        }
        shared.state.status = Status::Failed;
        tracing::error!(page = page_no, error = %e, "page fetch failed, harvester stopped");
        Halt::Failed
    }

    /// Turns raw records into final ones, one lookup at a time.
    async fn enrich(&self, raw_records: Vec<RawRecord>) -> Vec<Record> {
        let mut records = Vec::with_capacity(raw_records.len());
        for raw in raw_records {
            if raw.name.trim().is_empty() {
                tracing::debug!(address = %raw.address, "skipping record without a name");
                continue;
            }
            let contact = contact_or_absent(self.inner.lookup.as_ref(), &raw).await;
            records.extend(Record::from_raw(raw, contact));
        }
        records
    }

    async fn persist(&self, generation: u64) {
        let _persist = self.inner.persist.lock().await;
        let (records, checkpoint) = {
            let shared = self.lock();
            if shared.generation != generation {
                return;
            }
            (shared.store.records().to_vec(), shared.state.checkpoint())
        };
        self.inner.bridge.snapshot(&records, checkpoint).await;
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Frees the loop slot when `start` returns or its future is dropped mid-page.
/// A reset in between leaves the status to the reset.
struct LoopSlot<'a> {
    harvester: &'a Harvester,
    generation: u64,
}

impl Drop for LoopSlot<'_> {
    fn drop(&mut self) {
        let mut shared = self.harvester.lock();
        shared.looping = false;
        if shared.generation == self.generation && shared.state.status == Status::Running {
            shared.state.status = Status::Paused;
        }
    }
}

/// The stop conditions checked between pages.
///
/// A full batch pauses even when the source has nothing more, so callers can
/// tell "quota reached" apart from "source exhausted".
fn check_halt(state: &mut IngestionState, batch_limit: usize) -> Option<Halt> {
    match state.status {
        Status::Running => {}
        Status::Failed => return Some(Halt::Failed),
        Status::Complete => return Some(Halt::Exhausted),
        Status::Idle | Status::Paused => return Some(Halt::Paused),
    }
    if state.processed_count >= batch_limit {
        state.status = Status::Paused;
        return Some(Halt::BatchFull);
    }
    if !state.has_more {
        state.status = Status::Complete;
        return Some(Halt::Exhausted);
    }
    None
}
