mod allocation;
mod appointments;
mod availability;
mod conflict;
mod error;
mod ledger;
mod registry;
mod slots;
mod store;

pub use allocation::{derive_preferred_type, KEYWORD_TABLE};
pub use availability::resolve_free_bays;
pub use conflict::conflicts;
pub use error::EngineError;
pub use store::{Record, Table};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::journal::Journal;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;

/// The scheduling repository for one session: bays, occupancies and appointments,
/// rebuilt from the journal at construction and written back on every mutation.
///
/// Single writer. Nothing here guards against a second process appending to the
/// same journal; the last write wins.
pub struct Engine {
    pub(super) bays: Table<Bay>,
    pub(super) occupancies: Table<Occupancy>,
    pub(super) appointments: Table<Appointment>,
    journal: Box<dyn Journal>,
    pub(super) clock: Arc<dyn Clock>,
    pub notify: Arc<NotifyHub>,
    compact_threshold: u64,
}

impl Engine {
    pub fn new(journal: Box<dyn Journal>, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        let events = journal.replay()?;
        let mut engine = Self {
            bays: Table::new(),
            occupancies: Table::new(),
            appointments: Table::new(),
            journal,
            clock,
            notify: Arc::new(NotifyHub::new()),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        };
        for event in &events {
            engine.apply(event);
        }
        debug!("replayed {} journal records", events.len());
        info!(
            "engine ready: {} bays, {} appointments, {} occupancies",
            engine.bays.len(),
            engine.appointments.len(),
            engine.occupancies.len()
        );
        Ok(engine)
    }

    /// Open the file journal under `config.data_dir` with a wall clock in `config.timezone`.
    pub fn open(config: &Config) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let wal = Wal::open(&config.journal_path())?;
        let clock = Arc::new(SystemClock::new(config.timezone));
        Ok(Self::new(Box::new(wal), clock)?.with_compact_threshold(config.compact_threshold))
    }

    /// Appends between compactions; 0 disables compaction.
    pub fn with_compact_threshold(mut self, threshold: u64) -> Self {
        self.compact_threshold = threshold;
        self
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn apply(&mut self, event: &Event) {
        match event {
            Event::BayUpserted(bay) => self.bays.upsert(bay.clone()),
            Event::BayDeleted { id } => {
                self.bays.delete(id);
            }
            Event::OccupancyUpserted(occ) => self.occupancies.upsert(occ.clone()),
            Event::OccupancyDeleted { id, .. } => {
                self.occupancies.delete(id);
            }
            Event::AppointmentUpserted(appt) => self.appointments.upsert(appt.clone()),
            Event::AppointmentDeleted { id } => {
                self.appointments.delete(id);
            }
        }
    }

    /// Journal-append + apply + notify in one call.
    pub(super) fn persist_and_apply(&mut self, event: Event) -> Result<(), EngineError> {
        self.journal.append(&event)?;
        metrics::counter!(crate::observability::JOURNAL_APPENDS_TOTAL).increment(1);
        self.apply(&event);
        if let Some(bay_id) = event.bay_id() {
            self.notify.send(bay_id, &event);
        }
        self.maybe_compact();
        Ok(())
    }

    fn maybe_compact(&mut self) {
        if self.compact_threshold == 0
            || self.journal.appends_since_compact() < self.compact_threshold
        {
            return;
        }
        if let Err(e) = self.compact() {
            warn!("journal compaction failed: {e}");
        }
    }

    /// Rewrite the journal with one upsert per live record.
    pub fn compact(&mut self) -> Result<(), EngineError> {
        let events = self.snapshot_events();
        self.journal.compact(&events)?;
        metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL).increment(1);
        info!("journal compacted to {} records", events.len());
        Ok(())
    }

    fn snapshot_events(&self) -> Vec<Event> {
        let mut events =
            Vec::with_capacity(self.bays.len() + self.appointments.len() + self.occupancies.len());
        events.extend(self.bays.iter().cloned().map(Event::BayUpserted));
        events.extend(self.appointments.iter().cloned().map(Event::AppointmentUpserted));
        events.extend(self.occupancies.iter().cloned().map(Event::OccupancyUpserted));
        events
    }
}
