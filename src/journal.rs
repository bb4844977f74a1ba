use std::io;

use crate::model::Event;

/// Storage behind the engine. Every mutation is appended before it is applied;
/// `replay` rebuilds state at startup.
///
/// There is no multi-record transaction: a sequence of appends interrupted halfway
/// leaves the earlier records in place.
pub trait Journal: Send {
    fn append(&mut self, event: &Event) -> io::Result<()>;

    fn replay(&self) -> io::Result<Vec<Event>>;

    /// Replace the whole journal with `events`.
    fn compact(&mut self, events: &[Event]) -> io::Result<()>;

    fn appends_since_compact(&self) -> u64;
}

/// Journal held in memory. Used by tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    events: Vec<Event>,
    appends_since_compact: u64,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Journal for MemoryJournal {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        self.events.push(event.clone());
        self.appends_since_compact += 1;
        Ok(())
    }

    fn replay(&self) -> io::Result<Vec<Event>> {
        Ok(self.events.clone())
    }

    fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        self.events = events.to_vec();
        self.appends_since_compact = 0;
        Ok(())
    }

    fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }
}
