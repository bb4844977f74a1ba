use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub so timeline views can follow one bay's reservations.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes on a bay. Creates the channel if needed.
    pub fn subscribe(&self, bay_id: Ulid) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(bay_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, bay_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&bay_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Remove a channel (e.g. when the bay is deleted).
    pub fn remove(&self, bay_id: &Ulid) {
        self.channels.remove(bay_id);
    }
}
