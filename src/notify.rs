use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for slot change notifications, per slot plus a firehose.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
    all: broadcast::Sender<Event>,
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
            all: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// Subscribe to one slot. Creates the channel if needed.
    pub fn subscribe(&self, slot: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(slot.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.all.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, event: &Event) {
        let _ = self.all.send(event.clone());
        if let Some(sender) = self.channels.get(event.slot().as_str()) {
            let _ = sender.send(event.clone());
        }
    }
}
