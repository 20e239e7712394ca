//! Change notifications for record stores.
//!
//! Every effective write to a store advances its generation and emits a
//! [`ChangeEvent`]. Paged readers compare generations to detect that they
//! are stale; consumers that want push notifications subscribe to the feed.

use crate::record::Key;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// Kind of change applied to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// New records were inserted.
    Inserted {
        /// Number of records that were new.
        count: usize,
        /// Lowest inserted key.
        min: Key,
        /// Highest inserted key.
        max: Key,
    },
    /// All records were removed.
    Cleared,
}

/// A single change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Store generation after the change.
    pub generation: u64,
    /// What changed.
    pub kind: ChangeKind,
}

/// Generation counter plus subscriber fan-out.
///
/// Stores call [`advance`](Self::advance) while still holding their write
/// lock so that a reader which observed the old generation cannot also have
/// observed the new data. Events are sent after the lock is released via
/// [`publish`](Self::publish).
#[derive(Debug, Default)]
pub struct ChangeFeed {
    generation: AtomicU64,
    subscribers: RwLock<Vec<Sender<ChangeEvent>>>,
}

impl ChangeFeed {
    /// Creates a feed at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Advances the generation and returns the event to publish.
    pub fn advance(&self, kind: ChangeKind) -> ChangeEvent {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        ChangeEvent { generation, kind }
    }

    /// Subscribes to future events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Sends an event to all live subscribers, dropping disconnected ones.
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn advance_bumps_generation() {
        let feed = ChangeFeed::new();
        assert_eq!(feed.generation(), 0);

        let event = feed.advance(ChangeKind::Cleared);
        assert_eq!(event.generation, 1);
        assert_eq!(feed.generation(), 1);
    }

    #[test]
    fn publish_reaches_all_subscribers() {
        let feed = ChangeFeed::new();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();

        let event = feed.advance(ChangeKind::Inserted {
            count: 3,
            min: 0,
            max: 2,
        });
        feed.publish(event);

        assert_eq!(rx1.recv().unwrap(), event);
        assert_eq!(rx2.recv().unwrap(), event);
    }

    #[test]
    fn disconnected_subscribers_are_dropped() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        let event = feed.advance(ChangeKind::Cleared);
        feed.publish(event);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn threaded_publish() {
        let feed = Arc::new(ChangeFeed::new());
        let rx = feed.subscribe();

        let feed_clone = Arc::clone(&feed);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let event = feed_clone.advance(ChangeKind::Cleared);
            feed_clone.publish(event);
        });

        let received = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(received.kind, ChangeKind::Cleared);

        handle.join().unwrap();
    }
}
