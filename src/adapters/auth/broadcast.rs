//! Fan-out of session events to every registered subscriber channel.

use crate::domain::SessionEvent;
use crate::ports::Subscription;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<SessionEvent>>,
}

/// Shared by the provider adapters. Closed receivers are pruned on publish.
#[derive(Default, Clone)]
pub struct SessionBroadcaster {
    inner: Arc<Mutex<Subscribers>>,
}

impl SessionBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(inner: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self, tx: mpsc::UnboundedSender<SessionEvent>) -> Subscription {
        let id = {
            let mut subs = Self::lock(&self.inner);
            let id = subs.next_id;
            subs.next_id += 1;
            subs.senders.insert(id, tx);
            id
        };
        debug!(subscription = id, "session subscriber added");
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                Self::lock(&inner).senders.remove(&id);
                debug!(subscription = id, "session subscriber removed");
            }
        })
    }

    pub fn publish(&self, event: SessionEvent) {
        let mut subs = Self::lock(&self.inner);
        subs.senders.retain(|_, tx| tx.send(event.clone()).is_ok());
        debug!(kind = ?event.kind, subscribers = subs.senders.len(), "session event published");
    }

    pub fn subscriber_count(&self) -> usize {
        Self::lock(&self.inner).senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_and_drop_detach() {
        let b = SessionBroadcaster::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let s1 = b.subscribe(tx1);
        let s2 = b.subscribe(tx2);
        assert_eq!(b.subscriber_count(), 2);

        b.publish(SessionEvent::signed_out());
        assert_eq!(rx1.try_recv().unwrap(), SessionEvent::signed_out());

        s1.unsubscribe();
        drop(s2);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[test]
    fn closed_receivers_are_pruned() {
        let b = SessionBroadcaster::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let _sub = b.subscribe(tx);
        drop(rx);
        b.publish(SessionEvent::signed_out());
        assert_eq!(b.subscriber_count(), 0);
    }
}
