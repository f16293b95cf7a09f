// crates/sync-engine/src/hub.rs
//! Per-owner fan-out of push messages

use carlot_core::PushMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<PushMessage>,
}

/// Receiving end of a hub subscription
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub owner: String,
    receiver: mpsc::UnboundedReceiver<PushMessage>,
}

impl Subscription {
    /// Waits for the next message; `None` once the hub drops the subscriber
    pub async fn recv(&mut self) -> Option<PushMessage> {
        self.receiver.recv().await
    }

    /// Returns a message if one is already waiting
    pub fn try_recv(&mut self) -> Option<PushMessage> {
        self.receiver.try_recv().ok()
    }

    pub fn into_receiver(self) -> mpsc::UnboundedReceiver<PushMessage> {
        self.receiver
    }
}

/// Routes push messages to every subscriber of the same owner
///
/// Subscribers whose receiving end was dropped are pruned on the next
/// broadcast to their owner.
#[derive(Default)]
pub struct PushHub {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber for `owner`
    pub fn subscribe(&self, owner: impl Into<String>) -> Subscription {
        let owner = owner.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        self.lock()
            .entry(owner.clone())
            .or_default()
            .push(Subscriber { id, sender });
        log::debug!("Push subscriber {} registered for {}", id, owner);

        Subscription {
            id,
            owner,
            receiver,
        }
    }

    /// Removes a subscriber, returning true if it was registered
    pub fn unsubscribe(&self, owner: &str, id: u64) -> bool {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(owner) else {
            return false;
        };

        let before = list.len();
        list.retain(|subscriber| subscriber.id != id);
        let removed = list.len() < before;
        if list.is_empty() {
            subscribers.remove(owner);
        }
        removed
    }

    /// Sends a message to every live subscriber of `owner`
    ///
    /// Returns the number of subscribers that received it.
    pub fn broadcast(&self, owner: &str, message: &PushMessage) -> usize {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(owner) else {
            return 0;
        };

        list.retain(|subscriber| subscriber.sender.send(message.clone()).is_ok());
        let delivered = list.len();
        if list.is_empty() {
            subscribers.remove(owner);
        }

        log::trace!("Broadcast {} to {} subscriber(s) of {}", message.kind(), delivered, owner);
        delivered
    }

    /// Number of registered subscribers for `owner`
    pub fn subscriber_count(&self, owner: &str) -> usize {
        self.lock().get(owner).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
