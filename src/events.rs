use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Told when the request layer gives up on a session.
pub trait AuthExpiredNotifier: Send + Sync {
    fn auth_expired(&self);
}

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// In-memory publish/subscribe channel for "the session is gone".
#[derive(Default)]
pub struct AuthEvents {
    listeners: Mutex<Listeners>,
}

impl AuthEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Arc::new(callback));
        Subscription {
            events: Arc::downgrade(self),
            id,
        }
    }

    pub fn publish(&self) {
        // Listeners run outside the lock so they may subscribe or unsubscribe.
        let listeners: Vec<Listener> = self.listeners.lock().entries.values().cloned().collect();
        debug!("auth expired, notifying {} listener(s)", listeners.len());
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    fn remove(&self, id: u64) {
        self.listeners.lock().entries.remove(&id);
    }
}

impl AuthExpiredNotifier for AuthEvents {
    fn auth_expired(&self) {
        self.publish();
    }
}

/// Keeps a listener registered; dropping it unsubscribes.
pub struct Subscription {
    events: Weak<AuthEvents>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(events) = self.events.upgrade() {
            events.remove(self.id);
        }
    }
}
