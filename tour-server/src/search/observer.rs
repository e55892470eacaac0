//! Transition listeners.

use std::cell::Cell;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::session::SearchSession;

/// Receives a snapshot after every session transition.
///
/// Called with the engine's state lock held, so implementations must be quick
/// and must not call back into the engine. Dropping a [`Subscription`] from
/// inside the callback is fine.
pub trait SessionObserver: Send + Sync + 'static {
    fn on_transition(&self, session: &SearchSession);
}

impl<F> SessionObserver for F
where
    F: Fn(&SearchSession) + Send + Sync + 'static,
{
    fn on_transition(&self, session: &SearchSession) {
        self(session)
    }
}

thread_local! {
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

/// Whether this thread is inside an observer callback.
pub(crate) fn delivering() -> bool {
    DELIVERING.with(Cell::get)
}

struct Delivery {
    outer: bool,
}

impl Delivery {
    fn enter() -> Self {
        Self {
            outer: DELIVERING.with(|d| d.replace(true)),
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        DELIVERING.with(|d| d.set(self.outer));
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, Arc<dyn SessionObserver>)>,
}

/// The set of currently subscribed observers.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    registry: Arc<Mutex<Registry>>,
}

impl Observers {
    pub(crate) fn subscribe(&self, observer: Arc<dyn SessionObserver>) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, observer));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `session` to every observer, in subscription order.
    ///
    /// The registry is not locked during callbacks; an observer unsubscribed
    /// mid-delivery still sees this session.
    pub(crate) fn notify(&self, session: &SearchSession) {
        let observers: Vec<Arc<dyn SessionObserver>> = self
            .registry
            .lock()
            .observers
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        let _delivery = Delivery::enter();
        for observer in &observers {
            observer.on_transition(session);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.registry.lock().observers.len()
    }
}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Unsubscribe now. Same as dropping.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().observers.retain(|(id, _)| *id != self.id);
        }
    }
}
