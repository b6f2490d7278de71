//! Observable state holders: a subscription list plus notify-on-write.
//!
//! Shell state (layout, theme, tag strip) lives in [`Store`] handles owned by
//! the composition root. Renderers and side effects (persistence, logging)
//! subscribe and are called synchronously after every committed change.
//!
//! Subscribers run outside the internal lock, so a callback may read the
//! store it observes, subscribe, or unsubscribe (itself included). A callback
//! that writes back into the same store commits immediately; every subscriber
//! is then notified again with the latest value once the current round ends.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle returned by `subscribe`, used to detach a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of callbacks notified with a borrowed event.
pub struct Observers<E> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<E> Observers<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Callbacks fire in subscription order.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Detach a callback. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Number of attached callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call every subscriber with `event`.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }
}

/// Bookkeeping for a notification in progress.
#[derive(Default)]
struct Round {
    /// Subscribers taken out of the store for this round.
    notified: Vec<SubscriptionId>,
    /// Of those, the ones detached mid-round.
    removed: Vec<SubscriptionId>,
    /// The value changed again from inside a callback.
    dirty: bool,
}

struct StoreInner<T> {
    value: T,
    version: u64,
    observers: Observers<T>,
    round: Option<Round>,
}

/// Shared observable value. Cloning the handle shares the same state.
pub struct Store<T> {
    inner: Arc<Mutex<StoreInner<T>>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Store")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish_non_exhaustive()
    }
}

impl<T> Store<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                value: initial,
                version: 0,
                observers: Observers::new(),
                round: None,
            })),
        }
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Read the current value in place.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.inner.lock().value)
    }

    /// Number of committed changes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Replace the value. Subscribers fire only when it actually changed.
    pub fn set(&self, value: T) -> bool {
        self.update(move |slot| *slot = value)
    }

    /// Mutate in place. Subscribers fire only when the value changed.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> bool {
        let (mut snapshot, mut entries) = {
            let mut inner = self.inner.lock();
            let before = inner.value.clone();
            mutate(&mut inner.value);
            if inner.value == before {
                return false;
            }
            inner.version += 1;
            if let Some(round) = inner.round.as_mut() {
                round.dirty = true;
                return true;
            }
            let entries = std::mem::take(&mut inner.observers.entries);
            inner.round = Some(Round {
                notified: entries.iter().map(|(id, _)| *id).collect(),
                ..Round::default()
            });
            (inner.value.clone(), entries)
        };

        loop {
            self.notify_round(&snapshot, &mut entries);

            let mut inner = self.inner.lock();
            let round = inner.round.take().unwrap_or_default();
            entries.retain(|(id, _)| !round.removed.contains(id));
            // Subscriptions added mid-round were recorded on the inner list.
            let added = std::mem::take(&mut inner.observers.entries);
            entries.extend(added);
            if !round.dirty {
                inner.observers.entries = entries;
                return true;
            }
            inner.round = Some(Round {
                notified: entries.iter().map(|(id, _)| *id).collect(),
                ..Round::default()
            });
            snapshot = inner.value.clone();
        }
    }

    fn notify_round(&self, snapshot: &T, entries: &mut [(SubscriptionId, Callback<T>)]) {
        for (id, callback) in entries.iter_mut() {
            let detached = self
                .inner
                .lock()
                .round
                .as_ref()
                .is_some_and(|round| round.removed.contains(id));
            if !detached {
                callback(snapshot);
            }
        }
    }

    /// Register a change callback. It is not called for the current value.
    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        self.inner.lock().observers.subscribe(callback)
    }

    /// Detach a callback, also from inside a notification.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        if inner.observers.unsubscribe(id) {
            return true;
        }
        match inner.round.as_mut() {
            Some(round) if round.notified.contains(&id) && !round.removed.contains(&id) => {
                round.removed.push(id);
                true
            }
            _ => false,
        }
    }
}
