//! A behaviour subject: holds the latest value and pushes every new value
//! to its subscribers synchronously.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::error;

use crate::errors::panic_message;

/// A subscriber callback.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerSlot<T> {
    callback: Listener<T>,
    /// One past the sequence of the newest value handed to `callback`.
    delivered: AtomicU64,
}

impl<T> ListenerSlot<T> {
    /// Calls the listener unless it was already handed `sequence` or a newer
    /// value, which happens when a listener publishes while being notified.
    fn deliver(&self, sequence: u64, value: &T) {
        let mark = sequence + 1;
        if self.delivered.fetch_max(mark, Ordering::AcqRel) >= mark {
            return;
        }
        let callback = &self.callback;
        if let Err(payload) =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(value)))
        {
            error!(panic = %panic_message(payload.as_ref()), "Subscriber panicked");
        }
    }
}

struct ListenerSet<T> {
    next_id: u64,
    entries: Vec<(u64, Arc<ListenerSlot<T>>)>,
}

struct SubjectInner<T> {
    /// Latest value with its sequence number.
    current: RwLock<(u64, T)>,
    listeners: Mutex<ListenerSet<T>>,
}

/// Holds the latest value of a stream and notifies subscribers on change.
///
/// Subscribers run on the caller's thread, after every lock is released, so
/// a subscriber may call back into the subject. A subscriber never receives
/// a value older than one it has already received: if a subscriber publishes
/// while being notified, the remaining subscribers get only the newer value.
/// A panicking subscriber is logged and does not stop delivery to the others.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Creates a subject holding `initial` at sequence 0.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                current: RwLock::new((0, initial)),
                listeners: Mutex::new(ListenerSet {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    /// Returns a copy of the latest value.
    #[must_use]
    pub fn value(&self) -> T {
        self.inner.current.read().1.clone()
    }

    /// Returns the latest value together with its sequence number.
    #[must_use]
    pub fn snapshot(&self) -> (u64, T) {
        self.inner.current.read().clone()
    }

    /// Number of values pushed since creation.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.inner.current.read().0
    }

    /// Replaces the value and notifies subscribers.
    pub fn next(&self, value: T) {
        self.update(|_| value);
    }

    /// Derives the next value from the current one and notifies subscribers.
    ///
    /// The read-modify-write happens under one lock, so concurrent updates
    /// are never lost.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.try_update(|current| Some(f(current)));
    }

    /// Like `update`, but `f` may return `None` to leave the value untouched.
    /// Subscribers are only notified when a new value was stored. Returns
    /// true in that case.
    pub fn try_update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let (sequence, published) = {
            let mut current = self.inner.current.write();
            let Some(next) = f(&current.1) else {
                return false;
            };
            *current = (current.0 + 1, next);
            current.clone()
        };
        self.notify(sequence, &published);
        true
    }

    /// Registers a listener. It is called immediately with the current
    /// value, then with every subsequent value until the returned
    /// `Subscription` is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let slot = Arc::new(ListenerSlot {
            callback: Arc::new(listener) as Listener<T>,
            delivered: AtomicU64::new(0),
        });
        let id = {
            let mut listeners = self.inner.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::clone(&slot)));
            id
        };

        let (sequence, current) = self.snapshot();
        slot.deliver(sequence, &current);

        let weak: Weak<SubjectInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Number of active listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().entries.len()
    }

    fn notify(&self, sequence: u64, value: &T) {
        let listeners: Vec<Arc<ListenerSlot<T>>> = self
            .inner
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();

        for slot in &listeners {
            if self.sequence() > sequence {
                // A newer value was published and delivered meanwhile.
                break;
            }
            slot.deliver(sequence, value);
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("sequence", &self.inner.current.read().0)
            .field("listeners", &self.inner.listeners.lock().entries.len())
            .finish()
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stops receiving values.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keeps the listener registered for the lifetime of the source.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    /// Returns true while the listener is registered through this handle.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
