// ============================================================================
// spark-store - Thread-Safe Listener Registry
// ============================================================================
//
// Same snapshot-then-walk discipline as the single-threaded registry, with
// the Vec behind a Mutex and activity flags as atomics. The lock is never
// held while a callback runs.
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::types::ListenerId;
use crate::reactivity::notify::{PassReport, invoke_isolated};

pub(crate) struct SyncEntry<F: ?Sized> {
    id: ListenerId,
    active: Arc<AtomicBool>,
    callback: Arc<F>,
}

impl<F: ?Sized> Clone for SyncEntry<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Arc::clone(&self.active),
            callback: Arc::clone(&self.callback),
        }
    }
}

struct Registry<F: ?Sized> {
    next_id: ListenerId,
    entries: Vec<SyncEntry<F>>,
}

pub(crate) struct SyncListenerSet<F: ?Sized> {
    registry: Mutex<Registry<F>>,
}

impl<F: ?Sized> SyncListenerSet<F> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: ListenerId::FIRST,
                entries: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<F>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, callback: Arc<F>) -> (ListenerId, Arc<AtomicBool>) {
        let active = Arc::new(AtomicBool::new(true));
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id = id.next();
        registry.entries.push(SyncEntry {
            id,
            active: Arc::clone(&active),
            callback,
        });
        (id, active)
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let removed = {
            let mut registry = self.lock();
            registry
                .entries
                .iter()
                .position(|e| e.id == id)
                .map(|pos| registry.entries.remove(pos))
        };
        match removed {
            Some(entry) => {
                entry.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<SyncEntry<F>> {
        self.lock().entries.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

impl<F: ?Sized> fmt::Debug for SyncListenerSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

pub(crate) fn run_sync_pass<F: ?Sized>(
    entries: Vec<SyncEntry<F>>,
    mut invoke: impl FnMut(&F),
) -> PassReport {
    let mut report = PassReport::default();
    for entry in &entries {
        if !entry.active.load(Ordering::Acquire) {
            report.skipped += 1;
            continue;
        }
        let ok = invoke_isolated(entry.id, || invoke(&entry.callback));
        report.record(ok);
    }
    report
}

// =============================================================================
// SYNC UNSUBSCRIBE
// =============================================================================

/// Thread-safe counterpart of [`Unsubscribe`](crate::Unsubscribe).
#[must_use = "dropping a SyncUnsubscribe leaves the listener registered forever"]
pub struct SyncUnsubscribe {
    id: ListenerId,
    active: Arc<AtomicBool>,
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl SyncUnsubscribe {
    pub(crate) fn new(
        id: ListenerId,
        active: Arc<AtomicBool>,
        remove: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            active,
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Remove the registration. Safe to call more than once, from any thread.
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::Release);
        let remove = self
            .remove
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(remove) = remove {
            remove();
        }
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl fmt::Debug for SyncUnsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncUnsubscribe")
            .field("id", &self.id)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    type Set = SyncListenerSet<dyn Fn() + Send + Sync>;

    #[test]
    fn removal_clears_flag_and_skips() {
        let set = Set::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let (id, active) = set.insert(Arc::new({
            let hits = Arc::clone(&hits);
            move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let snapshot = set.snapshot();
        assert!(set.remove(id));
        assert!(!active.load(Ordering::SeqCst));
        assert!(!set.remove(id));

        let report = run_sync_pass(snapshot, |f| f());
        assert_eq!(report.skipped, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = SyncUnsubscribe::new(ListenerId::FIRST, Arc::new(AtomicBool::new(true)), {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        handle.unsubscribe();
        handle.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!handle.is_subscribed());
    }
}
