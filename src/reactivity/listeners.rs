// ============================================================================
// spark-store - Listener Registry
// Ordered, id-keyed callback set that is safe to mutate mid-notification
// ============================================================================
//
// A notification pass never iterates the live Vec. It takes a point-in-time
// snapshot, releases the borrow, then walks the snapshot:
//
// - listeners added during the pass are not in the snapshot, so they first
//   run on the next pass;
// - listeners removed during the pass have their `active` flag cleared, so
//   the pass skips them if their turn has not come yet.
//
// Callbacks are always dropped outside the RefCell borrow, because dropping
// one may run a destructor that unsubscribes something else.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::core::types::ListenerId;
use crate::reactivity::notify::{PassReport, invoke_isolated};

// =============================================================================
// LISTENER SET
// =============================================================================

pub(crate) struct ListenerEntry<F: ?Sized> {
    pub(crate) id: ListenerId,
    active: Rc<Cell<bool>>,
    pub(crate) callback: Rc<F>,
}

impl<F: ?Sized> Clone for ListenerEntry<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Rc::clone(&self.active),
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<F: ?Sized> ListenerEntry<F> {
    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }
}

pub(crate) struct ListenerSet<F: ?Sized> {
    next_id: Cell<ListenerId>,
    entries: RefCell<Vec<ListenerEntry<F>>>,
}

impl<F: ?Sized> ListenerSet<F> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(ListenerId::FIRST),
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register a callback. Every call yields a fresh id, even for a
    /// callback that is already registered.
    pub(crate) fn insert(&self, callback: Rc<F>) -> (ListenerId, Rc<Cell<bool>>) {
        let id = self.next_id.get();
        self.next_id.set(id.next());

        let active = Rc::new(Cell::new(true));
        self.entries.borrow_mut().push(ListenerEntry {
            id,
            active: Rc::clone(&active),
            callback,
        });
        (id, active)
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            entries
                .iter()
                .position(|e| e.id == id)
                .map(|pos| entries.remove(pos))
        };

        match removed {
            Some(entry) => {
                entry.active.set(false);
                true
            }
            None => false,
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<ListenerEntry<F>> {
        self.entries.borrow().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl<F: ?Sized> fmt::Debug for ListenerSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}

/// Invoke every still-active entry of a snapshot, isolating panics.
pub(crate) fn run_pass<F: ?Sized>(
    entries: Vec<ListenerEntry<F>>,
    mut invoke: impl FnMut(&F),
) -> PassReport {
    let mut report = PassReport::default();
    for entry in &entries {
        if !entry.is_active() {
            report.skipped += 1;
            continue;
        }
        let ok = invoke_isolated(entry.id, || invoke(&entry.callback));
        report.record(ok);
    }
    report
}

// =============================================================================
// UNSUBSCRIBE CAPABILITY
// =============================================================================

/// Capability returned by `subscribe`; removes exactly one registration.
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a no-op.
/// Dropping the handle does NOT unsubscribe.
#[must_use = "dropping an Unsubscribe leaves the listener registered forever"]
pub struct Unsubscribe {
    id: ListenerId,
    active: Rc<Cell<bool>>,
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Unsubscribe {
    pub(crate) fn new(
        id: ListenerId,
        active: Rc<Cell<bool>>,
        remove: impl FnOnce() + 'static,
    ) -> Self {
        Self {
            id,
            active,
            remove: RefCell::new(Some(Box::new(remove))),
        }
    }

    /// Remove the listener. Safe to call from inside a notification pass,
    /// including from the listener being removed.
    pub fn unsubscribe(&self) {
        self.active.set(false);
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active.get()
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
