//! Registered state listeners with synchronous, ordered fan-out

use crate::engine::PaginationState;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Callback invoked with every published state
pub type Listener = dyn FnMut(&PaginationState);

/// Token returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    active: Rc<Cell<bool>>,
    callback: Rc<RefCell<Box<Listener>>>,
}

#[derive(Default)]
struct RegistryInner {
    entries: Vec<Entry>,
    next_id: u64,
    latest: Option<Rc<PaginationState>>,
}

/// Shared handle to the engine's listener list.
///
/// Cloning is cheap, so a handle can be moved into a callback to subscribe or
/// unsubscribe while a notification is in progress.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and call it right away with the latest state, if any
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&PaginationState) + 'static,
    {
        let boxed: Box<Listener> = Box::new(listener);
        let callback = Rc::new(RefCell::new(boxed));
        let (id, latest) = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = SubscriptionId(inner.next_id);
            inner.entries.push(Entry {
                id,
                active: Rc::new(Cell::new(true)),
                callback: Rc::clone(&callback),
            });
            (id, inner.latest.clone())
        };

        if let Some(state) = latest {
            let mut listener = callback.borrow_mut();
            (*listener)(state.as_ref());
        }
        id
    }

    /// Remove a listener; it is skipped even if a notification is under way
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                let entry = inner.entries.remove(index);
                entry.active.set(false);
                true
            }
            None => false,
        }
    }

    /// Deliver `state` to every listener registered before this call, in
    /// subscription order
    pub fn notify(&self, state: &Rc<PaginationState>) {
        let snapshot: Vec<_> = {
            let mut inner = self.inner.borrow_mut();
            inner.latest = Some(Rc::clone(state));
            inner
                .entries
                .iter()
                .map(|entry| (entry.id, Rc::clone(&entry.active), Rc::clone(&entry.callback)))
                .collect()
        };

        for (id, active, callback) in snapshot {
            if !active.get() {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut listener) => (*listener)(state.as_ref()),
                Err(_) => tracing::warn!(?id, "listener is already running, skipping re-entrant call"),
            }
        }
    }

    /// Drop every listener and forget the latest state
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        for entry in inner.entries.drain(..) {
            entry.active.set(false);
        }
        inner.latest = None;
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recently delivered state
    pub fn latest(&self) -> Option<Rc<PaginationState>> {
        self.inner.borrow().latest.clone()
    }
}
