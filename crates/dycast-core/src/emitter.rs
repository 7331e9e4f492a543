//! Typed publish/subscribe.
//!
//! Listeners are keyed by the event's kind. `emit` dispatches to a snapshot
//! taken when it starts: handlers added during dispatch wait for the next
//! emit, handlers removed during dispatch still run this time. No lock is
//! held while a handler runs, so handlers may subscribe or unsubscribe.
//! A panicking handler is logged and skipped; later handlers still run.

use std::fmt;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::error;

/// An event that can be routed by kind.
pub trait Event: Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by `on`/`once`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E> {
    id: ListenerId,
    handler: Handler<E>,
    /// `Some` for `once` listeners; set when the single call is claimed.
    fired: Option<Arc<AtomicBool>>,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
            fired: self.fired.clone(),
        }
    }
}

pub struct Emitter<E: Event> {
    listeners: DashMap<E::Kind, Vec<Listener<E>>>,
    next_id: AtomicU64,
}

impl<E: Event> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E: Event> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("kinds", &self.listeners.len())
            .finish()
    }
}

impl<E: Event> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(kind, Arc::new(handler), None)
    }

    /// Subscribe for a single invocation. The listener is removed before the
    /// handler runs.
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(kind, Arc::new(handler), Some(Arc::new(AtomicBool::new(false))))
    }

    /// Returns false when `id` was not subscribed to `kind`.
    pub fn off(&self, kind: E::Kind, id: ListenerId) -> bool {
        let mut removed = false;
        if let Some(mut list) = self.listeners.get_mut(&kind) {
            let before = list.len();
            list.retain(|l| l.id != id);
            removed = list.len() != before;
        }
        self.listeners.remove_if(&kind, |_, list| list.is_empty());
        removed
    }

    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        // Snapshot, then drop the shard guard before calling out.
        let snapshot: Vec<Listener<E>> = match self.listeners.get(&kind) {
            Some(list) => list.clone(),
            None => return,
        };

        for listener in snapshot {
            if let Some(fired) = &listener.fired {
                if fired.swap(true, Ordering::AcqRel) {
                    continue;
                }
                self.off(kind, listener.id);
            }
            let handler = &listener.handler;
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(kind = ?kind, listener = listener.id.0, "event handler panicked");
            }
        }
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners.get(&kind).map(|l| l.len()).unwrap_or(0)
    }

    /// Drop listeners of one kind, or all of them.
    pub fn clear(&self, kind: Option<E::Kind>) {
        match kind {
            Some(k) => {
                self.listeners.remove(&k);
            }
            None => self.listeners.clear(),
        }
    }

    fn insert(&self, kind: E::Kind, handler: Handler<E>, fired: Option<Arc<AtomicBool>>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(kind)
            .or_default()
            .push(Listener { id, handler, fired });
        id
    }
}
