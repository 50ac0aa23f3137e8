//! Event sources for the one-shot-event adapter.

use crate::common::slots::{Slots, Token};
use crate::port::Cancellation;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::rc::Rc;

/// Identifies one subscription on an [`EventSource`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw id, for [`EventSource`] implementations outside this crate.
    #[must_use]
    pub fn from_raw(id: u64) -> Self {
        ListenerId(id)
    }

    /// The raw id.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A subscribed callback.
pub type Listener<P> = Box<dyn FnMut(P)>;

/// Something that fires events of some kinds.
pub trait EventSource {
    /// Event kinds listeners subscribe to.
    type Kind: 'static;

    /// Payload delivered with every event.
    type Payload: 'static;

    /// Subscribe `listener` to `kind`.
    fn on(&self, kind: Self::Kind, listener: Listener<Self::Payload>) -> ListenerId;

    /// Unsubscribe. Returns `false` if `id` was not subscribed to `kind`.
    fn remove_listener(&self, kind: &Self::Kind, id: ListenerId) -> bool;
}

struct Subscriptions<K, P> {
    listeners: Slots<Rc<RefCell<Listener<P>>>>,
    by_kind: HashMap<K, Vec<(ListenerId, Token)>>,
    next_id: u64,
}

/// A single-threaded event emitter.
///
/// Cloning yields another handle to the same emitter. Listeners removed while
/// an event is being emitted are not called for that event anymore.
pub struct Emitter<K, P> {
    inner: Rc<RefCell<Subscriptions<K, P>>>,
}

impl<K, P> Clone for Emitter<K, P> {
    fn clone(&self) -> Self {
        Emitter {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Debug, P> Debug for Emitter<K, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Emitter")
            .field("kinds", &inner.by_kind.keys().collect::<Vec<_>>())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<K, P> Default for Emitter<K, P> {
    fn default() -> Self {
        Emitter {
            inner: Rc::new(RefCell::new(Subscriptions {
                listeners: Slots::new(),
                by_kind: HashMap::new(),
                next_id: 0,
            })),
        }
    }
}

impl<K: Eq + Hash + Clone + 'static, P: Clone + 'static> Emitter<K, P> {
    /// Create an emitter without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call every listener of `kind` with a clone of `payload`, in
    /// subscription order. Returns how many listeners were called.
    pub fn emit(&self, kind: &K, payload: P) -> usize {
        let subscribed: Vec<Token> = match self.inner.borrow().by_kind.get(kind) {
            Some(entries) => entries.iter().map(|(_, token)| *token).collect(),
            None => return 0,
        };
        let mut called = 0;
        for token in subscribed {
            let listener = self.inner.borrow_mut().listeners.get_mut(token).cloned();
            let Some(listener) = listener else {
                continue;
            };
            // a listener re-emitting its own event is not re-entered
            let Ok(mut listener) = listener.try_borrow_mut() else {
                continue;
            };
            listener(payload.clone());
            called += 1;
        }
        called
    }

    /// Number of listeners subscribed to `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: &K) -> usize {
        self.inner.borrow().by_kind.get(kind).map_or(0, Vec::len)
    }
}

impl<K: Eq + Hash + Clone + 'static, P: Clone + 'static> EventSource for Emitter<K, P> {
    type Kind = K;
    type Payload = P;

    fn on(&self, kind: K, listener: Listener<P>) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        let token = inner.listeners.insert(Rc::new(RefCell::new(listener)));
        inner.by_kind.entry(kind).or_default().push((id, token));
        id
    }

    fn remove_listener(&self, kind: &K, id: ListenerId) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let Some(entries) = inner.by_kind.get_mut(kind) else {
                return false;
            };
            let Some(index) = entries.iter().position(|(entry, _)| *entry == id) else {
                return false;
            };
            let (_, token) = entries.remove(index);
            if entries.is_empty() {
                _ = inner.by_kind.remove(kind);
            }
            inner.listeners.remove(token)
        };
        // the listener may be running right now, drop it outside the borrow
        drop(removed);
        true
    }
}

/// Subscribe `on_fire` to the next `kind` event of `source` only.
///
/// The listener unsubscribes itself before `on_fire` runs; the returned
/// cancellation unsubscribes it if the event never came.
pub(crate) fn subscribe_once<S>(
    source: &S,
    kind: S::Kind,
    on_fire: impl FnOnce(S::Payload) + 'static,
) -> Cancellation
where
    S: EventSource + Clone + 'static,
    S::Kind: Clone,
{
    let id: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
    let mut on_fire = Some(on_fire);
    let (listener_source, listener_kind, listener_id) = (source.clone(), kind.clone(), id.clone());
    id.set(Some(source.on(
        kind.clone(),
        Box::new(move |payload| {
            if let Some(id) = listener_id.take() {
                _ = listener_source.remove_listener(&listener_kind, id);
            }
            if let Some(on_fire) = on_fire.take() {
                on_fire(payload);
            }
        }),
    )));
    let source = source.clone();
    Cancellation::new(move || {
        if let Some(id) = id.take() {
            _ = source.remove_listener(&kind, id);
        }
    })
}
