//! Port contracts the selector races against.
//!
//! A port is one endpoint of a channel. The core never looks inside a port;
//! it only starts a `take` or a `put` and keeps the returned [`Cancellation`]
//! so a losing wait can be withdrawn.

use crate::impl_display_by_debug;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of one port endpoint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PortId(u64);

impl_display_by_debug!(PortId);

impl PortId {
    /// Allocate a process-wide unique id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PortId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Undoes one pending wait.
///
/// Consumed on use; cancelling a wait that already completed must be a no-op
/// for every implementation.
#[must_use = "dropping a Cancellation leaves the wait registered"]
pub struct Cancellation(Option<Box<dyn FnOnce()>>);

impl Debug for Cancellation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancellation")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

impl Cancellation {
    /// Wrap the action that removes the wait.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Cancellation(Some(Box::new(cancel)))
    }

    /// A cancellation with nothing to undo.
    pub fn noop() -> Self {
        Cancellation(None)
    }

    /// Run the cancel action.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.0.take() {
            cancel();
        }
    }
}

/// The receive endpoint of a channel.
pub trait TakePort {
    /// Values handed out by `take`.
    type Item: 'static;

    /// Identity of this endpoint.
    fn port_id(&self) -> PortId;

    /// Wait for one value. `on_ready` may run before `take` returns.
    fn take(&self, on_ready: Box<dyn FnOnce(Self::Item)>) -> Cancellation;
}

/// The send endpoint of a channel.
pub trait PutPort {
    /// Values accepted by `put`.
    type Item: 'static;

    /// Identity of this endpoint.
    fn port_id(&self) -> PortId;

    /// Offer `value`; `on_ready` runs once it was accepted, possibly before
    /// `put` returns.
    fn put(&self, value: Self::Item, on_ready: Box<dyn FnOnce()>) -> Cancellation;
}

/// Anything that exposes a receive endpoint: a [`TakePort`] itself, or a
/// channel owning one.
pub trait AsTakePort {
    /// The receive endpoint type.
    type Port: TakePort;

    /// Resolve the receive endpoint.
    fn take_port(&self) -> &Self::Port;
}

/// Anything that exposes a send endpoint: a [`PutPort`] itself, or a channel
/// owning one.
pub trait AsPutPort {
    /// The send endpoint type.
    type Port: PutPort;

    /// Resolve the send endpoint.
    fn put_port(&self) -> &Self::Port;
}

impl<P: TakePort> AsTakePort for P {
    type Port = P;

    fn take_port(&self) -> &Self::Port {
        self
    }
}

impl<P: PutPort> AsPutPort for P {
    type Port = P;

    fn put_port(&self) -> &Self::Port {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn port_ids_are_unique() {
        assert_ne!(PortId::next(), PortId::next());
    }

    #[test]
    fn cancellation_runs_once() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        Cancellation::new(move || c.set(c.get() + 1)).cancel();
        Cancellation::noop().cancel();
        assert_eq!(1, count.get());
    }
}
