//! A single-threaded channel whose endpoints are ports.
//!
//! Waiting takers and putters are served first come first served. Values are
//! handed over synchronously: a `put` meeting a waiting taker calls the
//! taker's callback before returning.

use crate::common::slots::{Slots, Token};
use crate::port::{AsPutPort, AsTakePort, Cancellation, PortId, PutPort, TakePort};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

type Taker<T> = Box<dyn FnOnce(T)>;

type Putter<T> = (T, Box<dyn FnOnce()>);

struct Waiters<V> {
    entries: Slots<V>,
    order: VecDeque<Token>,
}

impl<V> Waiters<V> {
    fn new() -> Self {
        Waiters {
            entries: Slots::new(),
            order: VecDeque::new(),
        }
    }

    fn push(&mut self, waiter: V) -> Token {
        let token = self.entries.insert(waiter);
        self.order.push_back(token);
        token
    }

    fn pop(&mut self) -> Option<V> {
        while let Some(token) = self.order.pop_front() {
            if let Some(waiter) = self.entries.remove(token) {
                return Some(waiter);
            }
        }
        None
    }

    fn remove(&mut self, token: Token) -> Option<V> {
        let waiter = self.entries.remove(token)?;
        self.order.retain(|queued| *queued != token);
        Some(waiter)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct State<T> {
    capacity: usize,
    buffer: VecDeque<T>,
    takers: Waiters<Taker<T>>,
    putters: Waiters<Putter<T>>,
}

type Shared<T> = Rc<RefCell<State<T>>>;

/// The send endpoint of a [`Chan`].
pub struct Sender<T> {
    id: PortId,
    state: Shared<T>,
}

/// The receive endpoint of a [`Chan`].
pub struct Receiver<T> {
    id: PortId,
    state: Shared<T>,
}

/// A channel with a bounded buffer; capacity zero makes it a rendezvous
/// channel where every put waits for a taker.
pub struct Chan<T> {
    input: Sender<T>,
    output: Receiver<T>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Sender {
            id: self.id,
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Receiver {
            id: self.id,
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Clone for Chan<T> {
    fn clone(&self) -> Self {
        Chan {
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }
}

impl<T> Debug for Sender<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").field("id", &self.id).finish()
    }
}

impl<T> Debug for Receiver<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver").field("id", &self.id).finish()
    }
}

impl<T> Debug for Chan<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.output.state.borrow();
        f.debug_struct("Chan")
            .field("input", &self.input.id)
            .field("output", &self.output.id)
            .field("capacity", &state.capacity)
            .field("buffered", &state.buffer.len())
            .field("waiting_takers", &state.takers.len())
            .field("waiting_putters", &state.putters.len())
            .finish()
    }
}

impl<T: 'static> Chan<T> {
    /// Create a channel buffering up to `capacity` values.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let state = Rc::new(RefCell::new(State {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
            takers: Waiters::new(),
            putters: Waiters::new(),
        }));
        Chan {
            input: Sender {
                id: PortId::next(),
                state: Rc::clone(&state),
            },
            output: Receiver {
                id: PortId::next(),
                state,
            },
        }
    }

    /// The send endpoint.
    #[must_use]
    pub fn input(&self) -> &Sender<T> {
        &self.input
    }

    /// The receive endpoint.
    #[must_use]
    pub fn output(&self) -> &Receiver<T> {
        &self.output
    }

    /// See [`Sender::try_send`].
    pub fn try_send(&self, value: T) -> Result<(), T> {
        self.input.try_send(value)
    }

    /// Number of buffered values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.output.state.borrow().buffer.len()
    }

    /// Whether no value is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending takes.
    #[must_use]
    pub fn waiting_takers(&self) -> usize {
        self.output.state.borrow().takers.len()
    }

    /// Number of pending puts.
    #[must_use]
    pub fn waiting_putters(&self) -> usize {
        self.output.state.borrow().putters.len()
    }
}

impl<T: 'static> Sender<T> {
    /// Hand `value` to a waiting taker or buffer it; gives the value back if
    /// that would have to wait.
    pub fn try_send(&self, value: T) -> Result<(), T> {
        let mut state = self.state.borrow_mut();
        if let Some(taker) = state.takers.pop() {
            drop(state);
            taker(value);
            return Ok(());
        }
        if state.buffer.len() < state.capacity {
            state.buffer.push_back(value);
            return Ok(());
        }
        Err(value)
    }
}

impl<T: 'static> PutPort for Sender<T> {
    type Item = T;

    fn port_id(&self) -> PortId {
        self.id
    }

    fn put(&self, value: T, on_ready: Box<dyn FnOnce()>) -> Cancellation {
        let value = match self.try_send(value) {
            Ok(()) => {
                on_ready();
                return Cancellation::noop();
            }
            Err(value) => value,
        };
        let token = self.state.borrow_mut().putters.push((value, on_ready));
        let state = Rc::downgrade(&self.state);
        Cancellation::new(move || withdraw(&state, |state| state.putters.remove(token)))
    }
}

impl<T: 'static> TakePort for Receiver<T> {
    type Item = T;

    fn port_id(&self) -> PortId {
        self.id
    }

    fn take(&self, on_ready: Box<dyn FnOnce(T)>) -> Cancellation {
        let mut state = self.state.borrow_mut();
        if let Some(value) = state.buffer.pop_front() {
            // a blocked putter moves into the freed buffer slot
            let unblocked = state.putters.pop().map(|(pending, on_put)| {
                state.buffer.push_back(pending);
                on_put
            });
            drop(state);
            on_ready(value);
            if let Some(on_put) = unblocked {
                on_put();
            }
            return Cancellation::noop();
        }
        if let Some((value, on_put)) = state.putters.pop() {
            drop(state);
            on_ready(value);
            on_put();
            return Cancellation::noop();
        }
        let token = state.takers.push(on_ready);
        drop(state);
        let state = Rc::downgrade(&self.state);
        Cancellation::new(move || withdraw(&state, |state| state.takers.remove(token)))
    }
}

fn withdraw<T, V>(state: &Weak<RefCell<State<T>>>, remove: impl FnOnce(&mut State<T>) -> Option<V>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let removed = remove(&mut state.borrow_mut());
    // the waiter may hold the last reference to whoever registered it
    drop(removed);
}

impl<T: 'static> AsTakePort for Chan<T> {
    type Port = Receiver<T>;

    fn take_port(&self) -> &Receiver<T> {
        &self.output
    }
}

impl<T: 'static> AsPutPort for Chan<T> {
    type Port = Sender<T>;

    fn put_port(&self) -> &Sender<T> {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn rendezvous_hands_over_to_waiting_taker() {
        let chan: Chan<i32> = Chan::new(0);
        let got = Rc::new(Cell::new(None));
        let g = got.clone();
        chan.take_port().take(Box::new(move |v| g.set(Some(v)))).cancel();
        assert_eq!(None, got.get());
        assert_eq!(0, chan.waiting_takers());

        let g = got.clone();
        drop(chan.take_port().take(Box::new(move |v| g.set(Some(v)))));
        assert_eq!(1, chan.waiting_takers());
        assert_eq!(Ok(()), chan.try_send(7));
        assert_eq!(Some(7), got.get());
        assert_eq!(Err(8), chan.try_send(8));
    }

    #[test]
    fn blocked_put_moves_into_buffer() {
        let chan: Chan<i32> = Chan::new(1);
        assert_eq!(Ok(()), chan.try_send(1));
        let accepted = Rc::new(Cell::new(false));
        let a = accepted.clone();
        drop(chan.put_port().put(2, Box::new(move || a.set(true))));
        assert!(!accepted.get());
        assert_eq!(1, chan.waiting_putters());

        let got = Rc::new(Cell::new(0));
        let g = got.clone();
        drop(chan.take_port().take(Box::new(move |v| g.set(v))));
        assert_eq!(1, got.get());
        assert!(accepted.get());
        assert_eq!(1, chan.len());
        assert_eq!(0, chan.waiting_putters());
    }

    #[test]
    fn cancelled_put_is_withdrawn() {
        let chan: Chan<&str> = Chan::new(0);
        let cancellation = chan.put_port().put("lost", Box::new(|| unreachable!()));
        assert_eq!(1, chan.waiting_putters());
        cancellation.cancel();
        assert_eq!(0, chan.waiting_putters());
        assert_ne!(chan.input().port_id(), chan.output().port_id());
    }
}
