use crate::adapter::{self, Completion};
use crate::common::constants::SelectorState;
use crate::common::traits::Current;
use crate::config::Diagnostics;
use crate::error::{Error, Result};
use crate::event::{self, EventSource};
use crate::event_loop::Handle;
use crate::operation::{Reject, Resolve};
use crate::port::{AsPutPort, AsTakePort, Cancellation, PortId, PutPort, TakePort};
use crate::select::Handler;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

struct Inner<T, E> {
    state: SelectorState,
    registered_ports: HashSet<PortId>,
    pending_cancellations: Vec<Cancellation>,
    on_success: Option<Resolve<T>>,
    on_failure: Option<Reject<E>>,
    handle: Option<Handle>,
    diagnostics: Diagnostics,
}

type Shared<T, E> = Rc<RefCell<Inner<T, E>>>;

/// Races registered sources and settles with the first one to complete.
///
/// Every registration method returns the selector for chaining and does
/// nothing once the selector settled. When a registration wins, every other
/// pending registration is cancelled in registration order before the winning
/// payload is dispatched through its [`Handler`].
pub struct Selector<T, E> {
    inner: Shared<T, E>,
}

impl<T, E> Debug for Selector<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Selector")
            .field("state", &inner.state)
            .field("registered_ports", &inner.registered_ports)
            .field("pending_cancellations", &inner.pending_cancellations.len())
            .field("diagnostics", &inner.diagnostics)
            .finish()
    }
}

/// Settle `inner` if nobody did yet: cancel every pending registration and
/// hand out the continuations to dispatch through.
fn settle<T, E>(inner: &Shared<T, E>, winner: &'static str) -> Option<(Resolve<T>, Reject<E>)> {
    let (cancellations, continuations, trace) = {
        let mut inner = inner.borrow_mut();
        if inner.state == SelectorState::Settled {
            return None;
        }
        inner.state = SelectorState::Settled;
        inner.registered_ports.clear();
        inner.handle = None;
        let cancellations = std::mem::take(&mut inner.pending_cancellations);
        let continuations = inner.on_success.take().zip(inner.on_failure.take());
        (cancellations, continuations, inner.diagnostics.trace())
    };
    if trace {
        crate::debug!(
            "selector settled by {}, cancelling {} registrations",
            winner,
            cancellations.len()
        );
    }
    for cancellation in cancellations {
        cancellation.cancel();
    }
    continuations
}

fn complete<A: 'static, T: 'static, E: 'static>(
    inner: &Shared<T, E>,
    handler: Handler<A, T, E>,
    payload: A,
    winner: &'static str,
) {
    if let Some((on_success, on_failure)) = settle(inner, winner) {
        handler.dispatch(payload, on_success, on_failure);
    }
}

impl<T: 'static, E: 'static> Selector<T, E> {
    /// Create a selector settling `on_success` or `on_failure`.
    ///
    /// Timers and futures are scheduled on the event loop running on the
    /// current thread, if any.
    pub fn new(
        on_success: impl FnOnce(T) + 'static,
        on_failure: impl FnOnce(E) + 'static,
        diagnostics: Diagnostics,
    ) -> Self {
        Selector {
            inner: Rc::new(RefCell::new(Inner {
                state: SelectorState::Pending,
                registered_ports: HashSet::new(),
                pending_cancellations: Vec::new(),
                on_success: Some(Box::new(on_success)),
                on_failure: Some(Box::new(on_failure)),
                handle: Handle::current(),
                diagnostics,
            })),
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> SelectorState {
        self.inner.borrow().state
    }

    /// Whether a registration won already.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state() == SelectorState::Settled
    }

    /// Number of registrations that can still be cancelled.
    #[must_use]
    pub fn pending_cancellations(&self) -> usize {
        self.inner.borrow().pending_cancellations.len()
    }

    /// Whether the endpoint `port` is registered on this selector.
    #[must_use]
    pub fn is_registered(&self, port: PortId) -> bool {
        self.inner.borrow().registered_ports.contains(&port)
    }

    fn handle(&self) -> Result<Handle> {
        self.inner.borrow().handle.clone().ok_or(Error::NoEventLoop)
    }

    fn claim(&self, port: PortId) -> Result<()> {
        if !self.inner.borrow_mut().registered_ports.insert(port) {
            crate::warn!("port {} registered twice in one selector", port);
            return Err(Error::DuplicateRegistration(port));
        }
        Ok(())
    }

    /// Keep `cancellation` until settlement. A registration completing while
    /// it was being made leaves nothing to keep.
    fn keep(&self, cancellation: Cancellation) {
        let mut inner = self.inner.borrow_mut();
        if inner.state == SelectorState::Settled {
            drop(inner);
            cancellation.cancel();
            return;
        }
        inner.pending_cancellations.push(cancellation);
    }

    /// Race a take on the receive endpoint of `port`.
    ///
    /// Fails with [`Error::DuplicateRegistration`] if that endpoint is already
    /// registered, before any wait is started.
    pub fn take<P: AsTakePort + ?Sized>(
        &mut self,
        port: &P,
        handler: Handler<<P::Port as TakePort>::Item, T, E>,
    ) -> Result<&mut Self> {
        if self.is_settled() {
            return Ok(self);
        }
        let port = port.take_port();
        self.claim(port.port_id())?;
        let inner = Rc::clone(&self.inner);
        let cancellation = port.take(Box::new(move |value| {
            complete(&inner, handler, value, "take");
        }));
        self.keep(cancellation);
        Ok(self)
    }

    /// Race a put of `value` on the send endpoint of `port`; the handler gets
    /// `()` once the value was accepted.
    ///
    /// Fails with [`Error::DuplicateRegistration`] if that endpoint is already
    /// registered, before any wait is started.
    pub fn put<P: AsPutPort + ?Sized>(
        &mut self,
        port: &P,
        value: <P::Port as PutPort>::Item,
        handler: Handler<(), T, E>,
    ) -> Result<&mut Self> {
        if self.is_settled() {
            return Ok(self);
        }
        let port = port.put_port();
        self.claim(port.port_id())?;
        let inner = Rc::clone(&self.inner);
        let cancellation = port.put(
            value,
            Box::new(move || complete(&inner, handler, (), "put")),
        );
        self.keep(cancellation);
        Ok(self)
    }

    /// Race a future, spawned on the event loop. Losing drops the future.
    pub fn future<U: 'static, X: 'static>(
        &mut self,
        future: impl Future<Output = std::result::Result<U, X>> + 'static,
        on_ok: Handler<U, T, E>,
        on_err: Handler<X, T, E>,
    ) -> Result<&mut Self> {
        self.watch(async move { Some(future.await) }, on_ok, on_err)
    }

    /// Race a raw task, see [`adapter::task`]. The task is started right away.
    pub fn task<U: 'static, X: 'static>(
        &mut self,
        f: impl FnOnce(Resolve<U>, Reject<X>) + 'static,
        on_ok: Handler<U, T, E>,
        on_err: Handler<X, T, E>,
    ) -> Result<&mut Self> {
        if self.is_settled() {
            return Ok(self);
        }
        // spawn first so a missing loop does not start the task
        let handle = self.handle()?;
        let outcome = adapter::task(f).into_future()?;
        self.spawn_watch(&handle, outcome, on_ok, on_err);
        Ok(self)
    }

    fn watch<U: 'static, X: 'static>(
        &mut self,
        outcome: impl Future<Output = Option<std::result::Result<U, X>>> + 'static,
        on_ok: Handler<U, T, E>,
        on_err: Handler<X, T, E>,
    ) -> Result<&mut Self> {
        if self.is_settled() {
            return Ok(self);
        }
        let handle = self.handle()?;
        self.spawn_watch(&handle, outcome, on_ok, on_err);
        Ok(self)
    }

    fn spawn_watch<U: 'static, X: 'static>(
        &self,
        handle: &Handle,
        outcome: impl Future<Output = Option<std::result::Result<U, X>>> + 'static,
        on_ok: Handler<U, T, E>,
        on_err: Handler<X, T, E>,
    ) {
        let inner = Rc::clone(&self.inner);
        let task = handle.spawn(async move {
            let outcome = outcome.await;
            // cancellation may have been requested while the outcome was
            // already on its way
            if inner.borrow().state == SelectorState::Settled {
                return;
            }
            match outcome {
                Some(Ok(value)) => complete(&inner, on_ok, value, "future"),
                Some(Err(error)) => complete(&inner, on_err, error, "future"),
                None => {
                    crate::warn!("raced task dropped both continuations");
                }
            }
        });
        self.keep(Cancellation::new(move || {
            _ = task.abort();
        }));
    }

    /// Race a callback-style task: `Ok` settles with success, `Err` with
    /// failure.
    pub fn thunk<U, X>(
        &mut self,
        f: impl FnOnce(Completion<U, X>) + 'static,
    ) -> Result<&mut Self>
    where
        U: Into<T> + 'static,
        X: Into<E> + 'static,
    {
        self.thunk_with(
            f,
            Handler::call(|outcome: std::result::Result<U, X>| {
                outcome.map(Into::into).map_err(Into::into)
            }),
        )
    }

    /// Race a callback-style task and dispatch its whole outcome through
    /// `handler`.
    pub fn thunk_with<U: 'static, X: 'static>(
        &mut self,
        f: impl FnOnce(Completion<U, X>) + 'static,
        handler: Handler<std::result::Result<U, X>, T, E>,
    ) -> Result<&mut Self> {
        if self.is_settled() {
            return Ok(self);
        }
        let inner = Rc::clone(&self.inner);
        f(Box::new(move |outcome| complete(&inner, handler, outcome, "thunk")));
        Ok(self)
    }

    /// Race the next `kind` event of `source`. Losing removes the listener.
    pub fn once<S>(
        &mut self,
        source: &S,
        kind: S::Kind,
        handler: Handler<S::Payload, T, E>,
    ) -> Result<&mut Self>
    where
        S: EventSource + Clone + 'static,
        S::Kind: Clone,
    {
        if self.is_settled() {
            return Ok(self);
        }
        let inner = Rc::clone(&self.inner);
        let cancellation = event::subscribe_once(source, kind, move |payload| {
            complete(&inner, handler, payload, "once");
        });
        self.keep(cancellation);
        Ok(self)
    }

    /// Race a timer; the handler gets `()` once `duration` elapsed. Losing
    /// removes the timer from the loop.
    pub fn timeout(&mut self, duration: Duration, handler: Handler<(), T, E>) -> Result<&mut Self> {
        if self.is_settled() {
            return Ok(self);
        }
        let handle = self.handle()?;
        let inner = Rc::clone(&self.inner);
        let id = handle.set_timeout(duration, move || complete(&inner, handler, (), "timeout"));
        self.keep(Cancellation::new(move || {
            _ = handle.clear_timeout(id);
        }));
        Ok(self)
    }

    /// Give up without settling: every registration is cancelled and neither
    /// continuation will ever run.
    pub(crate) fn abandon(&self) {
        drop(settle(&self.inner, "abandon"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chan::Chan;
    use crate::event::Emitter;
    use crate::event_loop::EventLoop;
    use std::cell::Cell;

    type Outcome = Rc<RefCell<Vec<std::result::Result<String, String>>>>;

    fn selector() -> (Selector<String, String>, Outcome) {
        let outcome: Outcome = Rc::new(RefCell::new(Vec::new()));
        let (ok, err) = (outcome.clone(), outcome.clone());
        let selector = Selector::new(
            move |v| ok.borrow_mut().push(Ok(v)),
            move |e| err.borrow_mut().push(Err(e)),
            Diagnostics::default(),
        );
        (selector, outcome)
    }

    #[test]
    fn first_take_wins_and_cancels_the_rest() -> Result<()> {
        let (a, b) = (Chan::<&str>::new(0), Chan::<&str>::new(0));
        let (mut selector, outcome) = selector();
        _ = selector
            .take(&a, Handler::settle())?
            .take(&b, Handler::call(|v: &str| Ok(format!("b:{v}"))))?;
        assert_eq!(2, selector.pending_cancellations());
        assert!(selector.is_registered(b.output().port_id()));

        assert_eq!(Ok(()), b.try_send("x"));
        assert!(selector.is_settled());
        assert_eq!(0, a.waiting_takers());
        assert_eq!(Err("late"), a.try_send("late"));
        assert_eq!(vec![Ok("b:x".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn duplicate_port_is_rejected_before_waiting() -> Result<()> {
        let chan = Chan::<&str>::new(0);
        let (mut selector, outcome) = selector();
        _ = selector.take(&chan, Handler::settle())?;
        let duplicate = selector.take(chan.output(), Handler::settle());
        assert!(matches!(duplicate, Err(Error::DuplicateRegistration(id)) if id == chan.output().port_id()));
        assert_eq!(1, chan.waiting_takers());
        // the send endpoint is a different port, its put meets the pending take
        _ = selector.put(&chan, "v", Handler::call(|()| Ok("sent".to_string())))?;
        assert_eq!(vec![Ok("v".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn synchronous_completion_settles_during_registration() -> Result<()> {
        let chan = Chan::<&str>::new(1);
        assert_eq!(Ok(()), chan.try_send("ready"));
        let other = Chan::<&str>::new(0);
        let (mut selector, outcome) = selector();
        _ = selector
            .take(&chan, Handler::settle())?
            .take(&other, Handler::settle())?;
        assert!(selector.is_settled());
        assert_eq!(0, selector.pending_cancellations());
        assert_eq!(0, other.waiting_takers());
        assert_eq!(vec![Ok("ready".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn thunk_failure_goes_to_failure_continuation() -> Result<()> {
        let (mut selector, outcome) = selector();
        _ = selector.thunk(|done: Completion<&str, &str>| done(Err("io")))?;
        assert_eq!(vec![Err("io".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn once_losing_removes_listener() -> Result<()> {
        let emitter: Emitter<&str, String> = Emitter::new();
        let (mut selector, outcome) = selector();
        _ = selector
            .once(&emitter, "done", Handler::settle())?
            .thunk(|done: Completion<&str, String>| done(Ok("thunk")))?;
        assert_eq!(0, emitter.listener_count(&"done"));
        assert_eq!(0, emitter.emit(&"done", "late".to_string()));
        assert_eq!(vec![Ok("thunk".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn timeout_needs_event_loop() {
        let (mut selector, _) = selector();
        let timeout = selector.timeout(Duration::from_millis(1), Handler::call(|()| Ok(String::new())));
        assert!(matches!(timeout, Err(Error::NoEventLoop)));
    }

    #[test]
    fn losing_timeout_and_future_are_cancelled() -> Result<()> {
        let event_loop = EventLoop::new()?;
        let handle = event_loop.handle();
        Handle::init_current(&handle);
        let polled = Rc::new(Cell::new(false));
        let p = polled.clone();
        let chan = Chan::<&str>::new(0);
        let (mut selector, outcome) = selector();
        _ = selector
            .timeout(Duration::from_secs(60), Handler::call(|()| Err("timeout".to_string())))?
            .future(
                async move {
                    p.set(true);
                    Ok::<_, String>("future".to_string())
                },
                Handler::settle(),
                Handler::fail(),
            )?
            .take(&chan, Handler::settle())?;
        Handle::clean_current();
        assert_eq!(Ok(()), chan.try_send("x"));
        assert!(!handle.has_work());
        event_loop.run()?;
        assert!(!polled.get());
        assert_eq!(vec![Ok("x".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn late_thunk_completion_is_ignored() -> Result<()> {
        let stashed: Rc<RefCell<Option<Completion<&str, &str>>>> = Rc::new(RefCell::new(None));
        let s = stashed.clone();
        let chan = Chan::<&str>::new(0);
        let (mut selector, outcome) = selector();
        _ = selector
            .thunk(move |done: Completion<&str, &str>| *s.borrow_mut() = Some(done))?
            .take(&chan, Handler::settle())?;
        assert_eq!(Ok(()), chan.try_send("x"));
        assert!(selector.is_settled());

        let done = stashed.borrow_mut().take().expect("thunk started");
        done(Ok("late"));
        assert_eq!(vec![Ok("x".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn future_finishing_after_settlement_is_ignored() -> Result<()> {
        let event_loop = EventLoop::new()?;
        let handle = event_loop.handle();
        Handle::init_current(&handle);
        let chan = Chan::<&str>::new(0);
        let sender = chan.clone();
        let (mut selector, outcome) = selector();
        _ = selector
            .take(&chan, Handler::settle())?
            .future(
                async move {
                    // settles the selector through the take while this poll runs
                    assert_eq!(Ok(()), sender.try_send("x"));
                    Ok::<_, String>("future".to_string())
                },
                Handler::settle(),
                Handler::fail(),
            )?;
        Handle::clean_current();
        assert!(!selector.is_settled());
        event_loop.run()?;
        assert!(selector.is_settled());
        assert_eq!(vec![Ok("x".to_string())], *outcome.borrow());
        Ok(())
    }

    #[test]
    fn abandon_runs_cancellations_without_settling() -> Result<()> {
        let chan = Chan::<&str>::new(0);
        let (mut selector, outcome) = selector();
        _ = selector.take(&chan, Handler::settle())?;
        selector.abandon();
        assert_eq!(0, chan.waiting_takers());
        assert!(selector.is_settled());
        assert!(outcome.borrow().is_empty());
        _ = selector.take(&chan, Handler::settle())?;
        assert_eq!(0, chan.waiting_takers());
        Ok(())
    }
}
